//! Configuration commands.

use super::{get_paths, load_config};
use anyhow::{Context, Result};
use colored::Colorize;

pub fn show() -> Result<()> {
    let config = load_config()?;
    let paths = get_paths(&config)?;

    println!("{}", "Current Configuration".cyan().bold());
    println!("{}", "─".repeat(50));
    if paths.config_file.exists() {
        let contents =
            std::fs::read_to_string(&paths.config_file).context("Failed to read config file")?;
        println!("{}", contents);
    } else {
        println!(
            "{}",
            "No config file found, using defaults. Run 'slidebank init' to create one.".dimmed()
        );
    }

    let roots = config.storage_roots(&paths);
    println!();
    println!("{}", "Storage".white().bold());
    println!("  {}: {}", "Stage".cyan(), roots.stage.display());
    if let Some(original) = &roots.original {
        println!("  {}: {}", "Original".cyan(), original.display());
    }
    println!("  {}: {}", "Template".cyan(), roots.template.display());
    println!("  {}: {}", "Thumbnails".cyan(), roots.thumbnails.display());
    println!("  {}: {}", "Scratch".cyan(), roots.scratch.display());
    println!("  {}: {}", "Database".cyan(), paths.database_file.display());

    Ok(())
}

pub fn set_dir(area: &str, dir: &str) -> Result<()> {
    let mut config = load_config()?;
    let paths = get_paths(&config)?;
    config.set_storage_dir(area, dir.to_string())?;

    let expanded = shellexpand::tilde(dir);
    std::fs::create_dir_all(&*expanded)
        .with_context(|| format!("Failed to create directory: {}", expanded))?;

    config
        .save_to(&paths.config_file)
        .context("Failed to save config")?;

    println!("{} Set {} = {}", "✓".green(), area.cyan(), dir);
    Ok(())
}
