//! Initialize SlideBank.

use super::{get_paths, load_config};
use anyhow::{Context, Result};
use colored::Colorize;
use slidebank_config::Config;
use slidebank_db::Database;

pub fn run() -> Result<()> {
    let config = load_config()?;
    let paths = get_paths(&config)?;

    if paths.is_initialized() {
        println!("{} SlideBank is already initialized.", "Note:".yellow().bold());
        println!("  Config: {}", paths.config_file.display());
        println!("  Database: {}", paths.database_file.display());
        return Ok(());
    }

    println!("{}", "Initializing SlideBank...".cyan().bold());

    paths.ensure_dirs().context("Failed to create directories")?;
    let roots = config.storage_roots(&paths);
    roots
        .ensure_dirs()
        .context("Failed to create storage directories")?;
    println!("  {} Created directories", "✓".green());

    if !paths.config_file.exists() {
        Config::create_default_file(&paths.config_file).context("Failed to create config file")?;
        println!(
            "  {} Created config: {}",
            "✓".green(),
            paths.config_file.display()
        );
    }

    Database::open(&paths.database_file).context("Failed to initialize database")?;
    println!(
        "  {} Created database: {}",
        "✓".green(),
        paths.database_file.display()
    );

    println!();
    println!("{}", "SlideBank initialized successfully!".green().bold());
    println!();
    println!("Drop decks into: {}", roots.stage.display().to_string().cyan());
    println!();
    println!("Next steps:");
    println!("  1. Review storage: {}", "slidebank config show".cyan());
    println!("  2. Start watching: {}", "slidebank watch".cyan());
    println!("  3. Check status: {}", "slidebank status".cyan());

    Ok(())
}
