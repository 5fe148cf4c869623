//! Thumbnails command - render one deck outside the pipeline.

use super::{get_paths, load_config};
use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use slidebank_render::{RendererConfig, ThumbnailRenderer};
use std::path::Path;
use std::time::Duration;

pub fn run(file: &Path, out_dir: &Path) -> Result<()> {
    let config = load_config()?;
    let roots = config.storage_roots(&get_paths(&config)?);
    std::fs::create_dir_all(&roots.scratch).context("Failed to create scratch directory")?;

    let renderer = ThumbnailRenderer::new(RendererConfig {
        office_binary: config.render.office_binary.clone(),
        rasterizer_binary: config.render.rasterizer_binary.clone(),
        dpi: config.render.dpi,
        scratch_dir: roots.scratch,
    });

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Rendering {}", file.display()));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = renderer.render(file, out_dir);
    pb.finish_and_clear();

    let pages = result?;
    println!(
        "{} {} thumbnails in {}",
        "Rendered:".green().bold(),
        pages.len(),
        out_dir.display()
    );
    for page in &pages {
        println!("  {}", page.display().to_string().dimmed());
    }

    Ok(())
}
