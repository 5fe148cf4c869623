//! Status command - library counts, inbox backlog and tool availability.

use super::{get_database, get_paths, load_config};
use anyhow::Result;
use colored::Colorize;
use slidebank_core::FeatureFlag;
use slidebank_ingest::{scan_root, WatchFilter};
use slidebank_render::{RendererConfig, ThumbnailRenderer};

pub fn run() -> Result<()> {
    let config = load_config()?;
    let paths = get_paths(&config)?;
    let db = get_database(&paths)?;
    let roots = config.storage_roots(&paths);

    println!("{}", "SlideBank Status".cyan().bold());
    println!("{}", "─".repeat(50));

    let counts = db.counts()?;
    println!();
    println!("{}", "Library".white().bold());
    if db.integrity_check()? {
        println!("  Database: {}", "ok".green());
    } else {
        println!("  Database: {}", "integrity check failed".red());
    }
    println!("  Presentations: {}", counts.presentations);
    println!("  Templates: {}", counts.templates);
    println!(
        "  Slides: {} ({} summarized)",
        counts.slides, counts.summarized_slides
    );

    let filter = WatchFilter::from_config(&config.watch);
    let waiting: Vec<_> = roots
        .watch_roots()
        .into_iter()
        .flat_map(|(_, root)| scan_root(&root, &filter))
        .collect();
    println!();
    println!("{}", "Inbox".white().bold());
    if waiting.is_empty() {
        println!("  {}", "No decks waiting.".dimmed());
    } else {
        println!("  {} Waiting: {}", "○".yellow(), waiting.len());
        for path in waiting.iter().take(5) {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            println!("    {} {}", "•".dimmed(), name);
        }
        if waiting.len() > 5 {
            println!("    {}", format!("...and {} more", waiting.len() - 5).dimmed());
        }
    }

    println!();
    println!("{}", "Flags".white().bold());
    for flag in FeatureFlag::all() {
        let value = db.get_feature_flag(flag.name())?;
        println!(
            "  {}: {}",
            flag.name(),
            value.as_deref().unwrap_or("(default)")
        );
    }

    let (cost, tokens) = db.total_ai_usage()?;
    if tokens > 0 {
        println!();
        println!("{}", "AI Usage".white().bold());
        println!("  Tokens: {}", tokens);
        println!("  Cost: ${:.4}", cost);
    }

    let renderer = ThumbnailRenderer::new(RendererConfig {
        office_binary: config.render.office_binary.clone(),
        rasterizer_binary: config.render.rasterizer_binary.clone(),
        dpi: config.render.dpi,
        scratch_dir: roots.scratch.clone(),
    });
    println!();
    println!("{}", "Thumbnail tools".white().bold());
    for (tool, available) in renderer.check_tools() {
        if available {
            println!("  {} {} (installed)", "+".green(), tool);
        } else {
            println!("  {} {} (not found)", "-".red(), tool);
        }
    }

    Ok(())
}
