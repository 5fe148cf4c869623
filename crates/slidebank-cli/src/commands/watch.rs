//! Watch command implementation.

use super::{open_pipeline, tokio_runtime};
use anyhow::{Context, Result};
use colored::Colorize;
use slidebank_ingest::DirectoryWatcher;
use slidebank_render::{RendererConfig, ThumbnailRenderer};
use tokio::sync::broadcast::error::RecvError;

/// Run the watcher in the foreground until Ctrl+C.
pub fn run() -> Result<()> {
    let (config, _db, pipeline) = open_pipeline()?;

    let renderer = ThumbnailRenderer::new(RendererConfig {
        office_binary: config.render.office_binary.clone(),
        rasterizer_binary: config.render.rasterizer_binary.clone(),
        dpi: config.render.dpi,
        scratch_dir: pipeline.roots().scratch.clone(),
    });
    let missing: Vec<_> = renderer
        .check_tools()
        .into_iter()
        .filter(|(_, available)| !available)
        .collect();
    if !missing.is_empty() {
        println!("{}", "Warning: Thumbnail tools are not available:".yellow());
        for (tool, _) in &missing {
            println!("  - {}", tool);
        }
        println!("Decks will be ingested without thumbnails.\n");
    }

    println!("{}", "Starting watcher...".cyan());
    for (category, root) in pipeline.roots().watch_roots() {
        println!("  {} {} ({})", "+".green(), root.display(), category);
    }
    println!("\nPress Ctrl+C to stop.\n");

    let rt = tokio_runtime()?;
    rt.block_on(async {
        let mut logs = pipeline.status().subscribe();
        let handle = DirectoryWatcher::from_config(pipeline.clone(), &config.watch)
            .spawn()
            .context("Failed to start watcher")?;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                line = logs.recv() => match line {
                    Ok(line) => print_line(&line),
                    Err(RecvError::Lagged(skipped)) => {
                        println!("{}", format!("... {} messages skipped", skipped).dimmed());
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        println!("\n{}", "Stopping watcher...".cyan());
        handle.stop().await?;

        let pending = pipeline.in_flight();
        if pending > 0 {
            println!(
                "{}",
                format!("Waiting for {} files in flight to finish...", pending).yellow()
            );
            let idle = pipeline.wait_idle();
            tokio::pin!(idle);
            loop {
                tokio::select! {
                    _ = &mut idle => break,
                    Ok(line) = logs.recv() => print_line(&line),
                }
            }
            while let Ok(line) = logs.try_recv() {
                print_line(&line);
            }
        }

        let status = pipeline.status().snapshot();
        println!(
            "Processed: {}  Skipped: {}  Failed: {}",
            status.processed, status.skipped, status.failed
        );
        anyhow::Ok(())
    })
}

fn print_line(line: &str) {
    let line = if line.starts_with("Failed") || line.starts_with("AI enrichment unavailable") {
        line.red().to_string()
    } else if line.starts_with("Successfully") {
        line.green().to_string()
    } else if line.starts_with("Processing") || line.starts_with("Detected") {
        line.cyan().to_string()
    } else {
        line.to_string()
    };
    println!("{}", line);
}
