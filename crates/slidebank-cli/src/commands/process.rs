//! Process and reprocess-all commands.

use super::{open_pipeline, short_id, tokio_runtime};
use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use slidebank_ingest::{IngestionPipeline, ProcessOutcome};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Ingest one deck. A file outside the storage roots is copied into the
/// stage inbox first.
pub fn run(path: &Path, force: bool) -> Result<()> {
    if !path.is_file() {
        anyhow::bail!("File does not exist: {}", path.display());
    }
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to read current directory")?
            .join(path)
    };

    let (_config, _db, pipeline) = open_pipeline()?;
    let path = into_storage(&pipeline, path)?;

    debug!("Processing {} (force: {})", path.display(), force);
    let rt = tokio_runtime()?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Processing {}", path.display()));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = rt.block_on(pipeline.process_file(&path, force));
    pb.finish_and_clear();

    match result? {
        ProcessOutcome::Skipped { id, .. } => {
            println!(
                "{} {} already stored as {}",
                "Skipped:".yellow().bold(),
                path.display(),
                short_id(&id)
            );
            println!("  Use --force to reprocess it anyway.");
        }
        ProcessOutcome::Processed {
            id,
            slide_count,
            was_update,
        } => {
            let label = if was_update { "Updated:" } else { "Processed:" };
            println!(
                "{} {} ({} slides)",
                label.green().bold(),
                path.display(),
                slide_count
            );
            println!("  ID: {}", id);
        }
    }

    Ok(())
}

fn into_storage(pipeline: &IngestionPipeline, path: PathBuf) -> Result<PathBuf> {
    let roots = pipeline.roots();
    if roots.categorize(&path).is_some() {
        return Ok(path);
    }

    let filename = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Not a file: {}", path.display()))?;
    let target = roots.stage.join(filename);
    if target.exists() {
        anyhow::bail!(
            "{} is outside storage and {} already exists",
            path.display(),
            target.display()
        );
    }

    std::fs::copy(&path, &target)
        .with_context(|| format!("Failed to copy {} into stage", path.display()))?;
    println!("{} {}", "Copied into stage:".cyan(), target.display());
    Ok(target)
}

/// Clear the library and run every stored deck through the pipeline again.
pub fn reprocess_all() -> Result<()> {
    let (_config, db, pipeline) = open_pipeline()?;
    let before = db.counts()?;

    println!(
        "{} {} presentations, {} slides will be cleared.",
        "Reprocessing library:".cyan().bold(),
        before.presentations,
        before.slides
    );

    let rt = tokio_runtime()?;
    rt.block_on(async {
        let handles = pipeline.reprocess_all()?;

        let pb = ProgressBar::new(handles.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));

        for handle in handles {
            if let Err(e) = handle.await {
                pb.println(format!("{} {}", "Task failed:".red(), e));
            }
            pb.inc(1);
            if let Some(file) = pipeline.status().snapshot().current_file {
                pb.set_message(file);
            }
        }
        pb.finish_and_clear();
        anyhow::Ok(())
    })?;

    let status = pipeline.status().snapshot();
    let after = db.counts()?;
    println!("{}", "Reprocess complete".green().bold());
    println!(
        "  Processed: {}  Skipped: {}  Failed: {}",
        status.processed, status.skipped, status.failed
    );
    println!(
        "  Library: {} presentations, {} slides",
        after.presentations, after.slides
    );

    Ok(())
}
