//! CLI command implementations.

pub mod config;
pub mod extract;
pub mod flag;
pub mod init;
pub mod process;
pub mod recent;
pub mod show;
pub mod status;
pub mod thumbnails;
pub mod watch;

use anyhow::{Context, Result};
use slidebank_config::{AppPaths, Config};
use slidebank_db::Database;
use slidebank_ingest::IngestionPipeline;
use std::sync::Arc;

/// Load the configuration, falling back to defaults when no file exists.
pub fn load_config() -> Result<Config> {
    Config::load().context("Failed to load config")
}

/// Application paths for a loaded configuration.
pub fn get_paths(config: &Config) -> Result<AppPaths> {
    config
        .app_paths()
        .context("Failed to determine application directories")
}

/// Open the database, ensuring slidebank is initialized.
pub fn get_database(paths: &AppPaths) -> Result<Database> {
    if !paths.is_initialized() {
        anyhow::bail!("SlideBank is not initialized. Run 'slidebank init' first.");
    }

    Database::open(&paths.database_file).context("Failed to open database")
}

/// Config, database and a fully wired pipeline.
pub fn open_pipeline() -> Result<(Config, Database, IngestionPipeline)> {
    let config = load_config()?;
    let paths = get_paths(&config)?;
    let db = get_database(&paths)?;
    let pipeline = IngestionPipeline::from_config(&config, Arc::new(db.clone()))
        .context("Failed to set up ingestion pipeline")?;
    pipeline
        .roots()
        .ensure_dirs()
        .context("Failed to create storage directories")?;
    Ok((config, db, pipeline))
}

pub fn tokio_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to create async runtime")
}

/// First `max` characters of `text` on one line, with an ellipsis when cut.
pub fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max {
        let cut: String = flat.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}
