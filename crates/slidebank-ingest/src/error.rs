//! Error types for the ingestion pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that abort ingestion of a file or startup of the watcher.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] slidebank_core::Error),

    #[error("Config error: {0}")]
    Config(#[from] slidebank_config::ConfigError),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("{0} is not inside a watched storage root")]
    OutsideStorage(PathBuf),

    #[error("Cannot read presentation {path}: {source}")]
    Extraction {
        path: PathBuf,
        #[source]
        source: slidebank_pptx::PptxError,
    },

    #[error("Watch error: {0}")]
    WatchError(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<notify::Error> for IngestError {
    fn from(err: notify::Error) -> Self {
        IngestError::WatchError(err.to_string())
    }
}
