//! Error types for thumbnail rendering.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for rendering operations.
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Errors that can occur while rendering thumbnails.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Tool not found: {tool}. Please install it.")]
    ToolNotFound { tool: String },

    #[error("{tool} produced no {expected}: {output} (found: {found:?})")]
    MissingOutput {
        tool: String,
        expected: String,
        output: String,
        found: Vec<String>,
    },

    #[error("{tool} failed with exit code {code}: {output}")]
    ProcessFailed {
        tool: String,
        code: i32,
        output: String,
    },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}
