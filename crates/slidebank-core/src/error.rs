//! Errors surfaced through the [`Repository`](crate::Repository) seam.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The backing store rejected or failed the operation.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A presentation or slide lookup matched nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A stored JSON column (layout, metadata) could not be encoded or decoded.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

pub type Result<T> = std::result::Result<T, Error>;
