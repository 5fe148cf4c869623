//! Database error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid JSON column: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),

    #[error("Ambiguous ID prefix '{0}': multiple presentations match")]
    AmbiguousPrefix(String),

    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

impl From<DbError> for slidebank_core::Error {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => slidebank_core::Error::NotFound(what),
            DbError::Json(e) => slidebank_core::Error::CorruptRecord(e.to_string()),
            other => slidebank_core::Error::Storage(other.to_string()),
        }
    }
}
