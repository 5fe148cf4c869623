//! SlideBank DB - SQLite storage for presentations, slides and flags.

mod database;
mod error;
mod migrations;
mod operations;
mod repository;

pub use database::Database;
pub use error::{DbError, DbResult};
