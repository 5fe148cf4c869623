//! SlideBank Core - Domain types shared by the ingestion pipeline and its collaborators.

mod error;
mod layout;
mod repository;
mod types;

pub use error::{Error, Result};
pub use layout::*;
pub use repository::Repository;
pub use types::*;
