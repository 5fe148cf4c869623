//! Database CRUD operations.

pub mod flags;
pub mod presentations;
pub mod slides;
pub mod stats;
pub mod usage;
