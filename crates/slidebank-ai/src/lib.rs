//! SlideBank AI - Slide and deck enrichment through pluggable model providers.
//!
//! A [`Generator`] speaks one provider's protocol and is chosen once, at
//! construction, from the `[ai]` configuration. [`AiClient`] wraps it with the
//! archivist persona and the prompts the ingestion pipeline needs, exposed
//! through the [`Enricher`] trait.

mod client;
mod error;
mod generator;
pub mod providers;
mod types;

pub use client::{AiClient, Enricher};
pub use error::{AiError, AiResult};
pub use generator::Generator;
pub use types::*;
