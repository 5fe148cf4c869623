//! SlideBank Ingest - Directory watching and the presentation ingestion pipeline.
//!
//! This crate provides:
//! - A recursive directory watcher with an initial scan and quiescence delay
//! - The per-file pipeline: stage + hash, dedup, extract, render, enrich,
//!   persist and finalize into long-term storage
//! - Shared processing status with a broadcast log stream

mod error;
mod files;
mod pipeline;
mod status;
mod watcher;

pub use error::{IngestError, IngestResult};
pub use files::{relocate, stage_and_hash};
pub use pipeline::{FlagDefaults, IngestionPipeline, ProcessOutcome, SkipReason};
pub use status::{ProcessingStatus, StatusSnapshot, TaskGuard, TaskOutcome};
pub use watcher::{scan_root, DirectoryWatcher, WatchFilter, WatchHandle};
