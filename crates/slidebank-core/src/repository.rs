//! Storage interface consumed by the ingestion pipeline.

use crate::error::Result;
use crate::types::{AiUsageRecord, Presentation, PresentationId, PresentationUpdate, Slide};

/// Persistence for presentations, slides and runtime flags.
///
/// Implementations must tolerate concurrent callers; the pipeline holds no
/// lock across repository calls.
pub trait Repository: Send + Sync {
    /// Any presentation with this content hash, regardless of name or location.
    fn find_by_checksum(&self, checksum: &str) -> Result<Option<Presentation>>;

    /// The presentation recorded under exactly this filename and canonical path.
    fn find_by_identity(&self, filename: &str, canonical_path: &str) -> Result<Option<Presentation>>;

    fn create_presentation(&self, presentation: &Presentation) -> Result<PresentationId>;

    fn update_presentation(&self, id: &str, update: &PresentationUpdate) -> Result<()>;

    /// Remove every slide of a presentation, returning how many were removed.
    fn delete_slides(&self, presentation_id: &str) -> Result<usize>;

    fn insert_slide(&self, slide: &Slide) -> Result<()>;

    fn get_feature_flag(&self, name: &str) -> Result<Option<String>>;

    fn set_feature_flag(&self, name: &str, value: &str) -> Result<()>;

    fn log_ai_usage(&self, usage: &AiUsageRecord) -> Result<()>;

    /// Drop all presentations and slides.
    fn clear_all(&self) -> Result<()>;
}
