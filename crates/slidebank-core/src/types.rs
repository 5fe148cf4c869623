//! Core domain types for SlideBank.

use crate::layout::SlideLayout;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

/// Unique identifier for presentations.
pub type PresentationId = String;

/// Unique identifier for slides.
pub type SlideId = String;

/// Generate a new unique ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Storage area a file lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Local inbox where new decks are dropped.
    Stage,
    /// Long-term canonical storage.
    Template,
    /// Secondary inbox, typically a remote mount.
    Original,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Stage => "stage",
            Category::Template => "template",
            Category::Original => "original",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Build a canonical `category/relative-path` string.
///
/// Canonical paths always use `/` and never contain a storage root, so the
/// roots can move without invalidating stored records.
pub fn canonical_path(category: Category, relative: &Path) -> String {
    let mut parts = vec![category.as_str().to_string()];
    for component in relative.components() {
        if let Component::Normal(part) = component {
            parts.push(part.to_string_lossy().to_string());
        }
    }
    parts.join("/")
}

/// A file discovered in a watched root. Lives only for one pipeline run.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub category: Category,
    /// Path relative to the category root.
    pub relative: PathBuf,
    pub discovered_at: DateTime<Utc>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, category: Category, relative: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            category,
            relative: relative.into(),
            discovered_at: Utc::now(),
        }
    }

    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn canonical_path(&self) -> String {
        canonical_path(self.category, &self.relative)
    }
}

/// A processed presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presentation {
    pub id: PresentationId,
    pub filename: String,
    /// `category/relative-path`, never absolute.
    pub canonical_path: String,
    pub checksum: String,
    pub is_template: bool,
    pub tags: Vec<String>,
    pub summary: Option<String>,
    pub title: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Presentation {
    pub fn new(
        filename: impl Into<String>,
        canonical_path: impl Into<String>,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            filename: filename.into(),
            canonical_path: canonical_path.into(),
            checksum: checksum.into(),
            is_template: false,
            tags: Vec::new(),
            summary: None,
            title: None,
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    /// Attach template tags; any tag marks the deck as a template.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.is_template = !tags.is_empty();
        self.tags = tags;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Partial update of a presentation. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresentationUpdate {
    pub filename: Option<String>,
    pub canonical_path: Option<String>,
    pub checksum: Option<String>,
    pub is_template: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub summary: Option<String>,
    pub title: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl PresentationUpdate {
    pub fn canonical_path(path: impl Into<String>) -> Self {
        Self {
            canonical_path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn summary(summary: impl Into<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            ..Default::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One slide of a processed presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
    pub id: SlideId,
    pub presentation_id: PresentationId,
    /// 1-based, matching the container's own slide ordinal.
    pub slide_number: u32,
    /// Thumbnail path relative to the thumbnails root.
    pub thumbnail_path: Option<String>,
    pub content: String,
    pub layout: SlideLayout,
    pub summary: Option<String>,
    pub title: String,
    pub comments: String,
    pub created_at: DateTime<Utc>,
}

impl Slide {
    pub fn new(presentation_id: impl Into<PresentationId>, slide_number: u32) -> Self {
        Self {
            id: new_id(),
            presentation_id: presentation_id.into(),
            slide_number,
            thumbnail_path: None,
            content: String::new(),
            layout: SlideLayout::new(slide_number),
            summary: None,
            title: default_slide_title(slide_number),
            comments: String::new(),
            created_at: Utc::now(),
        }
    }
}

/// Title given to a slide when nothing better is available.
pub fn default_slide_title(slide_number: u32) -> String {
    format!("Slide {}", slide_number)
}

/// Runtime switches stored alongside the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureFlag {
    /// Process files as the watcher sees them.
    AutoProcess,
    /// Run AI enrichment for new slides.
    AiEnabled,
}

impl FeatureFlag {
    pub fn name(&self) -> &'static str {
        match self {
            FeatureFlag::AutoProcess => "auto_process",
            FeatureFlag::AiEnabled => "ai_enabled",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "auto_process" => Some(FeatureFlag::AutoProcess),
            "ai_enabled" => Some(FeatureFlag::AiEnabled),
            _ => None,
        }
    }

    pub fn all() -> [FeatureFlag; 2] {
        [FeatureFlag::AutoProcess, FeatureFlag::AiEnabled]
    }
}

/// Parse a stored flag value.
pub fn parse_flag_value(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Token usage of one AI call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiUsageRecord {
    pub provider: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub cost: f64,
    pub created_at: DateTime<Utc>,
}

/// Row counts for status displays.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryCounts {
    pub presentations: i64,
    pub templates: i64,
    pub slides: i64,
    pub summarized_slides: i64,
}
