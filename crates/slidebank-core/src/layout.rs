//! Structured slide content: the shape/run tree and slide annotations.
//!
//! The tree is strongly typed here and serialized to JSON only at the
//! storage boundary. `SlideLayout::version` is bumped whenever the
//! serialized shape changes incompatibly.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Current version of the serialized slide layout.
pub const LAYOUT_SCHEMA_VERSION: u32 = 1;

/// Author used for speaker notes folded into a slide's comment list.
pub const NOTES_AUTHOR: &str = "Presenter Note";

/// Author used when a comment's author id cannot be resolved.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// Semantic role of a shape, derived from its placeholder type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Title,
    Body,
    #[default]
    Other,
}

impl ShapeKind {
    /// Classify a placeholder `type` attribute.
    ///
    /// `title` and `ctrTitle` are titles, `body` is body text and
    /// everything else (including no placeholder at all) is `Other`.
    pub fn from_placeholder(placeholder: Option<&str>) -> Self {
        match placeholder {
            Some("title") | Some("ctrTitle") => ShapeKind::Title,
            Some("body") => ShapeKind::Body,
            _ => ShapeKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::Title => "title",
            ShapeKind::Body => "body",
            ShapeKind::Other => "other",
        }
    }
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A run of text with its character formatting.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    /// Size in whole points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    /// Color as `#RRGGBB`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl TextRun {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// A shape holding at least one text run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Shape {
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    pub runs: Vec<TextRun>,
}

impl Shape {
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            runs: Vec::new(),
        }
    }

    /// Text of all runs, joined without separators.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Ordered shapes of one slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideLayout {
    pub version: u32,
    /// 1-based slide number.
    pub index: u32,
    pub shapes: Vec<Shape>,
}

impl SlideLayout {
    pub fn new(index: u32) -> Self {
        Self {
            version: LAYOUT_SCHEMA_VERSION,
            index,
            shapes: Vec::new(),
        }
    }

    /// Serialize for storage.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    /// Parse a stored payload. Payloads from a newer schema are rejected.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let layout: SlideLayout = serde_json::from_value(value.clone()).ok()?;
        (layout.version <= LAYOUT_SCHEMA_VERSION).then_some(layout)
    }
}

/// A human annotation on a slide: a review comment or a speaker note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDateTime>,
}

impl Comment {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
            date: None,
        }
    }
}

/// Flatten comments into the text stored on a slide record.
pub fn comments_to_text(comments: &[Comment]) -> String {
    comments
        .iter()
        .filter(|c| !c.text.trim().is_empty())
        .map(|c| format!("{}: {}", c.author, c.text.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_kind_classification() {
        assert_eq!(ShapeKind::from_placeholder(Some("title")), ShapeKind::Title);
        assert_eq!(ShapeKind::from_placeholder(Some("ctrTitle")), ShapeKind::Title);
        assert_eq!(ShapeKind::from_placeholder(Some("body")), ShapeKind::Body);
        assert_eq!(ShapeKind::from_placeholder(Some("subTitle")), ShapeKind::Other);
        assert_eq!(ShapeKind::from_placeholder(Some("dt")), ShapeKind::Other);
        assert_eq!(ShapeKind::from_placeholder(None), ShapeKind::Other);
    }

    #[test]
    fn test_layout_json_shape() {
        let mut layout = SlideLayout::new(2);
        let mut shape = Shape::new(ShapeKind::Body);
        shape.runs.push(TextRun {
            text: "Revenue".to_string(),
            bold: true,
            size: Some(24),
            font: None,
            color: Some("#FF0000".to_string()),
        });
        layout.shapes.push(shape);

        let json = layout.to_json();
        assert_eq!(json["version"], 1);
        assert_eq!(json["shapes"][0]["type"], "body");
        assert_eq!(json["shapes"][0]["runs"][0]["bold"], true);
        assert!(json["shapes"][0]["runs"][0].get("font").is_none());

        assert_eq!(SlideLayout::from_json(&json), Some(layout));
    }

    #[test]
    fn test_layout_rejects_future_version() {
        let json = serde_json::json!({ "version": 99, "index": 1, "shapes": [] });
        assert!(SlideLayout::from_json(&json).is_none());
    }

    #[test]
    fn test_comments_to_text() {
        let comments = vec![
            Comment::new("Ana", "Check the numbers"),
            Comment::new(NOTES_AUTHOR, "  "),
            Comment::new(NOTES_AUTHOR, "Mention Q2"),
        ];
        assert_eq!(
            comments_to_text(&comments),
            "Ana: Check the numbers\nPresenter Note: Mention Q2"
        );
    }
}
