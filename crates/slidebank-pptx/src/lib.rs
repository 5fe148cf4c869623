//! SlideBank PPTX - Reads and edits presentation packages.
//!
//! Extraction produces plain text, a typed shape/run tree and slide
//! annotations (comments and speaker notes) per slide. Mutation replaces the
//! text of a single shape and rewrites the archive atomically.

mod annotations;
mod error;
mod extract;
mod mutate;
mod package;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use annotations::AuthorTable;
pub use error::{PptxError, PptxResult};
pub use extract::{
    editable_shapes, extract_slide_content, extract_tags, parse_slide_xml, slide_text, ExtractedDeck,
    SlideContent,
};
pub use mutate::{replace_shape_text, update_slide_text};
pub use package::{resolve_part_path, slide_number, Package, Relationship};
