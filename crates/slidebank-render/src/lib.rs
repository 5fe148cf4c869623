//! SlideBank Render - Slide thumbnails via external converters.
//!
//! A deck is converted to PDF by an office suite running headless, then the
//! PDF is rasterized to one PNG per page. Both tools must be installed on
//! the system (LibreOffice and Poppler's `pdftoppm` by default).

mod error;
mod thumbnails;

pub use error::{ProcessError, ProcessResult};
pub use thumbnails::{normalize_page_names, RendererConfig, ThumbnailRenderer};
