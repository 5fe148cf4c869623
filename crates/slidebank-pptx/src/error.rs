//! Presentation container error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PptxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid presentation archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Slide {0} not found")]
    SlideNotFound(u32),

    #[error("Shape index {index} out of range: slide has {count} shapes")]
    ShapeIndexOutOfRange { index: usize, count: usize },

    #[error("Shape {index} on slide {slide} has no text body")]
    MissingTextBody { slide: u32, index: usize },

    #[error("Malformed part {part}: {reason}")]
    Malformed { part: String, reason: String },
}

pub type PptxResult<T> = Result<T, PptxError>;
