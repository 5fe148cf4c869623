//! In-place replacement of one shape's text.

use crate::error::{PptxError, PptxResult};
use crate::package::slide_part_name;
use once_cell::sync::Lazy;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::ops::Range;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

static SHAPE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<((?:[A-Za-z_][\w.-]*:)?)sp(\s[^>]*?)?(/?)>").expect("valid regex"));
static TEXT_BODY_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<((?:[A-Za-z_][\w.-]*:)?)txBody(\s[^>]*?)?(/?)>").expect("valid regex"));
static PARAGRAPH_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<((?:[A-Za-z_][\w.-]*:)?)p(\s[^>]*)?/?>").expect("valid regex"));

/// Replace the text of shape `shape_index` (0-based, document order) on
/// slide `slide` with a single paragraph holding `text`.
///
/// Shapes without text count too; [`editable_shapes`](crate::editable_shapes)
/// lists them with matching indices.
///
/// Every other archive entry is copied through unchanged. The archive is
/// rewritten into a temporary file next to `path` and renamed over it only
/// once the new archive is complete; on any error `path` is untouched.
pub fn update_slide_text(path: &Path, slide: u32, shape_index: usize, text: &str) -> PptxResult<()> {
    let part = slide_part_name(slide);
    let mut archive = ZipArchive::new(BufReader::new(File::open(path)?))?;

    let original = {
        let mut entry = match archive.by_name(&part) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Err(PptxError::SlideNotFound(slide)),
            Err(e) => return Err(e.into()),
        };
        let mut xml = String::new();
        entry.read_to_string(&mut xml)?;
        xml
    };

    let updated = replace_shape_text(&original, slide, shape_index, text)?;
    check_well_formed(&updated, &part)?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = ZipWriter::new(temp.as_file_mut());
        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i)?;
            if entry.name() == part {
                let options =
                    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
                let name = entry.name().to_string();
                drop(entry);
                writer.start_file(name, options)?;
                writer.write_all(updated.as_bytes())?;
            } else {
                writer.raw_copy_file(entry)?;
            }
        }
        writer.finish()?;
    }
    // The temp file is created owner-only; keep the deck's own mode.
    let permissions = std::fs::metadata(path)?.permissions();
    temp.as_file().set_permissions(permissions)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| PptxError::Io(e.error))?;

    info!(
        "Replaced text of shape {} on slide {} in {}",
        shape_index,
        slide,
        path.display()
    );
    Ok(())
}

/// Rewrite one shape's text body inside a slide's XML.
pub fn replace_shape_text(xml: &str, slide: u32, shape_index: usize, text: &str) -> PptxResult<String> {
    let shapes = shape_blocks(xml);
    let block = shapes
        .get(shape_index)
        .cloned()
        .ok_or(PptxError::ShapeIndexOutOfRange {
            index: shape_index,
            count: shapes.len(),
        })?;

    let missing_body = || PptxError::MissingTextBody {
        slide,
        index: shape_index,
    };

    let shape_xml = &xml[block.clone()];
    let body = TEXT_BODY_OPEN.captures(shape_xml).ok_or_else(missing_body)?;
    if is_self_closing(&body) {
        return Err(missing_body());
    }
    let body_prefix = body.get(1).map(|m| m.as_str()).unwrap_or_default();
    let body_open_end = body.get(0).map(|m| m.end()).unwrap_or_default();
    let body_close = format!("</{}txBody>", body_prefix);
    let body_close_at = shape_xml[body_open_end..]
        .find(&body_close)
        .map(|offset| body_open_end + offset)
        .ok_or_else(missing_body)?;

    // bodyPr and lstStyle stay; everything from the first paragraph on is replaced.
    let inner = &shape_xml[body_open_end..body_close_at];
    let (replace_from, para_prefix) = match PARAGRAPH_OPEN.captures(inner) {
        Some(caps) => (
            body_open_end + caps.get(0).map(|m| m.start()).unwrap_or_default(),
            caps.get(1).map(|m| m.as_str()).unwrap_or_default().to_string(),
        ),
        None => (body_close_at, "a:".to_string()),
    };
    let para_prefix = if para_prefix.is_empty() && body_prefix.is_empty() {
        String::new()
    } else if para_prefix.is_empty() {
        "a:".to_string()
    } else {
        para_prefix
    };

    let paragraph = format!(
        "<{p}p><{p}r><{p}t>{}</{p}t></{p}r></{p}p>",
        escape(text),
        p = para_prefix
    );

    let mut out = String::with_capacity(xml.len() + paragraph.len());
    out.push_str(&xml[..block.start + replace_from]);
    out.push_str(&paragraph);
    out.push_str(&xml[block.start + body_close_at..]);
    Ok(out)
}

/// Byte ranges of every `sp` element, in document order.
fn shape_blocks(xml: &str) -> Vec<Range<usize>> {
    let mut blocks = Vec::new();
    let mut search_from = 0;

    while let Some(caps) = SHAPE_OPEN.captures_at(xml, search_from) {
        let Some(open) = caps.get(0) else { break };
        let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or_default();

        if is_self_closing(&caps) {
            // Self-closing shape: counts, but has no body.
            blocks.push(open.start()..open.end());
            search_from = open.end();
            continue;
        }

        let close = format!("</{}sp>", prefix);
        match xml[open.end()..].find(&close) {
            Some(offset) => {
                let end = open.end() + offset + close.len();
                blocks.push(open.start()..end);
                search_from = end;
            }
            None => break,
        }
    }

    blocks
}

fn is_self_closing(caps: &regex::Captures) -> bool {
    caps.get(3).map_or(false, |m| !m.as_str().is_empty())
}

fn check_well_formed(xml: &str, part: &str) -> PptxResult<()> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => return Ok(()),
            Ok(_) => {}
            Err(e) => {
                return Err(PptxError::Malformed {
                    part: part.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
