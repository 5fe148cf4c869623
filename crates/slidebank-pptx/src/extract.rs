//! Slide text, shape tree and tag extraction.

use crate::annotations::{self, AuthorTable};
use crate::error::PptxResult;
use crate::package::{slide_part_name, Package};
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use slidebank_core::{Comment, Shape, ShapeKind, SlideLayout, TextRun};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, warn};

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("valid regex"));

/// Everything extracted from one slide.
#[derive(Debug, Clone, PartialEq)]
pub struct SlideContent {
    pub number: u32,
    /// Non-empty run texts joined by single spaces.
    pub text: String,
    pub layout: SlideLayout,
    /// Review comments followed by speaker notes.
    pub comments: Vec<Comment>,
}

/// Result of extracting a whole deck.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedDeck {
    /// Highest slide number present in the container, parsed or not.
    pub slide_count: u32,
    /// Successfully parsed slides by number. Slides that failed to parse are absent.
    pub slides: BTreeMap<u32, SlideContent>,
}

impl ExtractedDeck {
    pub fn slide(&self, number: u32) -> Option<&SlideContent> {
        self.slides.get(&number)
    }
}

/// Extract text, structure and annotations for every slide.
///
/// Failing to open the archive is an error; a slide that fails to parse is
/// logged and left out of the result.
pub fn extract_slide_content(path: &Path) -> PptxResult<ExtractedDeck> {
    let mut package = Package::open(path)?;
    let authors = AuthorTable::load(&mut package);
    let mut deck = ExtractedDeck::default();

    for (number, part) in package.slide_parts() {
        deck.slide_count = deck.slide_count.max(number);

        let parsed = package
            .read(&part)
            .and_then(|xml| match xml {
                Some(xml) => parse_slide_xml(&xml, number).map(Some),
                None => Ok(None),
            });

        let (layout, text) = match parsed {
            Ok(Some(parsed)) => parsed,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping slide {} of {}: {}", number, path.display(), e);
                continue;
            }
        };

        let mut comments = annotations::slide_comments(&mut package, &part, &authors);
        comments.extend(annotations::slide_notes(&mut package, &part, number));

        deck.slides.insert(
            number,
            SlideContent {
                number,
                text,
                layout,
                comments,
            },
        );
    }

    debug!(
        "Extracted {} of {} slides from {}",
        deck.slides.len(),
        deck.slide_count,
        path.display()
    );
    Ok(deck)
}

/// Collect the distinct `{{tag}}` tokens that appear anywhere in slide XML.
pub fn extract_tags(path: &Path) -> PptxResult<Vec<String>> {
    let mut package = Package::open(path)?;
    let mut tags = BTreeSet::new();

    for (number, part) in package.slide_parts() {
        let xml = match package.read(&part) {
            Ok(Some(xml)) => xml,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping tag scan of slide {}: {}", number, e);
                continue;
            }
        };
        tags.extend(scan_tags(&xml));
    }

    Ok(tags.into_iter().collect())
}

fn scan_tags(xml: &str) -> Vec<String> {
    TAG_PATTERN
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Plain text of one slide, reading only that slide's part.
pub fn slide_text(path: &Path, number: u32) -> PptxResult<Option<String>> {
    let mut package = Package::open(path)?;
    match package.read(&slide_part_name(number))? {
        Some(xml) => Ok(Some(parse_slide_xml(&xml, number)?.1)),
        None => Ok(None),
    }
}

/// Every shape of one slide in document order, text or not.
///
/// Indices into the result are the ones [`update_slide_text`](crate::update_slide_text)
/// takes. `None` when the slide does not exist.
pub fn editable_shapes(path: &Path, number: u32) -> PptxResult<Option<Vec<Shape>>> {
    let mut package = Package::open(path)?;
    match package.read(&slide_part_name(number))? {
        Some(xml) => Ok(Some(parse_shapes(&xml, number, true)?.0.shapes)),
        None => Ok(None),
    }
}

/// Parse one slide part into its shape tree and plain text.
///
/// Shapes without any text are left out of the tree.
pub fn parse_slide_xml(xml: &str, number: u32) -> PptxResult<(SlideLayout, String)> {
    parse_shapes(xml, number, false)
}

fn parse_shapes(xml: &str, number: u32, keep_empty: bool) -> PptxResult<(SlideLayout, String)> {
    let mut reader = Reader::from_str(xml);
    let mut layout = SlideLayout::new(number);
    let mut texts: Vec<String> = Vec::new();

    let mut shape: Option<Shape> = None;
    let mut run: Option<TextRun> = None;
    let mut in_run_props = false;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sp" => shape = Some(Shape::new(ShapeKind::Other)),
                b"r" if shape.is_some() => run = Some(TextRun::default()),
                b"rPr" => {
                    if let Some(run) = run.as_mut() {
                        apply_run_properties(run, &e)?;
                        in_run_props = true;
                    }
                }
                b"t" if run.is_some() => in_text = true,
                _ => apply_empty_or_start(&e, &mut shape, &mut run, in_run_props)?,
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"sp" if keep_empty && shape.is_none() => {
                    layout.shapes.push(Shape::new(ShapeKind::Other));
                }
                b"rPr" => {
                    if let Some(run) = run.as_mut() {
                        apply_run_properties(run, &e)?;
                    }
                }
                _ => apply_empty_or_start(&e, &mut shape, &mut run, in_run_props)?,
            },
            Event::Text(e) if in_text => {
                if let Some(run) = run.as_mut() {
                    run.text.push_str(&e.unescape().map_err(quick_xml::Error::from)?);
                }
            }
            Event::CData(e) if in_text => {
                if let Some(run) = run.as_mut() {
                    run.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"rPr" => in_run_props = false,
                b"r" => {
                    if let (Some(shape), Some(run)) = (shape.as_mut(), run.take()) {
                        if !run.text.is_empty() {
                            texts.push(run.text.clone());
                            shape.runs.push(run);
                        }
                    }
                    in_run_props = false;
                    in_text = false;
                }
                b"sp" => {
                    if let Some(shape) = shape.take() {
                        if keep_empty || !shape.runs.is_empty() {
                            layout.shapes.push(shape);
                        }
                    }
                    run = None;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let text = texts.join(" ").trim().to_string();
    Ok((layout, text))
}

/// Elements that may appear either self-closed or with children.
fn apply_empty_or_start(
    e: &BytesStart,
    shape: &mut Option<Shape>,
    run: &mut Option<TextRun>,
    in_run_props: bool,
) -> PptxResult<()> {
    match e.local_name().as_ref() {
        b"ph" => {
            if let Some(shape) = shape.as_mut() {
                let placeholder = attribute(e, b"type")?;
                shape.kind = ShapeKind::from_placeholder(placeholder.as_deref());
            }
        }
        b"latin" if in_run_props => {
            if let Some(run) = run.as_mut() {
                run.font = attribute(e, b"typeface")?.filter(|f| !f.is_empty());
            }
        }
        b"srgbClr" if in_run_props => {
            if let Some(run) = run.as_mut() {
                run.color = attribute(e, b"val")?.map(|v| format!("#{}", v));
            }
        }
        _ => {}
    }
    Ok(())
}

fn apply_run_properties(run: &mut TextRun, e: &BytesStart) -> PptxResult<()> {
    if let Some(bold) = attribute(e, b"b")? {
        run.bold = bold == "1" || bold == "true";
    }
    if let Some(size) = attribute(e, b"sz")? {
        // Stored in hundredths of a point.
        run.size = size.parse::<u32>().ok().map(|sz| sz / 100);
    }
    Ok(())
}

pub(crate) fn attribute(e: &BytesStart, name: &[u8]) -> PptxResult<Option<String>> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == name {
            let value = attr.unescape_value().map_err(quick_xml::Error::from)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
