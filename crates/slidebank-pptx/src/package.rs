//! Part-level access to a presentation package (the zip container).

use crate::error::{PptxError, PptxResult};
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use zip::result::ZipError;
use zip::ZipArchive;

static SLIDE_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").expect("valid regex"));

/// Relationship type suffixes used to find a slide's annotation parts.
pub(crate) const REL_COMMENTS: &str = "comments";
pub(crate) const REL_NOTES_SLIDE: &str = "notesSlide";

/// An opened package with its part names indexed.
pub struct Package {
    archive: ZipArchive<BufReader<File>>,
    names: BTreeSet<String>,
}

impl Package {
    /// Open a package. Failure here is fatal for the whole file.
    pub fn open(path: &Path) -> PptxResult<Self> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(BufReader::new(file))?;
        let names = archive.file_names().map(str::to_string).collect();
        Ok(Self { archive, names })
    }

    /// Read a part as UTF-8 text. A missing part is `Ok(None)`.
    pub fn read(&mut self, part: &str) -> PptxResult<Option<String>> {
        let mut entry = match self.archive.by_name(part) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut contents = String::new();
        entry.read_to_string(&mut contents)?;
        Ok(Some(contents))
    }

    /// Slide parts as `(number, part name)`, ordered by slide number.
    pub fn slide_parts(&self) -> Vec<(u32, String)> {
        let mut parts: Vec<(u32, String)> = self
            .names
            .iter()
            .filter_map(|name| slide_number(name).map(|n| (n, name.clone())))
            .collect();
        parts.sort();
        parts
    }

    /// Relationships declared for `part`. A part without a rels file has none.
    pub fn relationships(&mut self, part: &str) -> PptxResult<Vec<Relationship>> {
        let rels_name = rels_part_name(part);
        match self.read(&rels_name)? {
            Some(xml) => parse_relationships(&xml, part),
            None => Ok(Vec::new()),
        }
    }
}

/// The slide number encoded in a slide part name.
pub fn slide_number(part: &str) -> Option<u32> {
    SLIDE_PART
        .captures(part)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn slide_part_name(number: u32) -> String {
    format!("ppt/slides/slide{}.xml", number)
}

/// `ppt/slides/slide1.xml` -> `ppt/slides/_rels/slide1.xml.rels`
pub fn rels_part_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the part that declares it.
///
/// Targets are relative to the source part's directory unless they start
/// with `/`, which anchors them at the package root.
pub fn resolve_part_path(source_part: &str, target: &str) -> String {
    let mut segments: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        source_part
            .rsplit_once('/')
            .map(|(dir, _)| dir.split('/').collect())
            .unwrap_or_default()
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// One entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    /// Target resolved to a full part name.
    pub target: String,
    pub external: bool,
}

impl Relationship {
    pub fn has_type(&self, suffix: &str) -> bool {
        self.rel_type.ends_with(suffix)
    }
}

fn parse_relationships(xml: &str, source_part: &str) -> PptxResult<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    let mut relationships = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = String::new();
                let mut rel_type = String::new();
                let mut target = String::new();
                let mut external = false;

                for attr in e.attributes().flatten() {
                    let value = attr
                        .unescape_value()
                        .map_err(quick_xml::Error::from)?
                        .into_owned();
                    match attr.key.local_name().as_ref() {
                        b"Id" => id = value,
                        b"Type" => rel_type = value,
                        b"Target" => target = value,
                        b"TargetMode" => external = value == "External",
                        _ => {}
                    }
                }

                if target.is_empty() {
                    return Err(PptxError::Malformed {
                        part: rels_part_name(source_part),
                        reason: format!("relationship {} has no target", id),
                    });
                }

                let target = if external {
                    target
                } else {
                    resolve_part_path(source_part, &target)
                };
                relationships.push(Relationship {
                    id,
                    rel_type,
                    target,
                    external,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(relationships)
}
