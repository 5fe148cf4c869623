//! Review comments and speaker notes attached to slides.
//!
//! Both the legacy comment layout (`commentAuthors.xml`, `p:cm` with a
//! `p:text` child) and the threaded layout (`authors.xml`, `p188:cm` with a
//! text body and replies) are read into the same `Comment` list.

use crate::error::PptxResult;
use crate::extract::attribute;
use crate::package::{Package, REL_COMMENTS, REL_NOTES_SLIDE};
use chrono::{DateTime, NaiveDateTime};
use quick_xml::events::Event;
use quick_xml::Reader;
use slidebank_core::{Comment, NOTES_AUTHOR, UNKNOWN_AUTHOR};
use std::collections::HashMap;
use tracing::{debug, warn};

const LEGACY_AUTHORS_PART: &str = "ppt/commentAuthors.xml";
const MODERN_AUTHORS_PART: &str = "ppt/authors.xml";

/// Comment author ids mapped to display names.
#[derive(Debug, Clone, Default)]
pub struct AuthorTable {
    names: HashMap<String, String>,
}

impl AuthorTable {
    /// Read every author part present. Unreadable parts leave the table partial.
    pub fn load(package: &mut Package) -> Self {
        let mut table = Self::default();
        for part in [LEGACY_AUTHORS_PART, MODERN_AUTHORS_PART] {
            match package.read(part) {
                Ok(Some(xml)) => {
                    if let Err(e) = table.parse(&xml) {
                        warn!("Ignoring unreadable author table {}: {}", part, e);
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to read {}: {}", part, e),
            }
        }
        table
    }

    fn parse(&mut self, xml: &str) -> PptxResult<()> {
        let mut reader = Reader::from_str(xml);
        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e)
                    if matches!(e.local_name().as_ref(), b"cmAuthor" | b"author") =>
                {
                    if let (Some(id), Some(name)) = (attribute(&e, b"id")?, attribute(&e, b"name")?) {
                        if !id.is_empty() {
                            self.names.insert(id, name);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(())
    }

    /// Display name for an author id; `Unknown` when absent or blank.
    pub fn resolve(&self, id: Option<&str>) -> String {
        id.and_then(|id| self.names.get(id))
            .filter(|name| !name.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
    }
}

/// Comments linked from a slide's relationship part, in document order.
pub fn slide_comments(package: &mut Package, slide_part: &str, authors: &AuthorTable) -> Vec<Comment> {
    let targets: Vec<String> = match package.relationships(slide_part) {
        Ok(rels) => rels
            .into_iter()
            .filter(|r| !r.external && r.has_type(REL_COMMENTS))
            .map(|r| r.target)
            .collect(),
        Err(e) => {
            warn!("Failed to read relationships of {}: {}", slide_part, e);
            return Vec::new();
        }
    };

    let mut comments = Vec::new();
    for target in targets {
        match package.read(&target) {
            Ok(Some(xml)) => match parse_comments(&xml, authors) {
                Ok(parsed) => comments.extend(parsed),
                Err(e) => warn!("Skipping comment part {}: {}", target, e),
            },
            Ok(None) => debug!("Comment part {} referenced but missing", target),
            Err(e) => warn!("Failed to read {}: {}", target, e),
        }
    }
    comments
}

struct PendingComment {
    author_id: Option<String>,
    date: Option<NaiveDateTime>,
    paragraphs: Vec<String>,
}

/// Parse one comment part. Replies become comments of their own, placed
/// after the comment they answer.
pub fn parse_comments(xml: &str, authors: &AuthorTable) -> PptxResult<Vec<Comment>> {
    let mut reader = Reader::from_str(xml);
    let mut slots: Vec<Option<Comment>> = Vec::new();
    let mut open: Vec<(usize, PendingComment)> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"cm" | b"reply" => {
                    let date = attribute(&e, b"dt")?
                        .or(attribute(&e, b"created")?)
                        .and_then(|raw| parse_comment_date(&raw));
                    slots.push(None);
                    open.push((
                        slots.len() - 1,
                        PendingComment {
                            author_id: attribute(&e, b"authorId")?,
                            date,
                            paragraphs: Vec::new(),
                        },
                    ));
                }
                // Legacy comments hold their text directly; threaded ones in a:p/a:t.
                b"text" | b"p" => {
                    if let Some((_, pending)) = open.last_mut() {
                        pending.paragraphs.push(String::new());
                        in_text = e.local_name().as_ref() == b"text";
                    }
                }
                b"t" => in_text = !open.is_empty(),
                _ => {}
            },
            Event::Text(e) if in_text => {
                if let Some(paragraph) = open.last_mut().and_then(|(_, p)| p.paragraphs.last_mut()) {
                    paragraph.push_str(&e.unescape().map_err(quick_xml::Error::from)?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" | b"text" => in_text = false,
                b"cm" | b"reply" => {
                    if let Some((slot, pending)) = open.pop() {
                        let text = pending
                            .paragraphs
                            .iter()
                            .map(|p| p.trim())
                            .filter(|p| !p.is_empty())
                            .collect::<Vec<_>>()
                            .join("\n");
                        let mut comment = Comment::new(authors.resolve(pending.author_id.as_deref()), text);
                        comment.date = pending.date;
                        slots[slot] = Some(comment);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(slots.into_iter().flatten().collect())
}

/// Accepts `2024-05-14T12:00:00.000` and RFC 3339. Anything else is absent.
fn parse_comment_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc()))
}

/// Speaker notes for a slide, one entry per non-empty paragraph.
pub fn slide_notes(package: &mut Package, slide_part: &str, number: u32) -> Vec<Comment> {
    let linked = match package.relationships(slide_part) {
        Ok(rels) => rels
            .into_iter()
            .find(|r| !r.external && r.has_type(REL_NOTES_SLIDE))
            .map(|r| r.target),
        Err(e) => {
            warn!("Failed to read relationships of {}: {}", slide_part, e);
            None
        }
    };
    let part = linked.unwrap_or_else(|| format!("ppt/notesSlides/notesSlide{}.xml", number));

    let xml = match package.read(&part) {
        Ok(Some(xml)) => xml,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("Failed to read {}: {}", part, e);
            return Vec::new();
        }
    };

    match parse_notes(&xml) {
        Ok(paragraphs) => paragraphs
            .into_iter()
            .map(|text| Comment::new(NOTES_AUTHOR, text))
            .collect(),
        Err(e) => {
            warn!("Skipping notes part {}: {}", part, e);
            Vec::new()
        }
    }
}

/// Paragraph texts of a notes part. Field text (slide numbers, dates) is left out.
pub fn parse_notes(xml: &str) -> PptxResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut field_depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => current = Some(String::new()),
                b"fld" => field_depth += 1,
                b"t" => in_text = field_depth == 0 && current.is_some(),
                _ => {}
            },
            Event::Text(e) if in_text => {
                if let Some(current) = current.as_mut() {
                    current.push_str(&e.unescape().map_err(quick_xml::Error::from)?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"fld" => field_depth = field_depth.saturating_sub(1),
                b"p" => {
                    if let Some(text) = current.take() {
                        let text = text.trim();
                        if !text.is_empty() {
                            paragraphs.push(text.to_string());
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authors() -> AuthorTable {
        let mut table = AuthorTable::default();
        table
            .parse(r#"<p:cmAuthorLst xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cmAuthor id="0" name="Ana Ruiz" initials="AR" lastIdx="1" clrIdx="0"/></p:cmAuthorLst>"#)
            .unwrap();
        table
            .parse(r#"<p188:authorLst xmlns:p188="http://schemas.microsoft.com/office/powerpoint/2018/8/main"><p188:author id="{A1}" name="Ben Ode" initials="BO" userId="ben" providerId="None"/></p188:authorLst>"#)
            .unwrap();
        table
    }

    #[test]
    fn test_author_resolution() {
        let table = authors();
        assert_eq!(table.resolve(Some("0")), "Ana Ruiz");
        assert_eq!(table.resolve(Some("{A1}")), "Ben Ode");
        assert_eq!(table.resolve(Some("7")), UNKNOWN_AUTHOR);
        assert_eq!(table.resolve(None), UNKNOWN_AUTHOR);
    }

    #[test]
    fn test_legacy_comments() {
        let xml = r#"<p:cmLst xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:cm authorId="0" dt="2024-05-14T12:00:00.000" idx="1"><p:pos x="10" y="10"/><p:text>Use the new logo</p:text></p:cm>
<p:cm authorId="3" dt="not a date" idx="2"><p:pos x="10" y="10"/><p:text>Numbers &lt; plan</p:text></p:cm>
</p:cmLst>"#;

        let comments = parse_comments(xml, &authors()).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].author, "Ana Ruiz");
        assert_eq!(comments[0].text, "Use the new logo");
        assert_eq!(
            comments[0].date.map(|d| d.to_string()),
            Some("2024-05-14 12:00:00".to_string())
        );
        assert_eq!(comments[1].author, UNKNOWN_AUTHOR);
        assert_eq!(comments[1].text, "Numbers < plan");
        assert!(comments[1].date.is_none());
    }

    #[test]
    fn test_threaded_comments_with_reply() {
        let xml = r#"<p188:cmLst xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p188="http://schemas.microsoft.com/office/powerpoint/2018/8/main">
<p188:cm id="{C1}" authorId="{A1}" created="2024-03-01T09:30:00.000">
  <p188:replyLst>
    <p188:reply id="{R1}" authorId="0" created="2024-03-02T10:00:00Z">
      <p188:txBody><a:bodyPr/><a:p><a:r><a:t>Done</a:t></a:r></a:p></p188:txBody>
    </p188:reply>
  </p188:replyLst>
  <p188:txBody><a:bodyPr/><a:p><a:r><a:t>Swap </a:t></a:r><a:r><a:t>chart</a:t></a:r></a:p><a:p><a:r><a:t>and legend</a:t></a:r></a:p></p188:txBody>
</p188:cm>
</p188:cmLst>"#;

        let comments = parse_comments(xml, &authors()).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].author, "Ben Ode");
        assert_eq!(comments[0].text, "Swap chart\nand legend");
        assert!(comments[0].date.is_some());
        assert_eq!(comments[1].author, "Ana Ruiz");
        assert_eq!(comments[1].text, "Done");
        assert!(comments[1].date.is_some());
    }

    #[test]
    fn test_notes_skip_fields() {
        let xml = r#"<p:notes xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>
<p:sp><p:txBody><a:bodyPr/><a:p><a:r><a:t>First point</a:t></a:r></a:p><a:p><a:r><a:t>  </a:t></a:r></a:p><a:p><a:r><a:t>Second </a:t></a:r><a:r><a:t>point</a:t></a:r></a:p></p:txBody></p:sp>
<p:sp><p:txBody><a:bodyPr/><a:p><a:fld id="{F1}" type="slidenum"><a:t>3</a:t></a:fld></a:p></p:txBody></p:sp>
</p:spTree></p:cSld></p:notes>"#;

        assert_eq!(parse_notes(xml).unwrap(), vec!["First point", "Second point"]);
    }

    #[test]
    fn test_comment_dates() {
        assert!(parse_comment_date("2024-05-14T12:00:00.000").is_some());
        assert!(parse_comment_date("2024-05-14T12:00:00").is_some());
        assert!(parse_comment_date("2024-05-14T12:00:00+02:00").is_some());
        assert!(parse_comment_date("yesterday").is_none());
        assert!(parse_comment_date("").is_none());
    }
}
