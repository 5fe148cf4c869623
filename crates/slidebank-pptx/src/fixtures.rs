//! In-memory presentation builder for tests.

use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// A text shape, optionally a placeholder of the given type.
pub fn shape_xml(placeholder: Option<&str>, text: &str) -> String {
    let ph = match placeholder {
        Some(kind) => format!(r#"<p:ph type="{}"/>"#, kind),
        None => String::new(),
    };
    let paragraph = if text.is_empty() {
        "<a:p><a:endParaRPr lang=\"en-US\"/></a:p>".to_string()
    } else {
        format!(
            r#"<a:p><a:r><a:rPr lang="en-US" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
            escape(text)
        )
    };
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Shape"/><p:cNvSpPr/><p:nvPr>{}</p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{}</p:txBody></p:sp>"#,
        ph, paragraph
    )
}

/// A slide part holding the given shapes.
pub fn slide_xml(shapes: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld {}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{}</p:spTree></p:cSld></p:sld>"#,
        NS,
        shapes.concat()
    )
}

/// Builds a minimal but structurally valid presentation package.
#[derive(Debug, Clone, Default)]
pub struct DeckBuilder {
    slides: Vec<String>,
    slide_rels: Vec<Vec<(String, String)>>,
    parts: Vec<(String, String)>,
    legacy_authors: Vec<String>,
}

impl DeckBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a slide with raw XML.
    pub fn slide_xml(mut self, xml: impl Into<String>) -> Self {
        self.slides.push(xml.into());
        self.slide_rels.push(Vec::new());
        self
    }

    /// Append a slide with an optional title placeholder and body placeholder.
    pub fn text_slide(self, title: Option<&str>, body: Option<&str>) -> Self {
        let mut shapes = Vec::new();
        if let Some(title) = title {
            shapes.push(shape_xml(Some("title"), title));
        }
        if let Some(body) = body {
            shapes.push(shape_xml(Some("body"), body));
        }
        self.slide_xml(slide_xml(&shapes))
    }

    /// Add an arbitrary extra part.
    pub fn part(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.parts.push((name.into(), content.into()));
        self
    }

    /// Attach a legacy review comment to slide `number`.
    pub fn legacy_comment(mut self, number: u32, author: &str, text: &str) -> Self {
        let author_id = match self.legacy_authors.iter().position(|a| a == author) {
            Some(id) => id,
            None => {
                self.legacy_authors.push(author.to_string());
                self.legacy_authors.len() - 1
            }
        };
        let part = format!("ppt/comments/comment{}.xml", number);
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><p:cmLst {}><p:cm authorId="{}" dt="2024-05-14T12:00:00.000" idx="1"><p:pos x="10" y="10"/><p:text>{}</p:text></p:cm></p:cmLst>"#,
            NS,
            author_id,
            escape(text)
        );
        self.link(number, "comments", &format!("../comments/comment{}.xml", number));
        self.part(part, xml)
    }

    /// Attach speaker notes to slide `number`, one paragraph per entry.
    pub fn notes(mut self, number: u32, paragraphs: &[&str]) -> Self {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<a:p><a:r><a:t>{}</a:t></a:r></a:p>", escape(*p)))
            .collect();
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><p:notes {}><p:cSld><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="2" name="Notes"/><p:cNvSpPr/><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/>{}</p:txBody></p:sp></p:spTree></p:cSld></p:notes>"#,
            NS, body
        );
        self.link(
            number,
            "notesSlide",
            &format!("../notesSlides/notesSlide{}.xml", number),
        );
        self.part(format!("ppt/notesSlides/notesSlide{}.xml", number), xml)
    }

    fn link(&mut self, number: u32, rel_type: &str, target: &str) {
        let index = (number as usize).saturating_sub(1);
        if let Some(rels) = self.slide_rels.get_mut(index) {
            rels.push((format!("{}/{}", REL_BASE, rel_type), target.to_string()));
        }
    }

    /// Serialize the package.
    pub fn to_bytes(&self) -> ZipResult<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        add_part(&mut writer, "[Content_Types].xml", &self.content_types())?;
        add_part(&mut writer, "ppt/presentation.xml", &self.presentation())?;

        for (i, slide) in self.slides.iter().enumerate() {
            let number = i + 1;
            add_part(&mut writer, &format!("ppt/slides/slide{}.xml", number), slide)?;

            let mut rels = vec![(
                format!("{}/slideLayout", REL_BASE),
                "../slideLayouts/slideLayout1.xml".to_string(),
            )];
            rels.extend(self.slide_rels[i].iter().cloned());
            add_part(
                &mut writer,
                &format!("ppt/slides/_rels/slide{}.xml.rels", number),
                &relationships(&rels),
            )?;
        }

        if !self.legacy_authors.is_empty() {
            let authors: String = self
                .legacy_authors
                .iter()
                .enumerate()
                .map(|(id, name)| {
                    format!(
                        r#"<p:cmAuthor id="{}" name="{}" initials="X" lastIdx="1" clrIdx="{}"/>"#,
                        id,
                        escape(name.as_str()),
                        id
                    )
                })
                .collect();
            add_part(
                &mut writer,
                "ppt/commentAuthors.xml",
                &format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?><p:cmAuthorLst {}>{}</p:cmAuthorLst>"#,
                    NS, authors
                ),
            )?;
        }

        for (name, content) in &self.parts {
            add_part(&mut writer, name, content)?;
        }

        Ok(writer.finish()?.into_inner())
    }

    /// Write the package to `path`.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        let bytes = self
            .to_bytes()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, bytes)
    }

    fn content_types(&self) -> String {
        let overrides: String = (1..=self.slides.len())
            .map(|n| {
                format!(
                    r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
                    n
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>{}</Types>"#,
            overrides
        )
    }

    fn presentation(&self) -> String {
        let ids: String = (1..=self.slides.len())
            .map(|n| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><p:presentation {}><p:sldIdLst>{}</p:sldIdLst></p:presentation>"#,
            NS, ids
        )
    }
}

fn add_part(writer: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, content: &str) -> ZipResult<()> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file(name, options)?;
    writer.write_all(content.as_bytes())?;
    Ok(())
}

fn relationships(rels: &[(String, String)]) -> String {
    let entries: String = rels
        .iter()
        .enumerate()
        .map(|(i, (rel_type, target))| {
            format!(
                r#"<Relationship Id="rId{}" Type="{}" Target="{}"/>"#,
                i + 1,
                rel_type,
                target
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="{}">{}</Relationships>"#,
        REL_NS, entries
    )
}
