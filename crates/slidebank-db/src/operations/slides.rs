//! Slide operations.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};
use rusqlite::params;
use slidebank_core::{Slide, SlideLayout};

impl Database {
    /// Insert one slide row.
    pub fn insert_slide(&self, slide: &Slide) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO slides (id, presentation_id, slide_number, thumbnail_path, content, layout, ai_summary, title, comments, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                slide.id,
                slide.presentation_id,
                slide.slide_number,
                slide.thumbnail_path,
                slide.content,
                slide.layout.to_json().to_string(),
                slide.summary,
                slide.title,
                slide.comments,
                slide.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Delete all slides of a presentation.
    pub fn delete_slides(&self, presentation_id: &str) -> DbResult<usize> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM slides WHERE presentation_id = ?1",
            params![presentation_id],
        )?;
        Ok(rows)
    }

    /// Slides of a presentation in slide order.
    pub fn get_slides(&self, presentation_id: &str) -> DbResult<Vec<Slide>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, presentation_id, slide_number, thumbnail_path, content, layout, ai_summary, title, comments, created_at
             FROM slides WHERE presentation_id = ?1 ORDER BY slide_number",
        )?;
        let slides = stmt.query_map(params![presentation_id], row_to_slide)?;
        slides.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

fn row_to_slide(row: &rusqlite::Row) -> rusqlite::Result<Slide> {
    let slide_number: u32 = row.get(2)?;
    let layout_str: String = row.get(5)?;
    let created_at_str: String = row.get(9)?;

    // Unreadable or newer layouts degrade to an empty tree for this slide.
    let layout = serde_json::from_str(&layout_str)
        .ok()
        .and_then(|value| SlideLayout::from_json(&value))
        .unwrap_or_else(|| SlideLayout::new(slide_number));

    Ok(Slide {
        id: row.get(0)?,
        presentation_id: row.get(1)?,
        slide_number,
        thumbnail_path: row.get(3)?,
        content: row.get(4)?,
        layout,
        summary: row.get(6)?,
        title: row.get(7)?,
        comments: row.get(8)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidebank_core::{Presentation, Shape, ShapeKind, TextRun};

    fn setup() -> (Database, Presentation) {
        let db = Database::open_in_memory().unwrap();
        let p = Presentation::new("deck.pptx", "stage/deck.pptx", "hash");
        db.create_presentation(&p).unwrap();
        (db, p)
    }

    #[test]
    fn test_insert_and_get_slides() {
        let (db, p) = setup();

        let mut second = Slide::new(&p.id, 2);
        second.content = "Revenue up 12%".to_string();
        let mut shape = Shape::new(ShapeKind::Body);
        shape.runs.push(TextRun::new("Revenue up 12%"));
        second.layout.shapes.push(shape);

        db.insert_slide(&second).unwrap();
        db.insert_slide(&Slide::new(&p.id, 1)).unwrap();

        let slides = db.get_slides(&p.id).unwrap();
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].slide_number, 1);
        assert_eq!(slides[0].title, "Slide 1");
        assert_eq!(slides[1].content, "Revenue up 12%");
        assert_eq!(slides[1].layout.shapes[0].kind, ShapeKind::Body);
    }

    #[test]
    fn test_slide_number_unique_per_presentation() {
        let (db, p) = setup();
        db.insert_slide(&Slide::new(&p.id, 1)).unwrap();
        assert!(db.insert_slide(&Slide::new(&p.id, 1)).is_err());
    }

    #[test]
    fn test_delete_slides_and_cascade() {
        let (db, p) = setup();
        for n in 1..=3 {
            db.insert_slide(&Slide::new(&p.id, n)).unwrap();
        }

        assert_eq!(db.delete_slides(&p.id).unwrap(), 3);
        assert!(db.get_slides(&p.id).unwrap().is_empty());

        db.insert_slide(&Slide::new(&p.id, 1)).unwrap();
        db.clear_all().unwrap();
        let conn = db.conn().unwrap();
        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM slides", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
