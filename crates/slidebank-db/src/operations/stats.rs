//! Database statistics operations.

use crate::database::Database;
use crate::error::DbResult;
use slidebank_core::RepositoryCounts;

impl Database {
    /// Row counts for the status display.
    pub fn counts(&self) -> DbResult<RepositoryCounts> {
        let conn = self.conn()?;

        let presentations: i64 =
            conn.query_row("SELECT COUNT(*) FROM presentations", [], |row| row.get(0))?;

        let templates: i64 = conn.query_row(
            "SELECT COUNT(*) FROM presentations WHERE is_template = 1",
            [],
            |row| row.get(0),
        )?;

        let slides: i64 = conn.query_row("SELECT COUNT(*) FROM slides", [], |row| row.get(0))?;

        let summarized_slides: i64 = conn.query_row(
            "SELECT COUNT(*) FROM slides WHERE ai_summary IS NOT NULL AND ai_summary != ''",
            [],
            |row| row.get(0),
        )?;

        Ok(RepositoryCounts {
            presentations,
            templates,
            slides,
            summarized_slides,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidebank_core::{Presentation, Slide};

    #[test]
    fn test_counts() {
        let db = Database::open_in_memory().unwrap();
        let p = Presentation::new("a.pptx", "stage/a.pptx", "1").with_tags(vec!["x".into()]);
        db.create_presentation(&p).unwrap();
        db.create_presentation(&Presentation::new("b.pptx", "stage/b.pptx", "2"))
            .unwrap();

        let mut slide = Slide::new(&p.id, 1);
        slide.summary = Some("Overview".to_string());
        db.insert_slide(&slide).unwrap();
        db.insert_slide(&Slide::new(&p.id, 2)).unwrap();

        let counts = db.counts().unwrap();
        assert_eq!(counts.presentations, 2);
        assert_eq!(counts.templates, 1);
        assert_eq!(counts.slides, 2);
        assert_eq!(counts.summarized_slides, 1);
    }
}
