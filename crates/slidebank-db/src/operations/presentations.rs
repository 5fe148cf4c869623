//! Presentation CRUD operations.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, types::Value as SqlValue, OptionalExtension};
use slidebank_core::{Presentation, PresentationId, PresentationUpdate};

const COLUMNS: &str = "id, filename, canonical_path, checksum, is_template, tags, ai_summary, title, metadata, created_at";

impl Database {
    /// Create a new presentation, returning its id.
    pub fn create_presentation(&self, presentation: &Presentation) -> DbResult<PresentationId> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO presentations (id, filename, canonical_path, checksum, is_template, tags, ai_summary, title, metadata, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                presentation.id,
                presentation.filename,
                presentation.canonical_path,
                presentation.checksum,
                presentation.is_template,
                serde_json::to_string(&presentation.tags)?,
                presentation.summary,
                presentation.title,
                presentation.metadata.to_string(),
                presentation.created_at.to_rfc3339(),
            ],
        )?;
        Ok(presentation.id.clone())
    }

    /// Get a presentation by ID.
    pub fn get_presentation(&self, id: &str) -> DbResult<Presentation> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM presentations WHERE id = ?1", COLUMNS),
            params![id],
            row_to_presentation,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                DbError::NotFound(format!("Presentation not found: {}", id))
            }
            _ => DbError::from(e),
        })
    }

    /// Get a presentation by full ID or unique ID prefix.
    pub fn get_presentation_by_prefix(&self, prefix: &str) -> DbResult<Presentation> {
        if let Ok(presentation) = self.get_presentation(prefix) {
            return Ok(presentation);
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM presentations WHERE id LIKE ?1 LIMIT 2",
            COLUMNS
        ))?;
        let mut found: Vec<Presentation> = stmt
            .query_map(params![format!("{}%", prefix)], row_to_presentation)?
            .collect::<Result<Vec<_>, _>>()?;

        match found.len() {
            0 => Err(DbError::NotFound(format!("Presentation not found: {}", prefix))),
            1 => Ok(found.remove(0)),
            _ => Err(DbError::AmbiguousPrefix(prefix.to_string())),
        }
    }

    /// Any presentation with this checksum.
    pub fn find_presentation_by_checksum(&self, checksum: &str) -> DbResult<Option<Presentation>> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                &format!(
                    "SELECT {} FROM presentations WHERE checksum = ?1 ORDER BY created_at LIMIT 1",
                    COLUMNS
                ),
                params![checksum],
                row_to_presentation,
            )
            .optional()?;
        Ok(found)
    }

    /// The presentation stored under this exact filename and canonical path.
    pub fn find_presentation_by_identity(
        &self,
        filename: &str,
        canonical_path: &str,
    ) -> DbResult<Option<Presentation>> {
        let conn = self.conn()?;
        let found = conn
            .query_row(
                &format!(
                    "SELECT {} FROM presentations WHERE filename = ?1 AND canonical_path = ?2 LIMIT 1",
                    COLUMNS
                ),
                params![filename, canonical_path],
                row_to_presentation,
            )
            .optional()?;
        Ok(found)
    }

    /// Apply a partial update. Fields left as `None` are untouched.
    pub fn update_presentation(&self, id: &str, update: &PresentationUpdate) -> DbResult<()> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();

        if let Some(filename) = &update.filename {
            sets.push("filename = ?");
            values.push(SqlValue::Text(filename.clone()));
        }
        if let Some(path) = &update.canonical_path {
            sets.push("canonical_path = ?");
            values.push(SqlValue::Text(path.clone()));
        }
        if let Some(checksum) = &update.checksum {
            sets.push("checksum = ?");
            values.push(SqlValue::Text(checksum.clone()));
        }
        if let Some(is_template) = update.is_template {
            sets.push("is_template = ?");
            values.push(SqlValue::Integer(is_template as i64));
        }
        if let Some(tags) = &update.tags {
            sets.push("tags = ?");
            values.push(SqlValue::Text(serde_json::to_string(tags)?));
        }
        if let Some(summary) = &update.summary {
            sets.push("ai_summary = ?");
            values.push(SqlValue::Text(summary.clone()));
        }
        if let Some(title) = &update.title {
            sets.push("title = ?");
            values.push(SqlValue::Text(title.clone()));
        }
        if let Some(metadata) = &update.metadata {
            sets.push("metadata = ?");
            values.push(SqlValue::Text(metadata.to_string()));
        }

        if sets.is_empty() {
            return Ok(());
        }

        values.push(SqlValue::Text(id.to_string()));
        let sql = format!("UPDATE presentations SET {} WHERE id = ?", sets.join(", "));

        let conn = self.conn()?;
        let rows = conn.execute(&sql, params_from_iter(values))?;
        if rows == 0 {
            return Err(DbError::NotFound(format!("Presentation not found: {}", id)));
        }
        Ok(())
    }

    /// Most recently created presentations first.
    pub fn list_presentations(&self, limit: Option<i64>) -> DbResult<Vec<Presentation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM presentations ORDER BY created_at DESC LIMIT ?1",
            COLUMNS
        ))?;
        let rows = stmt.query_map(params![limit.unwrap_or(100)], row_to_presentation)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Delete every presentation; slides go with them.
    pub fn clear_all(&self) -> DbResult<usize> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM presentations", [])?;
        Ok(removed)
    }
}

fn row_to_presentation(row: &rusqlite::Row) -> rusqlite::Result<Presentation> {
    let tags_str: String = row.get(5)?;
    let metadata_str: String = row.get(8)?;
    let created_at_str: String = row.get(9)?;

    Ok(Presentation {
        id: row.get(0)?,
        filename: row.get(1)?,
        canonical_path: row.get(2)?,
        checksum: row.get(3)?,
        is_template: row.get(4)?,
        tags: serde_json::from_str(&tags_str).unwrap_or_default(),
        summary: row.get(6)?,
        title: row.get(7)?,
        metadata: serde_json::from_str(&metadata_str).unwrap_or_default(),
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}
