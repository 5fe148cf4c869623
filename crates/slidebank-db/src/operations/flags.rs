//! Feature flag storage.

use crate::database::Database;
use crate::error::DbResult;
use rusqlite::{params, OptionalExtension};

impl Database {
    pub fn get_feature_flag(&self, name: &str) -> DbResult<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM feature_flags WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_feature_flag(&self, name: &str, value: &str) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO feature_flags (name, value) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET value = excluded.value",
            params![name, value],
        )?;
        Ok(())
    }

    /// All stored flags, sorted by name.
    pub fn list_feature_flags(&self) -> DbResult<Vec<(String, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name, value FROM feature_flags ORDER BY name")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_upsert() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_feature_flag("auto_process").unwrap().is_none());

        db.set_feature_flag("auto_process", "false").unwrap();
        db.set_feature_flag("auto_process", "true").unwrap();
        assert_eq!(
            db.get_feature_flag("auto_process").unwrap().as_deref(),
            Some("true")
        );
        assert_eq!(db.list_feature_flags().unwrap().len(), 1);
    }
}
