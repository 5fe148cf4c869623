//! Database migrations and schema management.

use crate::error::{DbError, DbResult};
use rusqlite::Connection;
use tracing::info;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> DbResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating initial database schema...");
        create_initial_schema(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current_version, SCHEMA_VERSION
        )));
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> DbResult<()> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

fn create_initial_schema(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- One row per logical presentation (content-deduplicated)
        CREATE TABLE IF NOT EXISTS presentations (
            id TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            canonical_path TEXT NOT NULL,
            checksum TEXT NOT NULL,
            is_template INTEGER NOT NULL DEFAULT 0,
            tags TEXT NOT NULL DEFAULT '[]',
            ai_summary TEXT,
            title TEXT,
            metadata TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_presentations_checksum ON presentations(checksum);
        CREATE INDEX IF NOT EXISTS idx_presentations_identity ON presentations(filename, canonical_path);
        CREATE INDEX IF NOT EXISTS idx_presentations_created ON presentations(created_at);

        CREATE TABLE IF NOT EXISTS slides (
            id TEXT PRIMARY KEY,
            presentation_id TEXT NOT NULL REFERENCES presentations(id) ON DELETE CASCADE,
            slide_number INTEGER NOT NULL,
            thumbnail_path TEXT,
            content TEXT NOT NULL DEFAULT '',
            layout TEXT NOT NULL DEFAULT '{}',
            ai_summary TEXT,
            title TEXT NOT NULL,
            comments TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            UNIQUE (presentation_id, slide_number)
        );

        CREATE INDEX IF NOT EXISTS idx_slides_presentation ON slides(presentation_id);

        -- Runtime switches
        CREATE TABLE IF NOT EXISTS feature_flags (
            name TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- AI token accounting
        CREATE TABLE IF NOT EXISTS ai_usage (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            provider TEXT NOT NULL,
            model TEXT NOT NULL,
            prompt_tokens INTEGER NOT NULL,
            completion_tokens INTEGER NOT NULL,
            total_tokens INTEGER NOT NULL,
            cost REAL NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_ai_usage_created ON ai_usage(created_at);
        "#,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_version_set() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        // Idempotent on an initialized database.
        initialize_schema(&conn).unwrap();
    }

    #[test]
    fn test_newer_schema_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        set_schema_version(&conn, SCHEMA_VERSION + 1).unwrap();
        assert!(matches!(
            initialize_schema(&conn),
            Err(DbError::Migration(_))
        ));
    }
}
