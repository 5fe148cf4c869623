//! AI usage accounting.

use crate::database::Database;
use crate::error::DbResult;
use rusqlite::params;
use slidebank_core::AiUsageRecord;

impl Database {
    pub fn log_ai_usage(&self, usage: &AiUsageRecord) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO ai_usage (provider, model, prompt_tokens, completion_tokens, total_tokens, cost, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                usage.provider,
                usage.model,
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens,
                usage.cost,
                usage.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Sum of recorded AI cost and tokens.
    pub fn total_ai_usage(&self) -> DbResult<(f64, i64)> {
        let conn = self.conn()?;
        let totals = conn.query_row(
            "SELECT COALESCE(SUM(cost), 0.0), COALESCE(SUM(total_tokens), 0) FROM ai_usage",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(totals)
    }
}
