//! Durable pull cursors, one per (entity type, partition).
//!
//! A cursor is the maximum remote `updated_at` (epoch milliseconds) observed
//! in the last successful pull; the next pull only asks for documents strictly
//! newer. Zero means "never pulled".

use sqlx::SqlitePool;

pub struct CursorStore {
    pool: SqlitePool,
}

impl CursorStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, name: &str) -> Result<i64, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT value FROM sync_cursors WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.0).unwrap_or(0))
    }

    /// Advance the cursor, never moving it backwards.
    pub async fn advance(&self, name: &str, value: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO sync_cursors (name, value) VALUES (?, ?)
            ON CONFLICT(name) DO UPDATE SET value = MAX(sync_cursors.value, excluded.value)
            "#,
        )
        .bind(name)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
