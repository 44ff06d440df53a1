mod cursor_repo;
mod favorite_repo;
mod mealplan_repo;
mod recipe_repo;
mod shopping_repo;

pub use cursor_repo::CursorStore;
pub use favorite_repo::FavoriteRepository;
pub use mealplan_repo::MealPlanRepository;
pub use recipe_repo::RecipeRepository;
pub use shopping_repo::ShoppingRepository;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use uuid::Uuid;

use crate::models::SyncState;

/// Initialize the database connection pool and run migrations.
pub async fn init_db(path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

// Column decoding shared by the repositories. Rows are written by this
// process, so a parse failure means a corrupt database, not bad user input.

pub(crate) fn decode_uuid(value: &str) -> Result<Uuid, sqlx::Error> {
    Uuid::parse_str(value).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

pub(crate) fn decode_datetime(value: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

pub(crate) fn decode_date(value: &str) -> Result<NaiveDate, sqlx::Error> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

pub(crate) fn decode_state(code: i64) -> Result<SyncState, sqlx::Error> {
    SyncState::from_code(code).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_init_db_creates_tables() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let pool = init_db(&db_path).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert!(table_names.contains(&"recipes"));
        assert!(table_names.contains(&"favorites"));
        assert!(table_names.contains(&"meal_plans"));
        assert!(table_names.contains(&"shopping_items"));
        assert!(table_names.contains(&"sync_cursors"));
    }

    #[test]
    fn test_decode_datetime_rejects_garbage() {
        assert!(decode_datetime("not a date").is_err());
        assert!(decode_datetime("2025-06-02T10:00:00Z").is_ok());
    }
}
