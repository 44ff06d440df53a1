use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{DeleteAction, ShoppingItem, SyncState};

use super::{decode_date, decode_datetime, decode_state, decode_uuid};

pub struct ShoppingRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ShoppingItemRow {
    id: String,
    user_id: String,
    week_start: String,
    name: String,
    quantity: f64,
    unit: String,
    checked: i64,
    is_manual: i64,
    created_at: String,
    updated_at: String,
    sync_status: i64,
}

impl ShoppingItemRow {
    fn hydrate(self) -> Result<ShoppingItem, sqlx::Error> {
        Ok(ShoppingItem {
            id: decode_uuid(&self.id)?,
            user_id: self.user_id,
            week_start: decode_date(&self.week_start)?,
            name: self.name,
            quantity: self.quantity,
            unit: self.unit,
            checked: self.checked != 0,
            is_manual: self.is_manual != 0,
            created_at: decode_datetime(&self.created_at)?,
            updated_at: decode_datetime(&self.updated_at)?,
            sync_state: decode_state(self.sync_status)?,
        })
    }
}

impl ShoppingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, item: &ShoppingItem) -> Result<(), sqlx::Error> {
        self.write(item, false).await
    }

    /// Insert-or-replace by id, used by the pull phase.
    pub async fn apply_remote(&self, item: &ShoppingItem) -> Result<(), sqlx::Error> {
        self.write(item, true).await
    }

    async fn write(&self, item: &ShoppingItem, replace: bool) -> Result<(), sqlx::Error> {
        let verb = if replace {
            "INSERT OR REPLACE INTO"
        } else {
            "INSERT INTO"
        };
        let sql = format!(
            r#"
            {verb} shopping_items
                (id, user_id, week_start, name, quantity, unit, checked,
                 is_manual, created_at, updated_at, sync_status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        );

        sqlx::query(&sql)
            .bind(item.id.to_string())
            .bind(&item.user_id)
            .bind(item.week_start.to_string())
            .bind(&item.name)
            .bind(item.quantity)
            .bind(&item.unit)
            .bind(item.checked as i64)
            .bind(item.is_manual as i64)
            .bind(item.created_at.to_rfc3339())
            .bind(item.updated_at.to_rfc3339())
            .bind(item.sync_state.code())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_any(&self, id: Uuid) -> Result<Option<ShoppingItem>, sqlx::Error> {
        let row: Option<ShoppingItemRow> =
            sqlx::query_as("SELECT * FROM shopping_items WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        row.map(ShoppingItemRow::hydrate).transpose()
    }

    pub async fn list_week(
        &self,
        user_id: &str,
        week_start: NaiveDate,
    ) -> Result<Vec<ShoppingItem>, sqlx::Error> {
        let rows: Vec<ShoppingItemRow> = sqlx::query_as(
            r#"
            SELECT * FROM shopping_items
            WHERE user_id = ? AND week_start = ? AND sync_status != 3
            ORDER BY is_manual, name
            "#,
        )
        .bind(user_id)
        .bind(week_start.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ShoppingItemRow::hydrate).collect()
    }

    /// Find a visible item by name within a week (case-insensitive).
    pub async fn find_by_name(
        &self,
        user_id: &str,
        week_start: NaiveDate,
        name: &str,
    ) -> Result<Option<ShoppingItem>, sqlx::Error> {
        let row: Option<ShoppingItemRow> = sqlx::query_as(
            r#"
            SELECT * FROM shopping_items
            WHERE user_id = ? AND week_start = ? AND name = ? COLLATE NOCASE
              AND sync_status != 3
            "#,
        )
        .bind(user_id)
        .bind(week_start.to_string())
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ShoppingItemRow::hydrate).transpose()
    }

    pub async fn update(&self, item: &ShoppingItem) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE shopping_items
            SET name = ?, quantity = ?, unit = ?, checked = ?,
                updated_at = ?, sync_status = ?
            WHERE id = ?
            "#,
        )
        .bind(&item.name)
        .bind(item.quantity)
        .bind(&item.unit)
        .bind(item.checked as i64)
        .bind(item.updated_at.to_rfc3339())
        .bind(item.sync_state.code())
        .bind(item.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Soft-delete through the replication state machine.
    pub async fn delete(&self, id: Uuid) -> Result<Option<DeleteAction>, sqlx::Error> {
        let Some(item) = self.get_any(id).await? else {
            return Ok(None);
        };
        let action = item.sync_state.on_delete();
        match action {
            DeleteAction::Purge => self.hard_delete(id).await?,
            DeleteAction::Tombstone => {
                sqlx::query(
                    "UPDATE shopping_items SET sync_status = ?, updated_at = ? WHERE id = ?",
                )
                .bind(SyncState::Tombstone.code())
                .bind(Utc::now().to_rfc3339())
                .bind(id.to_string())
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(Some(action))
    }

    /// Delete every generated (non-manual) item for a week, e.g. before
    /// regenerating the list from the current meal plans.
    pub async fn delete_generated(
        &self,
        user_id: &str,
        week_start: NaiveDate,
    ) -> Result<usize, sqlx::Error> {
        let items = self.list_week(user_id, week_start).await?;
        let mut removed = 0;
        for item in items.iter().filter(|i| !i.is_manual) {
            self.delete(item.id).await?;
            removed += 1;
        }
        Ok(removed)
    }

    pub async fn pending(&self, user_id: &str) -> Result<Vec<ShoppingItem>, sqlx::Error> {
        let rows: Vec<ShoppingItemRow> =
            sqlx::query_as("SELECT * FROM shopping_items WHERE user_id = ? AND sync_status != 0")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(ShoppingItemRow::hydrate).collect()
    }

    pub async fn mark_synced(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE shopping_items SET sync_status = 0 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn hard_delete(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM shopping_items WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::TempDir;

    async fn setup() -> (ShoppingRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        (ShoppingRepository::new(pool), temp_dir)
    }

    fn week() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_list_week() {
        let (repo, _tmp) = setup().await;
        repo.create(&ShoppingItem::new("user1", week(), "milk"))
            .await
            .unwrap();
        repo.create(&ShoppingItem::manual("user1", week(), "Soap", 2.0, "bars"))
            .await
            .unwrap();
        // Another week, not listed
        repo.create(&ShoppingItem::new(
            "user1",
            week() + chrono::Duration::days(7),
            "bread",
        ))
        .await
        .unwrap();

        let items = repo.list_week("user1", week()).await.unwrap();
        assert_eq!(items.len(), 2);
        // Generated items sort before manual ones
        assert!(!items[0].is_manual);
        assert!(items[1].is_manual);
    }

    #[tokio::test]
    async fn test_find_by_name_is_case_insensitive() {
        let (repo, _tmp) = setup().await;
        repo.create(&ShoppingItem::new("user1", week(), "Milk"))
            .await
            .unwrap();

        assert!(repo
            .find_by_name("user1", week(), "milk")
            .await
            .unwrap()
            .is_some());
        assert!(repo
            .find_by_name("user1", week(), "butter")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_check_updates_row() {
        let (repo, _tmp) = setup().await;
        let mut item = ShoppingItem::new("user1", week(), "milk");
        item.sync_state = SyncState::Synced;
        repo.create(&item).await.unwrap();

        item.set_checked(true);
        repo.update(&item).await.unwrap();

        let fetched = repo.get_any(item.id).await.unwrap().unwrap();
        assert!(fetched.checked);
        assert_eq!(fetched.sync_state, SyncState::PendingUpdate);
    }

    #[tokio::test]
    async fn test_delete_generated_spares_manual_items() {
        let (repo, _tmp) = setup().await;
        repo.create(&ShoppingItem::new("user1", week(), "flour"))
            .await
            .unwrap();
        repo.create(&ShoppingItem::new("user1", week(), "eggs"))
            .await
            .unwrap();
        repo.create(&ShoppingItem::manual("user1", week(), "Soap", 1.0, ""))
            .await
            .unwrap();

        let removed = repo.delete_generated("user1", week()).await.unwrap();
        assert_eq!(removed, 2);

        let left = repo.list_week("user1", week()).await.unwrap();
        assert_eq!(left.len(), 1);
        assert!(left[0].is_manual);
    }

    #[tokio::test]
    async fn test_delete_synced_item_tombstones() {
        let (repo, _tmp) = setup().await;
        let mut item = ShoppingItem::new("user1", week(), "milk");
        item.sync_state = SyncState::Synced;
        repo.create(&item).await.unwrap();

        assert_eq!(
            repo.delete(item.id).await.unwrap(),
            Some(DeleteAction::Tombstone)
        );
        assert!(repo.list_week("user1", week()).await.unwrap().is_empty());
        assert_eq!(repo.pending("user1").await.unwrap().len(), 1);
    }
}
