use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{DeleteAction, MealPlanEntry, MealType, SyncState};

use super::{decode_date, decode_datetime, decode_state, decode_uuid};

pub struct MealPlanRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct MealPlanRow {
    id: String,
    user_id: String,
    date: String,
    meal_type: String,
    recipe_id: String,
    servings: Option<i32>,
    note: Option<String>,
    created_at: String,
    updated_at: String,
    sync_status: i64,
}

impl MealPlanRow {
    fn hydrate(self) -> Result<MealPlanEntry, sqlx::Error> {
        let meal_type: MealType = self
            .meal_type
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;

        Ok(MealPlanEntry {
            id: decode_uuid(&self.id)?,
            user_id: self.user_id,
            date: decode_date(&self.date)?,
            meal_type,
            recipe_id: decode_uuid(&self.recipe_id)?,
            servings: self.servings,
            note: self.note,
            created_at: decode_datetime(&self.created_at)?,
            updated_at: decode_datetime(&self.updated_at)?,
            sync_state: decode_state(self.sync_status)?,
        })
    }
}

impl MealPlanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Plan a recipe into a calendar slot.
    ///
    /// The slot (user, date, meal type) holds at most one visible entry. An
    /// occupied slot is edited in place (keeping its id so remote devices see
    /// an update, not a new entry); a tombstoned slot is revived the same way.
    pub async fn set_slot(&self, entry: MealPlanEntry) -> Result<MealPlanEntry, sqlx::Error> {
        match self
            .get_any_by_slot(&entry.user_id, entry.date, entry.meal_type)
            .await?
        {
            None => {
                self.insert(&entry).await?;
                Ok(entry)
            }
            Some(existing) => {
                let mut updated = entry;
                updated.id = existing.id;
                updated.created_at = existing.created_at;
                updated.sync_state = if existing.sync_state == SyncState::Tombstone {
                    // The remote document still exists; revive it with an update.
                    SyncState::PendingUpdate
                } else {
                    existing.sync_state.on_edit()
                };
                updated.updated_at = updated.updated_at.max(existing.updated_at);
                self.replace(&updated).await?;
                Ok(updated)
            }
        }
    }

    async fn insert(&self, entry: &MealPlanEntry) -> Result<(), sqlx::Error> {
        self.write(entry, false).await
    }

    async fn replace(&self, entry: &MealPlanEntry) -> Result<(), sqlx::Error> {
        self.write(entry, true).await
    }

    async fn write(&self, entry: &MealPlanEntry, replace: bool) -> Result<(), sqlx::Error> {
        let verb = if replace {
            "INSERT OR REPLACE INTO"
        } else {
            "INSERT INTO"
        };
        let sql = format!(
            r#"
            {verb} meal_plans
                (id, user_id, date, meal_type, recipe_id, servings, note,
                 created_at, updated_at, sync_status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        );

        sqlx::query(&sql)
            .bind(entry.id.to_string())
            .bind(&entry.user_id)
            .bind(entry.date.to_string())
            .bind(entry.meal_type.to_string())
            .bind(entry.recipe_id.to_string())
            .bind(entry.servings)
            .bind(&entry.note)
            .bind(entry.created_at.to_rfc3339())
            .bind(entry.updated_at.to_rfc3339())
            .bind(entry.sync_state.code())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Insert-or-replace from the pull phase, reconciling by slot: an entry
    /// for the same slot under a different id is superseded.
    pub async fn apply_remote(&self, entry: &MealPlanEntry) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM meal_plans WHERE user_id = ? AND date = ? AND meal_type = ? AND id != ?",
        )
        .bind(&entry.user_id)
        .bind(entry.date.to_string())
        .bind(entry.meal_type.to_string())
        .bind(entry.id.to_string())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO meal_plans
                (id, user_id, date, meal_type, recipe_id, servings, note,
                 created_at, updated_at, sync_status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(&entry.user_id)
        .bind(entry.date.to_string())
        .bind(entry.meal_type.to_string())
        .bind(entry.recipe_id.to_string())
        .bind(entry.servings)
        .bind(&entry.note)
        .bind(entry.created_at.to_rfc3339())
        .bind(entry.updated_at.to_rfc3339())
        .bind(entry.sync_state.code())
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<MealPlanEntry>, sqlx::Error> {
        let row: Option<MealPlanRow> =
            sqlx::query_as("SELECT * FROM meal_plans WHERE id = ? AND sync_status != 3")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        row.map(MealPlanRow::hydrate).transpose()
    }

    pub async fn get_by_slot(
        &self,
        user_id: &str,
        date: NaiveDate,
        meal_type: MealType,
    ) -> Result<Option<MealPlanEntry>, sqlx::Error> {
        let row: Option<MealPlanRow> = sqlx::query_as(
            "SELECT * FROM meal_plans WHERE user_id = ? AND date = ? AND meal_type = ? AND sync_status != 3",
        )
        .bind(user_id)
        .bind(date.to_string())
        .bind(meal_type.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(MealPlanRow::hydrate).transpose()
    }

    /// Slot lookup including tombstones. This is the natural-key lookup the
    /// sync conflict guard compares against.
    pub async fn get_any_by_slot(
        &self,
        user_id: &str,
        date: NaiveDate,
        meal_type: MealType,
    ) -> Result<Option<MealPlanEntry>, sqlx::Error> {
        let row: Option<MealPlanRow> = sqlx::query_as(
            "SELECT * FROM meal_plans WHERE user_id = ? AND date = ? AND meal_type = ?",
        )
        .bind(user_id)
        .bind(date.to_string())
        .bind(meal_type.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(MealPlanRow::hydrate).transpose()
    }

    pub async fn list_range(
        &self,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<MealPlanEntry>, sqlx::Error> {
        let rows: Vec<MealPlanRow> = sqlx::query_as(
            r#"
            SELECT * FROM meal_plans
            WHERE user_id = ? AND date >= ? AND date <= ? AND sync_status != 3
            ORDER BY date, meal_type
            "#,
        )
        .bind(user_id)
        .bind(from.to_string())
        .bind(to.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(MealPlanRow::hydrate).collect()
    }

    /// Soft-delete the visible entry in a slot through the state machine.
    pub async fn delete_slot(
        &self,
        user_id: &str,
        date: NaiveDate,
        meal_type: MealType,
    ) -> Result<Option<DeleteAction>, sqlx::Error> {
        let Some(entry) = self.get_by_slot(user_id, date, meal_type).await? else {
            return Ok(None);
        };
        let action = entry.sync_state.on_delete();
        match action {
            DeleteAction::Purge => self.hard_delete(entry.id).await?,
            DeleteAction::Tombstone => {
                sqlx::query("UPDATE meal_plans SET sync_status = ?, updated_at = ? WHERE id = ?")
                    .bind(SyncState::Tombstone.code())
                    .bind(Utc::now().to_rfc3339())
                    .bind(entry.id.to_string())
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(Some(action))
    }

    pub async fn pending(&self, user_id: &str) -> Result<Vec<MealPlanEntry>, sqlx::Error> {
        let rows: Vec<MealPlanRow> =
            sqlx::query_as("SELECT * FROM meal_plans WHERE user_id = ? AND sync_status != 0")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(MealPlanRow::hydrate).collect()
    }

    pub async fn mark_synced(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE meal_plans SET sync_status = 0 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn hard_delete(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM meal_plans WHERE id = ?")
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

    async fn setup() -> (MealPlanRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        (MealPlanRepository::new(pool), temp_dir)
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[tokio::test]
    async fn test_set_and_get_slot() {
        let (repo, _tmp) = setup().await;
        let entry = MealPlanEntry::new("user1", date(2), MealType::Dinner, Uuid::new_v4());
        repo.set_slot(entry.clone()).await.unwrap();

        let fetched = repo
            .get_by_slot("user1", date(2), MealType::Dinner)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.id, entry.id);
        assert_eq!(fetched.recipe_id, entry.recipe_id);
    }

    #[tokio::test]
    async fn test_set_occupied_slot_keeps_id() {
        let (repo, _tmp) = setup().await;
        let first = MealPlanEntry::new("user1", date(2), MealType::Dinner, Uuid::new_v4());
        repo.set_slot(first.clone()).await.unwrap();

        let new_recipe = Uuid::new_v4();
        let second = MealPlanEntry::new("user1", date(2), MealType::Dinner, new_recipe);
        let stored = repo.set_slot(second).await.unwrap();

        assert_eq!(stored.id, first.id);
        assert_eq!(stored.recipe_id, new_recipe);

        let all = repo.list_range("user1", date(1), date(7)).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_set_tombstoned_slot_revives_as_update() {
        let (repo, _tmp) = setup().await;
        let mut first = MealPlanEntry::new("user1", date(2), MealType::Lunch, Uuid::new_v4());
        first.sync_state = SyncState::Synced;
        repo.set_slot(first.clone()).await.unwrap();
        repo.delete_slot("user1", date(2), MealType::Lunch)
            .await
            .unwrap();

        let revived = repo
            .set_slot(MealPlanEntry::new(
                "user1",
                date(2),
                MealType::Lunch,
                Uuid::new_v4(),
            ))
            .await
            .unwrap();
        assert_eq!(revived.id, first.id);
        assert_eq!(revived.sync_state, SyncState::PendingUpdate);
    }

    #[tokio::test]
    async fn test_list_range() {
        let (repo, _tmp) = setup().await;
        for day in [1, 3, 9] {
            repo.set_slot(MealPlanEntry::new(
                "user1",
                date(day),
                MealType::Dinner,
                Uuid::new_v4(),
            ))
            .await
            .unwrap();
        }

        let week = repo.list_range("user1", date(1), date(7)).await.unwrap();
        assert_eq!(week.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_slot_state_machine() {
        let (repo, _tmp) = setup().await;

        // Never uploaded: purged
        let draft = MealPlanEntry::new("user1", date(2), MealType::Snack, Uuid::new_v4());
        repo.set_slot(draft.clone()).await.unwrap();
        assert_eq!(
            repo.delete_slot("user1", date(2), MealType::Snack)
                .await
                .unwrap(),
            Some(DeleteAction::Purge)
        );
        assert!(repo.get(draft.id).await.unwrap().is_none());

        // Synced: tombstoned and pending
        let mut kept = MealPlanEntry::new("user1", date(2), MealType::Dinner, Uuid::new_v4());
        kept.sync_state = SyncState::Synced;
        repo.set_slot(kept.clone()).await.unwrap();
        assert_eq!(
            repo.delete_slot("user1", date(2), MealType::Dinner)
                .await
                .unwrap(),
            Some(DeleteAction::Tombstone)
        );
        assert_eq!(repo.pending("user1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_apply_remote_supersedes_slot_under_other_id() {
        let (repo, _tmp) = setup().await;
        let mut local = MealPlanEntry::new("user1", date(2), MealType::Dinner, Uuid::new_v4());
        local.sync_state = SyncState::Synced;
        repo.set_slot(local.clone()).await.unwrap();

        let mut incoming = MealPlanEntry::new("user1", date(2), MealType::Dinner, Uuid::new_v4());
        incoming.sync_state = SyncState::Synced;
        repo.apply_remote(&incoming).await.unwrap();

        let entries = repo.list_range("user1", date(1), date(7)).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, incoming.id);
        assert!(repo.get(local.id).await.unwrap().is_none());
    }
}
