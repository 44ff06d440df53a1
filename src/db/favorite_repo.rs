use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{DeleteAction, Favorite, SyncState};

use super::{decode_datetime, decode_state, decode_uuid};

pub struct FavoriteRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct FavoriteRow {
    id: String,
    user_id: String,
    recipe_id: String,
    created_at: String,
    updated_at: String,
    sync_status: i64,
}

impl FavoriteRow {
    fn hydrate(self) -> Result<Favorite, sqlx::Error> {
        Ok(Favorite {
            id: decode_uuid(&self.id)?,
            user_id: self.user_id,
            recipe_id: decode_uuid(&self.recipe_id)?,
            created_at: decode_datetime(&self.created_at)?,
            updated_at: decode_datetime(&self.updated_at)?,
            sync_state: decode_state(self.sync_status)?,
        })
    }
}

impl FavoriteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, favorite: &Favorite) -> Result<(), sqlx::Error> {
        self.write(favorite, false).await
    }

    /// Insert-or-replace by id. The unique (user, recipe) index also replaces
    /// a favorite that arrived from another device under a different id.
    pub async fn apply_remote(&self, favorite: &Favorite) -> Result<(), sqlx::Error> {
        self.write(favorite, true).await
    }

    async fn write(&self, favorite: &Favorite, replace: bool) -> Result<(), sqlx::Error> {
        let verb = if replace {
            "INSERT OR REPLACE INTO"
        } else {
            "INSERT INTO"
        };
        let sql = format!(
            r#"
            {verb} favorites (id, user_id, recipe_id, created_at, updated_at, sync_status)
            VALUES (?, ?, ?, ?, ?, ?)
            "#
        );

        sqlx::query(&sql)
            .bind(favorite.id.to_string())
            .bind(&favorite.user_id)
            .bind(favorite.recipe_id.to_string())
            .bind(favorite.created_at.to_rfc3339())
            .bind(favorite.updated_at.to_rfc3339())
            .bind(favorite.sync_state.code())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_any(&self, id: Uuid) -> Result<Option<Favorite>, sqlx::Error> {
        let row: Option<FavoriteRow> = sqlx::query_as("SELECT * FROM favorites WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(FavoriteRow::hydrate).transpose()
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<Favorite>, sqlx::Error> {
        let rows: Vec<FavoriteRow> = sqlx::query_as(
            "SELECT * FROM favorites WHERE user_id = ? AND sync_status != 3 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(FavoriteRow::hydrate).collect()
    }

    /// Find the visible favorite for a (user, recipe), if any.
    pub async fn find(&self, user_id: &str, recipe_id: Uuid) -> Result<Option<Favorite>, sqlx::Error> {
        let row: Option<FavoriteRow> = sqlx::query_as(
            "SELECT * FROM favorites WHERE user_id = ? AND recipe_id = ? AND sync_status != 3",
        )
        .bind(user_id)
        .bind(recipe_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(FavoriteRow::hydrate).transpose()
    }

    /// Lookup including tombstones, for revival on re-favorite.
    async fn find_any(&self, user_id: &str, recipe_id: Uuid) -> Result<Option<Favorite>, sqlx::Error> {
        let row: Option<FavoriteRow> =
            sqlx::query_as("SELECT * FROM favorites WHERE user_id = ? AND recipe_id = ?")
                .bind(user_id)
                .bind(recipe_id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        row.map(FavoriteRow::hydrate).transpose()
    }

    /// Mark a recipe as a favorite. A tombstone still awaiting upload for the
    /// same pair is revived in place (the remote document already exists, so
    /// it gets an update rather than a competing row).
    pub async fn add(&self, user_id: &str, recipe_id: Uuid) -> Result<Favorite, sqlx::Error> {
        match self.find_any(user_id, recipe_id).await? {
            Some(mut existing) => {
                if existing.sync_state == SyncState::Tombstone {
                    existing.sync_state = SyncState::PendingUpdate;
                    existing.updated_at = existing.updated_at.max(Utc::now());
                    self.write(&existing, true).await?;
                }
                Ok(existing)
            }
            None => {
                let favorite = Favorite::new(user_id, recipe_id);
                self.create(&favorite).await?;
                Ok(favorite)
            }
        }
    }

    /// Soft-delete through the replication state machine.
    pub async fn delete(&self, id: Uuid) -> Result<Option<DeleteAction>, sqlx::Error> {
        let Some(favorite) = self.get_any(id).await? else {
            return Ok(None);
        };
        let action = favorite.sync_state.on_delete();
        match action {
            DeleteAction::Purge => self.hard_delete(id).await?,
            DeleteAction::Tombstone => {
                sqlx::query("UPDATE favorites SET sync_status = ?, updated_at = ? WHERE id = ?")
                    .bind(SyncState::Tombstone.code())
                    .bind(Utc::now().to_rfc3339())
                    .bind(id.to_string())
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(Some(action))
    }

    pub async fn pending(&self, user_id: &str) -> Result<Vec<Favorite>, sqlx::Error> {
        let rows: Vec<FavoriteRow> =
            sqlx::query_as("SELECT * FROM favorites WHERE user_id = ? AND sync_status != 0")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(FavoriteRow::hydrate).collect()
    }

    pub async fn mark_synced(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE favorites SET sync_status = 0 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn hard_delete(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM favorites WHERE id = ?")
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

    async fn setup() -> (FavoriteRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        (FavoriteRepository::new(pool), temp_dir)
    }

    #[tokio::test]
    async fn test_create_find_and_list() {
        let (repo, _tmp) = setup().await;
        let recipe_id = Uuid::new_v4();
        let favorite = Favorite::new("user1", recipe_id);
        repo.create(&favorite).await.unwrap();

        assert!(repo.find("user1", recipe_id).await.unwrap().is_some());
        assert!(repo.find("user2", recipe_id).await.unwrap().is_none());
        assert_eq!(repo.list("user1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_synced_favorite_tombstones() {
        let (repo, _tmp) = setup().await;
        let mut favorite = Favorite::new("user1", Uuid::new_v4());
        favorite.sync_state = SyncState::Synced;
        repo.create(&favorite).await.unwrap();

        let action = repo.delete(favorite.id).await.unwrap();
        assert_eq!(action, Some(DeleteAction::Tombstone));
        assert!(repo.find("user1", favorite.recipe_id).await.unwrap().is_none());
        assert_eq!(repo.pending("user1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_revives_pending_tombstone() {
        let (repo, _tmp) = setup().await;
        let recipe_id = Uuid::new_v4();

        let mut favorite = Favorite::new("user1", recipe_id);
        favorite.sync_state = SyncState::Synced;
        repo.create(&favorite).await.unwrap();
        repo.delete(favorite.id).await.unwrap();

        // Re-favoriting while the tombstone is still pending upload must not
        // collide with the unique (user, recipe) index
        let revived = repo.add("user1", recipe_id).await.unwrap();
        assert_eq!(revived.id, favorite.id);
        assert_eq!(revived.sync_state, SyncState::PendingUpdate);
        assert!(repo.find("user1", recipe_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_add_is_idempotent_for_visible_favorite() {
        let (repo, _tmp) = setup().await;
        let recipe_id = Uuid::new_v4();

        let first = repo.add("user1", recipe_id).await.unwrap();
        let second = repo.add("user1", recipe_id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(repo.list("user1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_apply_remote_replaces_same_user_recipe_pair() {
        let (repo, _tmp) = setup().await;
        let recipe_id = Uuid::new_v4();
        let mut local = Favorite::new("user1", recipe_id);
        local.sync_state = SyncState::Synced;
        repo.create(&local).await.unwrap();

        // Same pair under a different id, e.g. favorited on another device
        let mut incoming = Favorite::new("user1", recipe_id);
        incoming.sync_state = SyncState::Synced;
        repo.apply_remote(&incoming).await.unwrap();

        let visible = repo.list("user1").await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, incoming.id);
    }
}
