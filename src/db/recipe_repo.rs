use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{DeleteAction, Ingredient, Recipe, SyncState};

use super::{decode_datetime, decode_state, decode_uuid};

pub struct RecipeRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct RecipeRow {
    id: String,
    owner_id: String,
    title: String,
    description: String,
    ingredients: String,
    instructions: String,
    prep_time: Option<i32>,
    cook_time: Option<i32>,
    servings: Option<i32>,
    tags: String,
    is_public: i64,
    created_at: String,
    updated_at: String,
    sync_status: i64,
}

impl RecipeRow {
    fn hydrate(self) -> Result<Recipe, sqlx::Error> {
        let ingredients: Vec<Ingredient> =
            serde_json::from_str(&self.ingredients).unwrap_or_default();
        let tags: Vec<String> = serde_json::from_str(&self.tags).unwrap_or_default();

        Ok(Recipe {
            id: decode_uuid(&self.id)?,
            owner_id: self.owner_id,
            title: self.title,
            description: self.description,
            ingredients,
            instructions: self.instructions,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            servings: self.servings,
            tags,
            is_public: self.is_public != 0,
            created_at: decode_datetime(&self.created_at)?,
            updated_at: decode_datetime(&self.updated_at)?,
            sync_state: decode_state(self.sync_status)?,
        })
    }
}

impl RecipeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, recipe: &Recipe) -> Result<(), sqlx::Error> {
        self.write(recipe, false).await
    }

    /// Insert-or-replace by id, used both by edits and by the pull phase.
    pub async fn apply_remote(&self, recipe: &Recipe) -> Result<(), sqlx::Error> {
        self.write(recipe, true).await
    }

    async fn write(&self, recipe: &Recipe, replace: bool) -> Result<(), sqlx::Error> {
        let verb = if replace {
            "INSERT OR REPLACE INTO"
        } else {
            "INSERT INTO"
        };
        let sql = format!(
            r#"
            {verb} recipes
                (id, owner_id, title, description, ingredients, instructions,
                 prep_time, cook_time, servings, tags, is_public,
                 created_at, updated_at, sync_status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        );

        let ingredients = serde_json::to_string(&recipe.ingredients)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let tags =
            serde_json::to_string(&recipe.tags).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        sqlx::query(&sql)
            .bind(recipe.id.to_string())
            .bind(&recipe.owner_id)
            .bind(&recipe.title)
            .bind(&recipe.description)
            .bind(&ingredients)
            .bind(&recipe.instructions)
            .bind(recipe.prep_time)
            .bind(recipe.cook_time)
            .bind(recipe.servings)
            .bind(&tags)
            .bind(recipe.is_public as i64)
            .bind(recipe.created_at.to_rfc3339())
            .bind(recipe.updated_at.to_rfc3339())
            .bind(recipe.sync_state.code())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Get a recipe, hiding tombstones.
    pub async fn get(&self, id: Uuid) -> Result<Option<Recipe>, sqlx::Error> {
        let row: Option<RecipeRow> =
            sqlx::query_as("SELECT * FROM recipes WHERE id = ? AND sync_status != 3")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        row.map(RecipeRow::hydrate).transpose()
    }

    /// Get a recipe including tombstones. Used by the sync conflict guard.
    pub async fn get_any(&self, id: Uuid) -> Result<Option<Recipe>, sqlx::Error> {
        let row: Option<RecipeRow> = sqlx::query_as("SELECT * FROM recipes WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(RecipeRow::hydrate).transpose()
    }

    pub async fn list(&self, owner_id: &str) -> Result<Vec<Recipe>, sqlx::Error> {
        let rows: Vec<RecipeRow> = sqlx::query_as(
            "SELECT * FROM recipes WHERE owner_id = ? AND sync_status != 3 ORDER BY title",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RecipeRow::hydrate).collect()
    }

    pub async fn list_public(&self) -> Result<Vec<Recipe>, sqlx::Error> {
        let rows: Vec<RecipeRow> = sqlx::query_as(
            "SELECT * FROM recipes WHERE is_public = 1 AND sync_status != 3 ORDER BY title",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RecipeRow::hydrate).collect()
    }

    pub async fn update(&self, recipe: &Recipe) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE recipes
            SET title = ?, description = ?, ingredients = ?, instructions = ?,
                prep_time = ?, cook_time = ?, servings = ?, tags = ?,
                is_public = ?, updated_at = ?, sync_status = ?
            WHERE id = ?
            "#,
        )
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(
            serde_json::to_string(&recipe.ingredients)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        )
        .bind(&recipe.instructions)
        .bind(recipe.prep_time)
        .bind(recipe.cook_time)
        .bind(recipe.servings)
        .bind(serde_json::to_string(&recipe.tags).map_err(|e| sqlx::Error::Decode(Box::new(e)))?)
        .bind(recipe.is_public as i64)
        .bind(recipe.updated_at.to_rfc3339())
        .bind(recipe.sync_state.code())
        .bind(recipe.id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Soft-delete through the replication state machine. Never-uploaded
    /// records are purged outright; everything else becomes a tombstone that
    /// the next upload turns into a remote `isDeleted` marker.
    pub async fn delete(&self, id: Uuid) -> Result<Option<DeleteAction>, sqlx::Error> {
        let Some(recipe) = self.get_any(id).await? else {
            return Ok(None);
        };
        let action = recipe.sync_state.on_delete();
        match action {
            DeleteAction::Purge => self.hard_delete(id).await?,
            DeleteAction::Tombstone => {
                sqlx::query("UPDATE recipes SET sync_status = ?, updated_at = ? WHERE id = ?")
                    .bind(SyncState::Tombstone.code())
                    .bind(Utc::now().to_rfc3339())
                    .bind(id.to_string())
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(Some(action))
    }

    pub async fn pending(&self, owner_id: &str) -> Result<Vec<Recipe>, sqlx::Error> {
        let rows: Vec<RecipeRow> =
            sqlx::query_as("SELECT * FROM recipes WHERE owner_id = ? AND sync_status != 0")
                .bind(owner_id)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(RecipeRow::hydrate).collect()
    }

    pub async fn mark_synced(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE recipes SET sync_status = 0 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn hard_delete(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
