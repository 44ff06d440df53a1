//! Recipe worker: two pull partitions (own and public), plus the public
//! mirror on upload.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{CursorStore, RecipeRepository};
use crate::models::{Recipe, SyncState};
use crate::remote::{DocumentError, RemoteDocument, RemoteStore};

use super::engine::{reconcile, PullPartition, SyncOutcome, SyncPlan, SyncRecord, SyncStore};
use super::SyncError;

/// Shared partition every public recipe is mirrored into.
pub const PUBLIC_COLLECTION: &str = "recipes/public";

fn own_collection(user_id: &str) -> String {
    format!("users/{}/recipes", user_id)
}

pub struct RecipeSync;

impl RecipeSync {
    /// Own records and public records live in separate partitions with
    /// independent cursors.
    pub fn plan(user_id: &str) -> SyncPlan {
        SyncPlan {
            upload_collection: own_collection(user_id),
            pulls: vec![
                PullPartition {
                    collection: own_collection(user_id),
                    cursor_key: format!("pull.recipes.own.{}", user_id),
                },
                PullPartition {
                    collection: PUBLIC_COLLECTION.to_string(),
                    cursor_key: "pull.recipes.public".to_string(),
                },
            ],
        }
    }

    pub async fn run<R>(
        pool: &SqlitePool,
        remote: &R,
        user_id: &str,
    ) -> Result<SyncOutcome, SyncError>
    where
        R: RemoteStore + ?Sized,
    {
        let repo = RecipeRepository::new(pool.clone());
        let cursors = CursorStore::new(pool.clone());
        reconcile(&repo, &cursors, remote, user_id, &Self::plan(user_id)).await
    }
}

impl SyncRecord for Recipe {
    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    fn updated_at_ms(&self) -> i64 {
        self.updated_at.timestamp_millis()
    }

    fn to_document(&self) -> Result<RemoteDocument, serde_json::Error> {
        Ok(RemoteDocument::new(
            self.id,
            self.owner_id.clone(),
            self.created_at,
            self.updated_at,
            self.sync_state == SyncState::Tombstone,
        )
        .with_field("title", self.title.clone())
        .with_field("description", self.description.clone())
        .with_field("ingredients", serde_json::to_value(&self.ingredients)?)
        .with_field("instructions", self.instructions.clone())
        .with_field("prep_time", serde_json::to_value(self.prep_time)?)
        .with_field("cook_time", serde_json::to_value(self.cook_time)?)
        .with_field("servings", serde_json::to_value(self.servings)?)
        .with_field("tags", serde_json::to_value(&self.tags)?)
        .with_field("is_public", self.is_public))
    }

    fn from_document(document: &RemoteDocument) -> Result<Self, DocumentError> {
        Ok(Recipe {
            id: document.record_id()?,
            owner_id: document.owner_id.clone(),
            title: document.require_str("title")?.to_string(),
            description: document.str_field("description").unwrap_or_default().to_string(),
            ingredients: document.decode_field("ingredients")?.unwrap_or_default(),
            instructions: document
                .str_field("instructions")
                .unwrap_or_default()
                .to_string(),
            prep_time: document.i64_field("prep_time").map(|v| v as i32),
            cook_time: document.i64_field("cook_time").map(|v| v as i32),
            servings: document.i64_field("servings").map(|v| v as i32),
            tags: document.decode_field("tags")?.unwrap_or_default(),
            is_public: document.bool_field("is_public").unwrap_or(false),
            created_at: document.created(),
            updated_at: document.updated(),
            sync_state: SyncState::Synced,
        })
    }

    fn mirror_collections(&self) -> Vec<String> {
        if self.is_public {
            vec![PUBLIC_COLLECTION.to_string()]
        } else {
            Vec::new()
        }
    }
}

#[async_trait]
impl SyncStore<Recipe> for RecipeRepository {
    async fn pending(&self, user_id: &str) -> Result<Vec<Recipe>, sqlx::Error> {
        RecipeRepository::pending(self, user_id).await
    }

    async fn find_local(&self, incoming: &Recipe) -> Result<Option<Recipe>, sqlx::Error> {
        self.get_any(incoming.id).await
    }

    async fn apply_remote(&self, record: &Recipe) -> Result<(), sqlx::Error> {
        RecipeRepository::apply_remote(self, record).await
    }

    async fn mark_synced(&self, id: Uuid) -> Result<(), sqlx::Error> {
        RecipeRepository::mark_synced(self, id).await
    }

    async fn hard_delete(&self, id: Uuid) -> Result<(), sqlx::Error> {
        RecipeRepository::hard_delete(self, id).await
    }
}
