//! Meal plan worker.
//!
//! Meal plan entries reconcile by their calendar slot (user, date, meal type)
//! rather than by id: two devices planning the same slot independently create
//! different ids, and the slot lookup is what the conflict guard compares.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{CursorStore, MealPlanRepository};
use crate::models::{MealPlanEntry, SyncState};
use crate::remote::{DocumentError, RemoteDocument, RemoteStore};

use super::engine::{reconcile, PullPartition, SyncOutcome, SyncPlan, SyncRecord, SyncStore};
use super::SyncError;

fn collection(user_id: &str) -> String {
    format!("users/{}/meal_plans", user_id)
}

pub struct MealPlanSync;

impl MealPlanSync {
    pub fn plan(user_id: &str) -> SyncPlan {
        SyncPlan {
            upload_collection: collection(user_id),
            pulls: vec![PullPartition {
                collection: collection(user_id),
                cursor_key: format!("pull.meal_plans.{}", user_id),
            }],
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
        let repo = MealPlanRepository::new(pool.clone());
        let cursors = CursorStore::new(pool.clone());
        reconcile(&repo, &cursors, remote, user_id, &Self::plan(user_id)).await
    }
}

impl SyncRecord for MealPlanEntry {
    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> &str {
        &self.user_id
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
            self.user_id.clone(),
            self.created_at,
            self.updated_at,
            self.sync_state == SyncState::Tombstone,
        )
        .with_field("date", self.date.to_string())
        .with_field("meal_type", self.meal_type.to_string())
        .with_field("recipe_id", self.recipe_id.to_string())
        .with_field("servings", serde_json::to_value(self.servings)?)
        .with_field("note", serde_json::to_value(&self.note)?))
    }

    fn from_document(document: &RemoteDocument) -> Result<Self, DocumentError> {
        let date = document
            .require_str("date")?
            .parse()
            .map_err(|_| DocumentError::MalformedField {
                id: document.id.clone(),
                field: "date",
            })?;
        let meal_type = document
            .require_str("meal_type")?
            .parse()
            .map_err(|_| DocumentError::MalformedField {
                id: document.id.clone(),
                field: "meal_type",
            })?;

        Ok(MealPlanEntry {
            id: document.record_id()?,
            user_id: document.owner_id.clone(),
            date,
            meal_type,
            recipe_id: document.require_uuid("recipe_id")?,
            servings: document.i64_field("servings").map(|v| v as i32),
            note: document.str_field("note").map(str::to_string),
            created_at: document.created(),
            updated_at: document.updated(),
            sync_state: SyncState::Synced,
        })
    }
}

#[async_trait]
impl SyncStore<MealPlanEntry> for MealPlanRepository {
    async fn pending(&self, user_id: &str) -> Result<Vec<MealPlanEntry>, sqlx::Error> {
        MealPlanRepository::pending(self, user_id).await
    }

    /// Natural-key lookup: the slot, not the id.
    async fn find_local(
        &self,
        incoming: &MealPlanEntry,
    ) -> Result<Option<MealPlanEntry>, sqlx::Error> {
        self.get_any_by_slot(&incoming.user_id, incoming.date, incoming.meal_type)
            .await
    }

    async fn apply_remote(&self, record: &MealPlanEntry) -> Result<(), sqlx::Error> {
        MealPlanRepository::apply_remote(self, record).await
    }

    async fn mark_synced(&self, id: Uuid) -> Result<(), sqlx::Error> {
        MealPlanRepository::mark_synced(self, id).await
    }

    async fn hard_delete(&self, id: Uuid) -> Result<(), sqlx::Error> {
        MealPlanRepository::hard_delete(self, id).await
    }
}
