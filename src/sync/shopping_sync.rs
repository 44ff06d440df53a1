//! Shopping list worker.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{CursorStore, ShoppingRepository};
use crate::models::{ShoppingItem, SyncState};
use crate::remote::{DocumentError, RemoteDocument, RemoteStore};

use super::engine::{reconcile, PullPartition, SyncOutcome, SyncPlan, SyncRecord, SyncStore};
use super::SyncError;

fn collection(user_id: &str) -> String {
    format!("users/{}/shopping", user_id)
}

pub struct ShoppingSync;

impl ShoppingSync {
    pub fn plan(user_id: &str) -> SyncPlan {
        SyncPlan {
            upload_collection: collection(user_id),
            pulls: vec![PullPartition {
                collection: collection(user_id),
                cursor_key: format!("pull.shopping.{}", user_id),
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
        let repo = ShoppingRepository::new(pool.clone());
        let cursors = CursorStore::new(pool.clone());
        reconcile(&repo, &cursors, remote, user_id, &Self::plan(user_id)).await
    }
}

impl SyncRecord for ShoppingItem {
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
        .with_field("week_start", self.week_start.to_string())
        .with_field("name", self.name.clone())
        .with_field("quantity", self.quantity)
        .with_field("unit", self.unit.clone())
        .with_field("checked", self.checked)
        .with_field("is_manual", self.is_manual))
    }

    fn from_document(document: &RemoteDocument) -> Result<Self, DocumentError> {
        let week_start = document
            .require_str("week_start")?
            .parse()
            .map_err(|_| DocumentError::MalformedField {
                id: document.id.clone(),
                field: "week_start",
            })?;

        Ok(ShoppingItem {
            id: document.record_id()?,
            user_id: document.owner_id.clone(),
            week_start,
            name: document.require_str("name")?.to_string(),
            quantity: document.f64_field("quantity").unwrap_or(1.0),
            unit: document.str_field("unit").unwrap_or_default().to_string(),
            checked: document.bool_field("checked").unwrap_or(false),
            is_manual: document.bool_field("is_manual").unwrap_or(false),
            created_at: document.created(),
            updated_at: document.updated(),
            sync_state: SyncState::Synced,
        })
    }
}

#[async_trait]
impl SyncStore<ShoppingItem> for ShoppingRepository {
    async fn pending(&self, user_id: &str) -> Result<Vec<ShoppingItem>, sqlx::Error> {
        ShoppingRepository::pending(self, user_id).await
    }

    async fn find_local(&self, incoming: &ShoppingItem) -> Result<Option<ShoppingItem>, sqlx::Error> {
        self.get_any(incoming.id).await
    }

    async fn apply_remote(&self, record: &ShoppingItem) -> Result<(), sqlx::Error> {
        ShoppingRepository::apply_remote(self, record).await
    }

    async fn mark_synced(&self, id: Uuid) -> Result<(), sqlx::Error> {
        ShoppingRepository::mark_synced(self, id).await
    }

    async fn hard_delete(&self, id: Uuid) -> Result<(), sqlx::Error> {
        ShoppingRepository::hard_delete(self, id).await
    }
}
