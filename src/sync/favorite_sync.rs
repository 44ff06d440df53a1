//! Favorite worker.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{CursorStore, FavoriteRepository};
use crate::models::{Favorite, SyncState};
use crate::remote::{DocumentError, RemoteDocument, RemoteStore};

use super::engine::{reconcile, PullPartition, SyncOutcome, SyncPlan, SyncRecord, SyncStore};
use super::SyncError;

fn collection(user_id: &str) -> String {
    format!("users/{}/favorites", user_id)
}

pub struct FavoriteSync;

impl FavoriteSync {
    pub fn plan(user_id: &str) -> SyncPlan {
        SyncPlan {
            upload_collection: collection(user_id),
            pulls: vec![PullPartition {
                collection: collection(user_id),
                cursor_key: format!("pull.favorites.{}", user_id),
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
        let repo = FavoriteRepository::new(pool.clone());
        let cursors = CursorStore::new(pool.clone());
        reconcile(&repo, &cursors, remote, user_id, &Self::plan(user_id)).await
    }
}

impl SyncRecord for Favorite {
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
        .with_field("recipe_id", self.recipe_id.to_string()))
    }

    fn from_document(document: &RemoteDocument) -> Result<Self, DocumentError> {
        Ok(Favorite {
            id: document.record_id()?,
            user_id: document.owner_id.clone(),
            recipe_id: document.require_uuid("recipe_id")?,
            created_at: document.created(),
            updated_at: document.updated(),
            sync_state: SyncState::Synced,
        })
    }
}

#[async_trait]
impl SyncStore<Favorite> for FavoriteRepository {
    async fn pending(&self, user_id: &str) -> Result<Vec<Favorite>, sqlx::Error> {
        FavoriteRepository::pending(self, user_id).await
    }

    async fn find_local(&self, incoming: &Favorite) -> Result<Option<Favorite>, sqlx::Error> {
        self.get_any(incoming.id).await
    }

    async fn apply_remote(&self, record: &Favorite) -> Result<(), sqlx::Error> {
        FavoriteRepository::apply_remote(self, record).await
    }

    async fn mark_synced(&self, id: Uuid) -> Result<(), sqlx::Error> {
        FavoriteRepository::mark_synced(self, id).await
    }

    async fn hard_delete(&self, id: Uuid) -> Result<(), sqlx::Error> {
        FavoriteRepository::hard_delete(self, id).await
    }
}
