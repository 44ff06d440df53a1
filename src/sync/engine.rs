//! The generic reconciliation routine shared by all entity workers.

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::CursorStore;
use crate::models::SyncState;
use crate::remote::{DocumentError, RemoteDocument, RemoteStore};

use super::SyncError;

/// Mapping between a local record and its remote document.
pub trait SyncRecord: Sized + Send + Sync {
    fn id(&self) -> Uuid;
    fn owner_id(&self) -> &str;
    fn sync_state(&self) -> SyncState;

    /// Authoritative ordering value for conflict resolution.
    fn updated_at_ms(&self) -> i64;

    fn to_document(&self) -> Result<RemoteDocument, serde_json::Error>;

    /// Decode a remote document. The result always carries
    /// `SyncState::Synced`: a winning pull bypasses the pending cycle.
    fn from_document(document: &RemoteDocument) -> Result<Self, DocumentError>;

    /// Extra collections every upload of this record is mirrored into
    /// (public recipes fan out to the shared partition, tombstones included).
    fn mirror_collections(&self) -> Vec<String> {
        Vec::new()
    }
}

/// The local-store operations the engine needs, implemented by each
/// entity's repository.
#[async_trait]
pub trait SyncStore<T>: Send + Sync {
    /// Records with a non-synced status for this user, tombstones included.
    async fn pending(&self, user_id: &str) -> Result<Vec<T>, sqlx::Error>;

    /// Natural-key lookup for the conflict guard; must see tombstones.
    async fn find_local(&self, incoming: &T) -> Result<Option<T>, sqlx::Error>;

    /// Insert-or-replace with the incoming record's values.
    async fn apply_remote(&self, record: &T) -> Result<(), sqlx::Error>;

    async fn mark_synced(&self, id: Uuid) -> Result<(), sqlx::Error>;

    async fn hard_delete(&self, id: Uuid) -> Result<(), sqlx::Error>;
}

/// One remote partition to pull from, with its own persisted cursor.
pub struct PullPartition {
    pub collection: String,
    pub cursor_key: String,
}

/// Where an entity uploads to and pulls from for one user.
pub struct SyncPlan {
    pub upload_collection: String,
    pub pulls: Vec<PullPartition>,
}

/// Counters for one reconciliation. Conflict-guard skips are reported
/// separately from applied upserts and tombstone purges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Pending records uploaded.
    pub uploaded: usize,
    /// Remote documents upserted locally.
    pub applied: usize,
    /// Local rows removed by remote tombstones.
    pub purged: usize,
    /// Remote documents skipped because a newer local edit was pending.
    pub skipped: usize,
}

impl SyncOutcome {
    pub fn absorb(&mut self, other: SyncOutcome) {
        self.uploaded += other.uploaded;
        self.applied += other.applied;
        self.purged += other.purged;
        self.skipped += other.skipped;
    }

    pub fn is_noop(&self) -> bool {
        *self == SyncOutcome::default()
    }
}

/// Reconcile one entity type for one user: upload every pending local
/// change, then pull each partition past its cursor.
///
/// Any error aborts the invocation; progress already committed stays, and a
/// retry re-does only what is left (uploads of already-synced records and
/// re-application of identical documents are no-ops).
pub async fn reconcile<T, S, R>(
    store: &S,
    cursors: &CursorStore,
    remote: &R,
    user_id: &str,
    plan: &SyncPlan,
) -> Result<SyncOutcome, SyncError>
where
    T: SyncRecord,
    S: SyncStore<T> + ?Sized,
    R: RemoteStore + ?Sized,
{
    let mut outcome = SyncOutcome::default();

    upload(store, remote, user_id, plan, &mut outcome).await?;
    for partition in &plan.pulls {
        pull_partition(store, cursors, remote, partition, &mut outcome).await?;
    }

    Ok(outcome)
}

/// Upload phase: push every pending record for this user, then settle its
/// local state (mark synced, or purge an uploaded tombstone).
pub async fn upload<T, S, R>(
    store: &S,
    remote: &R,
    user_id: &str,
    plan: &SyncPlan,
    outcome: &mut SyncOutcome,
) -> Result<(), SyncError>
where
    T: SyncRecord,
    S: SyncStore<T> + ?Sized,
    R: RemoteStore + ?Sized,
{
    for record in store.pending(user_id).await? {
        // A pending record owned by someone else should not exist under this
        // identity; uploading it would write into a foreign partition, and
        // leaving it pending would retry forever.
        if record.owner_id() != user_id {
            tracing::warn!(
                id = %record.id(),
                owner = record.owner_id(),
                user = user_id,
                "pending record has a foreign owner; marking synced without upload"
            );
            store.mark_synced(record.id()).await?;
            continue;
        }

        let document = record.to_document()?;
        remote
            .write_merge(&plan.upload_collection, &document.id, &document)
            .await?;
        for collection in record.mirror_collections() {
            remote.write_merge(&collection, &document.id, &document).await?;
        }

        if record.sync_state() == SyncState::Tombstone {
            // The remote tombstone is durable; the local row has no further
            // purpose.
            store.hard_delete(record.id()).await?;
        } else {
            store.mark_synced(record.id()).await?;
        }
        outcome.uploaded += 1;
    }

    Ok(())
}

/// Pull phase for one partition: apply remote changes past the cursor under
/// the conflict guard, then persist the advanced cursor.
pub async fn pull_partition<T, S, R>(
    store: &S,
    cursors: &CursorStore,
    remote: &R,
    partition: &PullPartition,
    outcome: &mut SyncOutcome,
) -> Result<(), SyncError>
where
    T: SyncRecord,
    S: SyncStore<T> + ?Sized,
    R: RemoteStore + ?Sized,
{
    let cursor = cursors.get(&partition.cursor_key).await?;
    let documents = remote.query_since(&partition.collection, cursor).await?;
    tracing::debug!(
        collection = %partition.collection,
        cursor,
        count = documents.len(),
        "pulled remote documents"
    );

    let mut newest = cursor;
    for document in &documents {
        // The cursor tracks everything we have seen, applied or not.
        newest = newest.max(document.updated_at);

        let incoming = match T::from_document(document) {
            Ok(record) => record,
            Err(error) => {
                // Skip it rather than abort: aborting would re-pull the same
                // broken document on every retry.
                tracing::warn!(doc = %document.id, %error, "skipping malformed remote document");
                continue;
            }
        };

        let local = store.find_local(&incoming).await?;
        if let Some(local) = &local {
            if local.sync_state().is_pending() && local.updated_at_ms() > document.updated_at {
                // The local edit is newer; a stale pull must not clobber it.
                outcome.skipped += 1;
                continue;
            }
        }

        if document.is_deleted {
            if let Some(local) = local {
                store.hard_delete(local.id()).await?;
                outcome.purged += 1;
            }
            continue;
        }

        store.apply_remote(&incoming).await?;
        outcome.applied += 1;
    }

    if newest > cursor {
        cursors.advance(&partition.cursor_key, newest).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_db, RecipeRepository};
    use crate::models::Recipe;
    use crate::remote::MemoryRemote;
    use crate::sync::recipe_sync::RecipeSync;
    use chrono::DateTime;
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    const USER: &str = "user1";

    async fn setup() -> (SqlitePool, MemoryRemote, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        (pool, MemoryRemote::new(), temp_dir)
    }

    fn at(ms: i64) -> chrono::DateTime<chrono::Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    fn own_collection() -> String {
        format!("users/{}/recipes", USER)
    }

    async fn run(pool: &SqlitePool, remote: &MemoryRemote) -> SyncOutcome {
        RecipeSync::run(pool, remote, USER).await.unwrap()
    }

    #[tokio::test]
    async fn test_upload_marks_synced_and_writes_document() {
        let (pool, remote, _tmp) = setup().await;
        let repo = RecipeRepository::new(pool.clone());

        let recipe = Recipe::new("Omelet", USER);
        repo.create(&recipe).await.unwrap();

        let outcome = run(&pool, &remote).await;
        assert_eq!(outcome.uploaded, 1);

        let document = remote
            .document(&own_collection(), &recipe.id.to_string())
            .unwrap();
        assert_eq!(document.str_field("title"), Some("Omelet"));
        assert!(!document.is_deleted);

        let local = repo.get(recipe.id).await.unwrap().unwrap();
        assert_eq!(local.sync_state, SyncState::Synced);
    }

    #[tokio::test]
    async fn test_upload_is_idempotent() {
        let (pool, remote, _tmp) = setup().await;
        let repo = RecipeRepository::new(pool.clone());

        let recipe = Recipe::new("Omelet", USER);
        repo.create(&recipe).await.unwrap();
        run(&pool, &remote).await;

        // Simulate a crash between the remote write and the local status
        // update: force the record back to pending and upload again.
        let mut again = repo.get(recipe.id).await.unwrap().unwrap();
        again.sync_state = SyncState::PendingUpdate;
        repo.update(&again).await.unwrap();
        run(&pool, &remote).await;

        assert_eq!(remote.document_count(&own_collection()), 1);
        let document = remote
            .document(&own_collection(), &recipe.id.to_string())
            .unwrap();
        assert_eq!(document.str_field("title"), Some("Omelet"));
    }

    #[tokio::test]
    async fn test_tombstone_convergence() {
        let (pool, remote, _tmp) = setup().await;
        let repo = RecipeRepository::new(pool.clone());

        let mut recipe = Recipe::new("Stew", USER);
        recipe.sync_state = SyncState::Synced;
        repo.create(&recipe).await.unwrap();
        repo.delete(recipe.id).await.unwrap();

        let outcome = run(&pool, &remote).await;
        assert_eq!(outcome.uploaded, 1);

        let document = remote
            .document(&own_collection(), &recipe.id.to_string())
            .unwrap();
        assert!(document.is_deleted);
        // The local row is gone once the tombstone is durable
        assert!(repo.get_any(recipe.id).await.unwrap().is_none());
    }

    /// Pull a single partition in isolation, without the upload phase.
    async fn pull_own(pool: &SqlitePool, remote: &MemoryRemote) -> SyncOutcome {
        let repo = RecipeRepository::new(pool.clone());
        let cursors = CursorStore::new(pool.clone());
        let partition = PullPartition {
            collection: own_collection(),
            cursor_key: format!("pull.recipes.own.{}", USER),
        };
        let mut outcome = SyncOutcome::default();
        pull_partition::<Recipe, _, _>(&repo, &cursors, remote, &partition, &mut outcome)
            .await
            .unwrap();
        outcome
    }

    #[tokio::test]
    async fn test_pull_applies_newer_remote_document() {
        let (pool, remote, _tmp) = setup().await;
        let repo = RecipeRepository::new(pool.clone());

        let mut recipe = Recipe::new("Omelet", USER);
        recipe.updated_at = at(1000);
        recipe.sync_state = SyncState::PendingUpdate;
        repo.create(&recipe).await.unwrap();

        let mut newer = recipe.clone();
        newer.title = "Omelet v2".to_string();
        newer.updated_at = at(2000);
        let document = newer.to_document().unwrap();
        remote
            .write_merge(&own_collection(), &document.id, &document)
            .await
            .unwrap();

        // Local pending edit at t=1000 loses to the remote write at t=2000
        let outcome = pull_own(&pool, &remote).await;
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.skipped, 0);

        let local = repo.get(recipe.id).await.unwrap().unwrap();
        assert_eq!(local.title, "Omelet v2");
        assert_eq!(local.sync_state, SyncState::Synced);
    }

    #[tokio::test]
    async fn test_conflict_guard_skips_stale_remote_document() {
        let (pool, remote, _tmp) = setup().await;
        let repo = RecipeRepository::new(pool.clone());

        let mut recipe = Recipe::new("Omelet", USER);
        recipe.updated_at = at(3000);
        recipe.sync_state = SyncState::PendingUpdate;
        repo.create(&recipe).await.unwrap();

        let mut stale = recipe.clone();
        stale.title = "Omelet v2".to_string();
        stale.updated_at = at(2000);
        let document = stale.to_document().unwrap();
        remote
            .write_merge(&own_collection(), &document.id, &document)
            .await
            .unwrap();

        // Local pending edit at t=3000 beats the remote write at t=2000
        let outcome = pull_own(&pool, &remote).await;
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.applied, 0);

        let local = repo.get(recipe.id).await.unwrap().unwrap();
        assert_eq!(local.title, "Omelet");
        assert_eq!(local.sync_state, SyncState::PendingUpdate);
    }

    #[tokio::test]
    async fn test_cursor_is_monotonic_and_prevents_reapply() {
        let (pool, remote, _tmp) = setup().await;
        let repo = RecipeRepository::new(pool.clone());
        let cursors = CursorStore::new(pool.clone());
        let cursor_key = format!("pull.recipes.own.{}", USER);

        // A document authored on another device
        let mut recipe = Recipe::new("Omelet", USER);
        recipe.updated_at = at(5000);
        recipe.sync_state = SyncState::Synced;
        let document = recipe.to_document().unwrap();
        remote
            .write_merge(&own_collection(), &document.id, &document)
            .await
            .unwrap();

        let first = run(&pool, &remote).await;
        assert_eq!(first.applied, 1);
        assert_eq!(cursors.get(&cursor_key).await.unwrap(), 5000);

        // Locally diverge, then run an identical pull: the cursor excludes
        // the already-seen document, so the local change survives.
        let mut edited = repo.get(recipe.id).await.unwrap().unwrap();
        edited.title = "Mine now".to_string();
        repo.update(&edited).await.unwrap();

        let second = run(&pool, &remote).await;
        assert_eq!(second.applied, 0);
        assert_eq!(cursors.get(&cursor_key).await.unwrap(), 5000);
        assert_eq!(
            repo.get(recipe.id).await.unwrap().unwrap().title,
            "Mine now"
        );
    }

    #[tokio::test]
    async fn test_round_trip_to_second_store() {
        let (pool, remote, _tmp) = setup().await;
        let repo = RecipeRepository::new(pool.clone());

        let recipe = Recipe::new("Pancakes", USER)
            .with_description("Sunday batch")
            .with_servings(4);
        repo.create(&recipe).await.unwrap();
        run(&pool, &remote).await;

        // A second device with an empty store pulls from cursor zero
        let temp_dir = TempDir::new().unwrap();
        let other_pool = init_db(&temp_dir.path().join("other.db")).await.unwrap();
        let outcome = run(&other_pool, &remote).await;
        assert_eq!(outcome.applied, 1);

        let other_repo = RecipeRepository::new(other_pool);
        let copy = other_repo.get(recipe.id).await.unwrap().unwrap();
        assert_eq!(copy.title, "Pancakes");
        assert_eq!(copy.description, "Sunday batch");
        assert_eq!(copy.servings, Some(4));
        assert_eq!(copy.sync_state, SyncState::Synced);
    }

    #[tokio::test]
    async fn test_remote_tombstone_purges_local_row() {
        let (pool, remote, _tmp) = setup().await;
        let repo = RecipeRepository::new(pool.clone());

        let mut recipe = Recipe::new("Old", USER);
        recipe.sync_state = SyncState::Synced;
        recipe.updated_at = at(1000);
        repo.create(&recipe).await.unwrap();

        let mut deleted = recipe.clone();
        deleted.updated_at = at(2000);
        deleted.sync_state = SyncState::Tombstone;
        let document = deleted.to_document().unwrap();
        remote
            .write_merge(&own_collection(), &document.id, &document)
            .await
            .unwrap();

        let outcome = run(&pool, &remote).await;
        assert_eq!(outcome.purged, 1);
        assert!(repo.get_any(recipe.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remote_failure_aborts_and_retry_succeeds() {
        let (pool, remote, _tmp) = setup().await;
        let repo = RecipeRepository::new(pool.clone());

        let recipe = Recipe::new("Omelet", USER);
        repo.create(&recipe).await.unwrap();

        remote.set_online(false);
        let result = RecipeSync::run(&pool, &remote, USER).await;
        assert!(result.is_err());

        // Still pending, so the retry picks it up
        assert_eq!(repo.pending(USER).await.unwrap().len(), 1);

        remote.set_online(true);
        let outcome = run(&pool, &remote).await;
        assert_eq!(outcome.uploaded, 1);
        assert!(repo.pending(USER).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_document_is_skipped_but_cursor_advances() {
        let (pool, remote, _tmp) = setup().await;
        let cursors = CursorStore::new(pool.clone());

        let broken = RemoteDocument {
            id: "not-a-uuid".to_string(),
            owner_id: USER.to_string(),
            is_deleted: false,
            created_at: 0,
            updated_at: 7000,
            fields: serde_json::Map::new(),
        };
        remote
            .write_merge(&own_collection(), &broken.id, &broken)
            .await
            .unwrap();

        let outcome = run(&pool, &remote).await;
        assert!(outcome.is_noop());
        assert_eq!(
            cursors
                .get(&format!("pull.recipes.own.{}", USER))
                .await
                .unwrap(),
            7000
        );
    }
}
