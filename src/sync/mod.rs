//! Offline-first synchronization.
//!
//! Every entity replicates the same way: pending local changes are uploaded
//! as merge-writes to the remote store, then remote changes newer than a
//! persisted per-partition cursor are pulled and applied under a last-write-
//! wins conflict guard. The algorithm lives once in [`engine::reconcile`];
//! the per-entity modules supply the field mapping, natural-key lookup and
//! partition layout. [`SyncScheduler`] decides when workers run.

pub mod engine;
pub mod favorite_sync;
pub mod mealplan_sync;
pub mod recipe_sync;
pub mod scheduler;
pub mod shopping_sync;

pub use engine::{reconcile, PullPartition, SyncOutcome, SyncPlan, SyncRecord, SyncStore};
pub use favorite_sync::FavoriteSync;
pub use mealplan_sync::MealPlanSync;
pub use recipe_sync::RecipeSync;
pub use scheduler::{SkipReason, SyncRun, SyncScheduler, DEFAULT_SYNC_INTERVAL};
pub use shopping_sync::ShoppingSync;

use sqlx::SqlitePool;
use std::fmt;
use thiserror::Error;

use crate::remote::{DocumentError, RemoteError, RemoteStore};

/// Errors that abort a sync invocation. The scheduler treats all of them as
/// "retry later"; partial progress already committed is kept, which is safe
/// because upload and pull are idempotent.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("remote store error: {0}")]
    Remote(#[from] RemoteError),

    #[error("local store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("document mapping error: {0}")]
    Document(#[from] DocumentError),

    #[error("payload encoding error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// The four entity types, each synced by its own worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Recipes,
    Favorites,
    MealPlans,
    Shopping,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Recipes,
        EntityKind::Favorites,
        EntityKind::MealPlans,
        EntityKind::Shopping,
    ];
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Recipes => write!(f, "recipes"),
            EntityKind::Favorites => write!(f, "favorites"),
            EntityKind::MealPlans => write!(f, "meal plans"),
            EntityKind::Shopping => write!(f, "shopping"),
        }
    }
}

/// Run one entity worker against an open pool.
pub async fn run_entity(
    pool: &SqlitePool,
    remote: &dyn RemoteStore,
    kind: EntityKind,
    user_id: &str,
) -> Result<SyncOutcome, SyncError> {
    match kind {
        EntityKind::Recipes => RecipeSync::run(pool, remote, user_id).await,
        EntityKind::Favorites => FavoriteSync::run(pool, remote, user_id).await,
        EntityKind::MealPlans => MealPlanSync::run(pool, remote, user_id).await,
        EntityKind::Shopping => ShoppingSync::run(pool, remote, user_id).await,
    }
}
