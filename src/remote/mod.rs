//! Remote document store abstraction.
//!
//! The sync engine only needs three things from a remote store: per-document
//! merge-writes, range-filtered reads (`updated_at` strictly greater than a
//! cursor), and a reachability probe for the scheduler's connectivity gate.
//! Any document store with those properties works; `HttpRemote` talks to the
//! hosted store and `MemoryRemote` backs tests and offline development.
//!
//! Collection layout:
//! - `users/{user}/recipes`, plus the shared `recipes/public` partition
//! - `users/{user}/favorites`
//! - `users/{user}/meal_plans`
//! - `users/{user}/shopping`

mod document;
mod http;
mod memory;

pub use document::{DocumentError, RemoteDocument};
pub use http::HttpRemote;
pub use memory::MemoryRemote;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the remote store. All of them are treated as transient by the
/// sync layer: the invocation aborts and the scheduler retries later.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("remote returned status {status} for {path}")]
    Status { status: u16, path: String },

    #[error("remote store is offline")]
    Offline,
}

/// A per-user, per-entity-type document store keyed by record id.
///
/// The process holds one long-lived shared instance (`Arc<dyn RemoteStore>`);
/// it must be safe for concurrent use by several worker invocations.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Merge-upsert a document: fields present in `document` overwrite, fields
    /// absent are left untouched server-side.
    async fn write_merge(
        &self,
        collection: &str,
        doc_id: &str,
        document: &RemoteDocument,
    ) -> Result<(), RemoteError>;

    /// Documents with `updated_at` strictly greater than `updated_after`.
    /// Zero means "everything".
    async fn query_since(
        &self,
        collection: &str,
        updated_after: i64,
    ) -> Result<Vec<RemoteDocument>, RemoteError>;

    /// Connectivity probe used by the scheduler before dispatching workers.
    async fn reachable(&self) -> bool;
}
