//! In-memory remote store for tests and offline development.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{RemoteDocument, RemoteError, RemoteStore};

/// A remote store held entirely in memory, with the same merge-write and
/// range-query semantics as the hosted one. Can be switched "offline" to
/// exercise connectivity gating and transient-failure paths.
pub struct MemoryRemote {
    collections: Mutex<HashMap<String, BTreeMap<String, RemoteDocument>>>,
    online: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            latency: Mutex::new(None),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Add an artificial delay to every operation.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    pub fn document(&self, collection: &str, doc_id: &str) -> Option<RemoteDocument> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .and_then(|docs| docs.get(doc_id))
            .cloned()
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    async fn simulate(&self) -> Result<(), RemoteError> {
        let latency = { *self.latency.lock().unwrap() };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if !self.online.load(Ordering::SeqCst) {
            return Err(RemoteError::Offline);
        }
        Ok(())
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn write_merge(
        &self,
        collection: &str,
        doc_id: &str,
        document: &RemoteDocument,
    ) -> Result<(), RemoteError> {
        self.simulate().await?;
        let mut collections = self.collections.lock().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.get_mut(doc_id) {
            Some(stored) => stored.merge_from(document),
            None => {
                docs.insert(doc_id.to_string(), document.clone());
            }
        }
        Ok(())
    }

    async fn query_since(
        &self,
        collection: &str,
        updated_after: i64,
    ) -> Result<Vec<RemoteDocument>, RemoteError> {
        self.simulate().await?;
        let collections = self.collections.lock().unwrap();
        let mut matching: Vec<RemoteDocument> = collections
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| doc.updated_at > updated_after)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        matching.sort_by_key(|doc| doc.updated_at);
        Ok(matching)
    }

    async fn reachable(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn doc(updated_ms: i64) -> RemoteDocument {
        RemoteDocument {
            id: Uuid::new_v4().to_string(),
            owner_id: "user1".to_string(),
            is_deleted: false,
            created_at: 0,
            updated_at: updated_ms,
            fields: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn test_write_and_query() {
        let remote = MemoryRemote::new();
        let document = doc(1000);
        remote
            .write_merge("users/u1/recipes", &document.id, &document)
            .await
            .unwrap();

        let all = remote.query_since("users/u1/recipes", 0).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], document);
    }

    #[tokio::test]
    async fn test_query_filter_is_strictly_greater() {
        let remote = MemoryRemote::new();
        for ms in [1000, 2000, 3000] {
            let document = doc(ms);
            remote
                .write_merge("c", &document.id, &document)
                .await
                .unwrap();
        }

        let newer = remote.query_since("c", 2000).await.unwrap();
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].updated_at, 3000);
    }

    #[tokio::test]
    async fn test_results_sorted_by_updated_at() {
        let remote = MemoryRemote::new();
        for ms in [3000, 1000, 2000] {
            let document = doc(ms);
            remote
                .write_merge("c", &document.id, &document)
                .await
                .unwrap();
        }

        let all = remote.query_since("c", 0).await.unwrap();
        let stamps: Vec<i64> = all.iter().map(|d| d.updated_at).collect();
        assert_eq!(stamps, vec![1000, 2000, 3000]);
    }

    #[tokio::test]
    async fn test_merge_write_updates_in_place() {
        let remote = MemoryRemote::new();
        let first = doc(1000).with_field("title", "Omelet");
        remote.write_merge("c", &first.id, &first).await.unwrap();

        let mut second = first.clone();
        second.updated_at = 2000;
        second.fields.clear();
        let second = second.with_field("title", "Omelet v2");
        remote.write_merge("c", &first.id, &second).await.unwrap();

        assert_eq!(remote.document_count("c"), 1);
        let stored = remote.document("c", &first.id).unwrap();
        assert_eq!(stored.updated_at, 2000);
        assert_eq!(stored.str_field("title"), Some("Omelet v2"));
    }

    #[tokio::test]
    async fn test_offline_errors_and_recovers() {
        let remote = MemoryRemote::new();
        remote.set_online(false);
        assert!(!remote.reachable().await);

        let document = doc(1000);
        assert!(matches!(
            remote.write_merge("c", &document.id, &document).await,
            Err(RemoteError::Offline)
        ));

        remote.set_online(true);
        assert!(remote.write_merge("c", &document.id, &document).await.is_ok());
    }
}
