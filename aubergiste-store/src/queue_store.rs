//! Persisted storage for the offline request queue.
//!
//! The queue is stored as a JSON array of [`QueuedRequest`] records in
//! `pending_requests.json`, rewritten in full after every enqueue, drain,
//! or clear so a restart picks up exactly what was pending.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use aubergiste_core::{CoreError, QueuedRequest, QueueStore};
use tracing::warn;

use crate::persistence::{default_queue_path, load_json, save_json};

// ============================================================================
// File Queue Store
// ============================================================================

/// Queue storage backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileQueueStore {
    path: PathBuf,
}

impl FileQueueStore {
    /// Creates a store reading and writing the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at the default queue path.
    pub fn at_default_path() -> Self {
        Self::new(default_queue_path())
    }
}

#[async_trait]
impl QueueStore for FileQueueStore {
    async fn load(&self) -> Result<Vec<QueuedRequest>, CoreError> {
        match load_json::<Vec<QueuedRequest>>(&self.path).await {
            Ok(items) => Ok(items),
            Err(crate::error::StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Vec::new())
            }
            Err(e) => {
                // A corrupt queue file must not wedge startup; the pending
                // requests are lost but the queue keeps working.
                warn!(path = %self.path.display(), error = %e, "Unreadable queue state, starting empty");
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, items: &[QueuedRequest]) -> Result<(), CoreError> {
        save_json(&self.path, &items).await.map_err(CoreError::from)
    }
}

// ============================================================================
// Memory Queue Store
// ============================================================================

/// In-memory queue storage for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    items: Mutex<Vec<QueuedRequest>>,
}

impl MemoryQueueStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn load(&self) -> Result<Vec<QueuedRequest>, CoreError> {
        let items = self
            .items
            .lock()
            .map_err(|_| CoreError::Storage("queue store lock poisoned".to_string()))?;
        Ok(items.clone())
    }

    async fn save(&self, items: &[QueuedRequest]) -> Result<(), CoreError> {
        let mut stored = self
            .items
            .lock()
            .map_err(|_| CoreError::Storage("queue store lock poisoned".to_string()))?;
        *stored = items.to_vec();
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use aubergiste_core::Method;
    use chrono::Utc;
    use serde_json::json;
    use std::collections::HashMap;

    fn entry(id: &str) -> QueuedRequest {
        QueuedRequest {
            id: id.to_string(),
            url: "https://api.test/stays".to_string(),
            method: Method::Post,
            body: Some(json!({"room": 4})),
            headers: HashMap::new(),
            enqueued_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_file_store_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending_requests.json");

        let store = FileQueueStore::new(&path);
        store.save(&[entry("a"), entry("b")]).await.unwrap();

        // A fresh store over the same file sees the same items, in order.
        let reloaded = FileQueueStore::new(&path).load().await.unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded[0].id, "a");
        assert_eq!(reloaded[1].id, "b");
    }

    #[tokio::test]
    async fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileQueueStore::new(dir.path().join("nope.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending_requests.json");
        tokio::fs::write(&path, "[{broken").await.unwrap();

        let store = FileQueueStore::new(&path);
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryQueueStore::new();
        store.save(&[entry("x")]).await.unwrap();
        let items = store.load().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "x");
    }
}
