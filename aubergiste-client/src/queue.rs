//! Offline request queue.
//!
//! Requests deferred while offline are persisted immediately so they
//! survive a restart, then replayed in original order once connectivity
//! returns. Replay is strictly sequential: dependent call pairs (create
//! then update) must land in the order the caller issued them.
//!
//! The queue is an injectable service with an explicit lifecycle:
//! construct, [`initialize`](OfflineRequestQueue::initialize) to load
//! persisted state and wire connectivity transitions, and
//! [`shutdown`](OfflineRequestQueue::shutdown) to stop the listener.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use aubergiste_core::{
    CoreError, QueueStore, QueuedRequest, RequestBody, RequestDescriptor, ResponseEnvelope,
};
use chrono::Utc;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use crate::connectivity::ConnectivityMonitor;
use crate::executor::Replayer;
use crate::logger::Logger;

/// Grace period before the startup drain, letting the rest of the
/// application finish booting first.
const STARTUP_DRAIN_DELAY: Duration = Duration::from_secs(3);

/// The result of replaying one queued request.
#[derive(Debug)]
pub struct ReplayOutcome {
    /// Queue entry id.
    pub id: String,
    /// The envelope the executor produced on replay.
    pub envelope: ResponseEnvelope,
}

/// Durable FIFO queue of requests deferred while offline.
pub struct OfflineRequestQueue {
    items: Mutex<Vec<QueuedRequest>>,
    store: Arc<dyn QueueStore>,
    replayer: Arc<dyn Replayer>,
    connectivity: ConnectivityMonitor,
    logger: Arc<Logger>,
    listener: Mutex<Option<JoinHandle<()>>>,
    sequence: AtomicU64,
}

impl OfflineRequestQueue {
    /// Creates a queue over the given storage and replay target.
    pub fn new(
        store: Arc<dyn QueueStore>,
        replayer: Arc<dyn Replayer>,
        connectivity: ConnectivityMonitor,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            store,
            replayer,
            connectivity,
            logger,
            listener: Mutex::new(None),
            sequence: AtomicU64::new(0),
        }
    }

    fn lock_items(&self) -> Result<MutexGuard<'_, Vec<QueuedRequest>>, CoreError> {
        self.items
            .lock()
            .map_err(|_| CoreError::Storage("queue lock poisoned".to_string()))
    }

    /// Adds a request to the queue and persists it immediately.
    ///
    /// # Errors
    ///
    /// Rejects multipart bodies, and surfaces persistence failures.
    pub async fn enqueue(&self, descriptor: &RequestDescriptor) -> Result<String, CoreError> {
        let body = match &descriptor.body {
            None => None,
            Some(RequestBody::Json(value)) => Some(value.clone()),
            Some(RequestBody::Form(_)) => {
                return Err(CoreError::InvalidRequest(
                    "multipart uploads cannot be queued offline".to_string(),
                ));
            }
        };

        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let entry = QueuedRequest {
            id: format!("req_{}_{}", Utc::now().timestamp_millis(), sequence),
            url: descriptor.url.clone(),
            method: descriptor.method,
            body,
            headers: descriptor.headers.clone(),
            enqueued_at: Utc::now(),
        };
        let id = entry.id.clone();

        let snapshot = {
            let mut items = self.lock_items()?;
            items.push(entry);
            items.clone()
        };
        self.store.save(&snapshot).await?;

        self.logger.info(
            &format!(
                "Request queued for offline processing: {} {}",
                descriptor.method, descriptor.url
            ),
            &Value::Null,
        );
        Ok(id)
    }

    /// Replays all pending requests, in original enqueue order.
    ///
    /// A no-op while offline. The in-memory queue is snapshotted and
    /// cleared atomically before any replay starts, so enqueues racing an
    /// in-progress drain land in a fresh queue and replay next time —
    /// never lost, never duplicated into the running batch. A failed
    /// replay is surfaced in the results and does not block later items;
    /// it is not re-queued automatically.
    pub async fn drain(&self) -> Vec<ReplayOutcome> {
        if !self.connectivity.is_online() {
            self.logger
                .warn("Cannot process pending requests while offline", &Value::Null);
            return Vec::new();
        }

        let batch = {
            let Ok(mut items) = self.items.lock() else {
                return Vec::new();
            };
            if items.is_empty() {
                return Vec::new();
            }
            std::mem::take(&mut *items)
        };

        if let Err(e) = self.store.save(&[]).await {
            self.logger.warn(
                "Failed to persist cleared queue state",
                &json!({ "error": e.to_string() }),
            );
        }

        let total = batch.len();
        self.logger
            .info(&format!("Processing {total} pending requests"), &Value::Null);

        let mut results = Vec::with_capacity(total);
        for entry in batch {
            self.logger.info(
                &format!("Processing queued request: {} {}", entry.method, entry.url),
                &Value::Null,
            );
            let id = entry.id.clone();
            let envelope = self.replayer.replay(entry).await;
            if !envelope.success {
                self.logger.warn(
                    &format!("Queued request {id} failed on replay"),
                    &json!({ "error": envelope.error }),
                );
            }
            results.push(ReplayOutcome { id, envelope });
        }

        self.logger.info(
            &format!("Completed processing {total} pending requests"),
            &Value::Null,
        );
        results
    }

    /// Returns the number of pending requests.
    pub fn pending_count(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    /// Removes all pending requests, persisting the empty state.
    ///
    /// Returns how many entries were dropped.
    pub async fn clear(&self) -> Result<usize, CoreError> {
        let count = {
            let mut items = self.lock_items()?;
            let count = items.len();
            items.clear();
            count
        };
        self.store.save(&[]).await?;
        self.logger.info(
            &format!("Cleared {count} pending requests from queue"),
            &Value::Null,
        );
        Ok(count)
    }

    /// Loads persisted state and wires connectivity transitions.
    ///
    /// Every offline-to-online transition triggers a drain. If the
    /// process starts online with pending items, a drain is scheduled
    /// after a short grace delay.
    pub async fn initialize(self: &Arc<Self>) -> Result<(), CoreError> {
        let loaded = self.store.load().await?;
        let pending = loaded.len();
        {
            let mut items = self.lock_items()?;
            *items = loaded;
        }
        if pending > 0 {
            self.logger.info(
                &format!("Loaded {pending} pending requests from storage"),
                &Value::Null,
            );
        }

        let queue = Arc::clone(self);
        let mut rx = self.connectivity.subscribe();
        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                if online {
                    queue.logger.info(
                        "Internet connection restored. Processing pending requests...",
                        &Value::Null,
                    );
                    queue.drain().await;
                } else {
                    queue.logger.info(
                        "Internet connection lost. Requests will be queued.",
                        &Value::Null,
                    );
                }
            }
        });
        if let Ok(mut listener) = self.listener.lock() {
            *listener = Some(handle);
        }

        if pending > 0 && self.connectivity.is_online() {
            self.logger.info(
                &format!("Found {pending} pending requests. Processing..."),
                &Value::Null,
            );
            let queue = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(STARTUP_DRAIN_DELAY).await;
                queue.drain().await;
            });
        }

        Ok(())
    }

    /// Stops the connectivity listener.
    pub fn shutdown(&self) {
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
    }
}

impl std::fmt::Debug for OfflineRequestQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineRequestQueue")
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::Environment;
    use async_trait::async_trait;
    use aubergiste_core::Method;
    use aubergiste_store::MemoryQueueStore;
    use serde_json::json;
    use std::sync::OnceLock;

    #[derive(Default)]
    struct RecordingReplayer {
        seen: Mutex<Vec<QueuedRequest>>,
    }

    #[async_trait]
    impl Replayer for RecordingReplayer {
        async fn replay(&self, request: QueuedRequest) -> ResponseEnvelope {
            let failing = request.url.contains("fail");
            self.seen.lock().unwrap().push(request);
            if failing {
                ResponseEnvelope::failure("replay failed", Some(500))
            } else {
                ResponseEnvelope::ok(json!({}), 200)
            }
        }
    }

    /// Enqueues a new request into the queue while replaying, simulating a
    /// caller racing an in-progress drain.
    #[derive(Default)]
    struct ReentrantReplayer {
        queue: OnceLock<Arc<OfflineRequestQueue>>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Replayer for ReentrantReplayer {
        async fn replay(&self, request: QueuedRequest) -> ResponseEnvelope {
            self.seen.lock().unwrap().push(request.url.clone());
            if request.url.ends_with("/first") {
                let queue = self.queue.get().expect("queue wired");
                queue
                    .enqueue(&RequestDescriptor::builder(Method::Post, "https://api.test/racer").build())
                    .await
                    .unwrap();
            }
            ResponseEnvelope::ok(json!({}), 200)
        }
    }

    fn logger() -> Arc<Logger> {
        Arc::new(Logger::with_environment(Environment::Development))
    }

    fn descriptor(url: &str) -> RequestDescriptor {
        RequestDescriptor::builder(Method::Post, url)
            .json(json!({"payload": url}))
            .build()
    }

    #[tokio::test]
    async fn test_drain_replays_in_enqueue_order() {
        let replayer = Arc::new(RecordingReplayer::default());
        let queue = OfflineRequestQueue::new(
            Arc::new(MemoryQueueStore::new()),
            replayer.clone(),
            ConnectivityMonitor::online(),
            logger(),
        );

        let a = queue.enqueue(&descriptor("https://api.test/a")).await.unwrap();
        let b = queue.enqueue(&descriptor("https://api.test/b")).await.unwrap();
        let c = queue.enqueue(&descriptor("https://api.test/c")).await.unwrap();

        let results = queue.drain().await;

        let replayed: Vec<String> = replayer
            .seen
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.id.clone())
            .collect();
        assert_eq!(replayed, vec![a.clone(), b.clone(), c.clone()]);
        assert_eq!(
            results.iter().map(|r| r.id.clone()).collect::<Vec<_>>(),
            vec![a, b, c]
        );
        assert_eq!(queue.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_drain_is_a_noop_while_offline() {
        let replayer = Arc::new(RecordingReplayer::default());
        let queue = OfflineRequestQueue::new(
            Arc::new(MemoryQueueStore::new()),
            replayer.clone(),
            ConnectivityMonitor::new(false),
            logger(),
        );

        queue.enqueue(&descriptor("https://api.test/a")).await.unwrap();
        let results = queue.drain().await;

        assert!(results.is_empty());
        assert!(replayer.seen.lock().unwrap().is_empty());
        assert_eq!(queue.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_replay_does_not_block_later_items() {
        let replayer = Arc::new(RecordingReplayer::default());
        let queue = OfflineRequestQueue::new(
            Arc::new(MemoryQueueStore::new()),
            replayer.clone(),
            ConnectivityMonitor::online(),
            logger(),
        );

        queue.enqueue(&descriptor("https://api.test/a")).await.unwrap();
        queue.enqueue(&descriptor("https://api.test/fail")).await.unwrap();
        queue.enqueue(&descriptor("https://api.test/c")).await.unwrap();

        let results = queue.drain().await;

        assert_eq!(results.len(), 3);
        assert!(results[0].envelope.success);
        assert!(!results[1].envelope.success);
        assert!(results[2].envelope.success);
        assert_eq!(replayer.seen.lock().unwrap().len(), 3);
        // Failed replays are surfaced, not re-queued.
        assert_eq!(queue.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_enqueue_during_drain_lands_in_next_batch() {
        let replayer = Arc::new(ReentrantReplayer::default());
        let queue = Arc::new(OfflineRequestQueue::new(
            Arc::new(MemoryQueueStore::new()),
            replayer.clone(),
            ConnectivityMonitor::online(),
            logger(),
        ));
        replayer.queue.set(Arc::clone(&queue)).ok().unwrap();

        queue
            .enqueue(&RequestDescriptor::builder(Method::Post, "https://api.test/first").build())
            .await
            .unwrap();

        let first_batch = queue.drain().await;
        assert_eq!(first_batch.len(), 1);
        // The racing enqueue is not in the drained batch and not lost.
        assert_eq!(queue.pending_count(), 1);

        let second_batch = queue.drain().await;
        assert_eq!(second_batch.len(), 1);
        assert_eq!(
            *replayer.seen.lock().unwrap(),
            vec![
                "https://api.test/first".to_string(),
                "https://api.test/racer".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_multipart_bodies_are_rejected() {
        let queue = OfflineRequestQueue::new(
            Arc::new(MemoryQueueStore::new()),
            Arc::new(RecordingReplayer::default()),
            ConnectivityMonitor::online(),
            logger(),
        );

        let upload = RequestDescriptor::builder(Method::Post, "https://api.test/photos")
            .form(aubergiste_core::FormPayload::new().text("label", "recto"))
            .build();

        assert!(matches!(
            queue.enqueue(&upload).await,
            Err(CoreError::InvalidRequest(_))
        ));
        assert_eq!(queue.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_queue_state_is_persisted() {
        let store = Arc::new(MemoryQueueStore::new());
        let queue = OfflineRequestQueue::new(
            store.clone(),
            Arc::new(RecordingReplayer::default()),
            ConnectivityMonitor::online(),
            logger(),
        );

        queue.enqueue(&descriptor("https://api.test/a")).await.unwrap();
        queue.enqueue(&descriptor("https://api.test/b")).await.unwrap();
        assert_eq!(store.load().await.unwrap().len(), 2);

        queue.drain().await;
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_drops_pending_requests() {
        let store = Arc::new(MemoryQueueStore::new());
        let queue = OfflineRequestQueue::new(
            store.clone(),
            Arc::new(RecordingReplayer::default()),
            ConnectivityMonitor::online(),
            logger(),
        );

        queue.enqueue(&descriptor("https://api.test/a")).await.unwrap();
        assert_eq!(queue.clear().await.unwrap(), 1);
        assert_eq!(queue.pending_count(), 0);
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_schedules_startup_drain() {
        let store = Arc::new(MemoryQueueStore::new());
        store
            .save(&[QueuedRequest {
                id: "req_persisted_1".to_string(),
                url: "https://api.test/persisted".to_string(),
                method: Method::Post,
                body: Some(json!({"room": 3})),
                headers: std::collections::HashMap::new(),
                enqueued_at: Utc::now(),
            }])
            .await
            .unwrap();

        let replayer = Arc::new(RecordingReplayer::default());
        let queue = Arc::new(OfflineRequestQueue::new(
            store,
            replayer.clone(),
            ConnectivityMonitor::online(),
            logger(),
        ));

        queue.initialize().await.unwrap();
        assert_eq!(queue.pending_count(), 1);

        // The startup drain waits out its grace delay before replaying.
        tokio::time::sleep(STARTUP_DRAIN_DELAY + Duration::from_secs(1)).await;
        assert_eq!(replayer.seen.lock().unwrap().len(), 1);
        assert_eq!(queue.pending_count(), 0);

        queue.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_online_transition_triggers_drain() {
        let connectivity = ConnectivityMonitor::new(false);
        let replayer = Arc::new(RecordingReplayer::default());
        let queue = Arc::new(OfflineRequestQueue::new(
            Arc::new(MemoryQueueStore::new()),
            replayer.clone(),
            connectivity.clone(),
            logger(),
        ));

        queue.initialize().await.unwrap();
        queue.enqueue(&descriptor("https://api.test/deferred")).await.unwrap();

        connectivity.set_online();

        // Give the listener a chance to observe the edge and drain.
        let mut waited = 0;
        while replayer.seen.lock().unwrap().is_empty() && waited < 100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            waited += 1;
        }

        assert_eq!(replayer.seen.lock().unwrap().len(), 1);
        assert_eq!(queue.pending_count(), 0);

        queue.shutdown();
    }
}
