//! API health monitoring.
//!
//! Periodically probes the backend health endpoint through the executor
//! (with retries disabled and a short deadline) and keeps the last
//! observed status. Connectivity transitions are wired in: going offline
//! marks the status immediately, coming back online triggers a fresh
//! check.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aubergiste_core::{Method, RequestDescriptor};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use crate::executor::ApiClient;

/// Deadline for health probes; short so a wedged backend is noticed fast.
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Default interval between periodic checks.
pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);

// ============================================================================
// Health Status
// ============================================================================

/// The last observed backend health.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Whether the backend answered its last probe.
    pub is_online: bool,
    /// When the last probe ran.
    pub last_check: Option<DateTime<Utc>>,
    /// Failure message from the last probe, when it failed.
    pub error: Option<String>,
}

impl Default for HealthStatus {
    /// Optimistic until a probe says otherwise.
    fn default() -> Self {
        Self {
            is_online: true,
            last_check: None,
            error: None,
        }
    }
}

// ============================================================================
// Health Monitor
// ============================================================================

/// Tracks backend reachability via the health endpoint.
pub struct HealthMonitor {
    client: Arc<ApiClient>,
    health_url: String,
    status: Mutex<HealthStatus>,
    is_checking: AtomicBool,
    periodic: Mutex<Option<JoinHandle<()>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl HealthMonitor {
    /// Creates a monitor probing the given health endpoint.
    pub fn new(client: Arc<ApiClient>, health_url: impl Into<String>) -> Self {
        Self {
            client,
            health_url: health_url.into(),
            status: Mutex::new(HealthStatus::default()),
            is_checking: AtomicBool::new(false),
            periodic: Mutex::new(None),
            listener: Mutex::new(None),
        }
    }

    /// Probes the health endpoint once and records the outcome.
    ///
    /// Reentrant calls while a check is in flight return the last known
    /// status instead of stacking probes.
    pub async fn check_health(&self) -> HealthStatus {
        if self.is_checking.swap(true, Ordering::SeqCst) {
            return self.status();
        }

        self.client
            .logger()
            .info("Checking API health", &Value::Null);

        let envelope = self
            .client
            .request(
                RequestDescriptor::builder(Method::Get, self.health_url.clone())
                    .skip_retry()
                    .timeout(HEALTH_CHECK_TIMEOUT)
                    .build(),
            )
            .await;

        let status = if envelope.success {
            self.client
                .logger()
                .info("API health check successful", &Value::Null);
            HealthStatus {
                is_online: true,
                last_check: Some(Utc::now()),
                error: None,
            }
        } else {
            let error = envelope
                .error
                .unwrap_or_else(|| "API returned an error".to_string());
            self.client
                .logger()
                .warn("API health check failed", &json!({ "error": error }));
            HealthStatus {
                is_online: false,
                last_check: Some(Utc::now()),
                error: Some(error),
            }
        };

        if let Ok(mut current) = self.status.lock() {
            *current = status.clone();
        }
        self.is_checking.store(false, Ordering::SeqCst);
        status
    }

    /// Returns the last observed status.
    pub fn status(&self) -> HealthStatus {
        self.status
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Returns true if the backend answered its last probe.
    pub fn is_online(&self) -> bool {
        self.status().is_online
    }

    /// Wires connectivity transitions: offline marks the status
    /// immediately, online triggers a fresh probe.
    pub fn initialize(self: &Arc<Self>) {
        let monitor = Arc::clone(self);
        let mut rx = self.client.connectivity().subscribe();
        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let online = *rx.borrow_and_update();
                if online {
                    monitor.check_health().await;
                } else {
                    monitor
                        .client
                        .logger()
                        .warn("Network connection reported offline", &Value::Null);
                    if let Ok(mut status) = monitor.status.lock() {
                        *status = HealthStatus {
                            is_online: false,
                            last_check: Some(Utc::now()),
                            error: Some("Network connection is offline".to_string()),
                        };
                    }
                }
            }
        });
        if let Ok(mut listener) = self.listener.lock() {
            *listener = Some(handle);
        }
    }

    /// Starts periodic checks: one immediately, then one per interval.
    /// A running periodic task is replaced.
    pub fn start_periodic_checks(self: &Arc<Self>, interval: Duration) {
        self.stop_periodic_checks();

        let monitor = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                monitor.check_health().await;
            }
        });
        if let Ok(mut periodic) = self.periodic.lock() {
            *periodic = Some(handle);
        }
    }

    /// Stops the periodic checks.
    pub fn stop_periodic_checks(&self) {
        if let Ok(mut periodic) = self.periodic.lock() {
            if let Some(handle) = periodic.take() {
                handle.abort();
            }
        }
    }

    /// Stops all background tasks.
    pub fn shutdown(&self) {
        self.stop_periodic_checks();
        if let Ok(mut listener) = self.listener.lock() {
            if let Some(handle) = listener.take() {
                handle.abort();
            }
        }
    }
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("health_url", &self.health_url)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Concurrent probes
// ============================================================================

/// Probes several endpoints concurrently. Used by operator tooling to
/// sweep a set of backends in one pass.
pub async fn check_endpoints(client: &ApiClient, urls: &[String]) -> Vec<HealthStatus> {
    let probes = urls.iter().map(|url| async move {
        let envelope = client
            .request(
                RequestDescriptor::builder(Method::Get, url.clone())
                    .skip_retry()
                    .timeout(HEALTH_CHECK_TIMEOUT)
                    .build(),
            )
            .await;
        HealthStatus {
            is_online: envelope.success,
            last_check: Some(Utc::now()),
            error: envelope.error,
        }
    });
    join_all(probes).await
}

// ============================================================================
// Tests
// ============================================================================
