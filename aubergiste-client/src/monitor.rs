//! Process-wide error monitoring with a capture circuit breaker.
//!
//! The monitor is the single ingestion point for every error in the
//! application: caught API failures, failures logged through the
//! [`Logger`]'s error level (it registers itself as an error sink), and
//! anything application code captures directly. Its one hard job is to
//! never loop: an error raised while handling an error must not re-enter
//! capture unbounded.
//!
//! Two mechanisms enforce that. Structurally, the monitor's own
//! diagnostics are emitted through [`Logger::internal_error`], which never
//! fans out to sinks, so capture cannot feed on its own output. As a
//! backstop, a processing flag and a depth counter guard the entry: both
//! are checked and set under a single lock acquisition before any
//! downstream call, and restored by an RAII guard on every exit path.

use std::sync::{Arc, Mutex, MutexGuard};

use aubergiste_core::{ErrorRecord, ErrorSink, ErrorStats, Fault};
use chrono::Utc;
use serde_json::{Value, json};

use crate::classify;
use crate::logger::Logger;

/// Maximum nesting depth of capture attempts before the circuit breaker
/// rejects outright.
pub const MAX_CAPTURE_DEPTH: u32 = 5;

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Default)]
struct MonitorState {
    error_count: u64,
    cors_error_count: u64,
    records: Vec<ErrorRecord>,
    processing: bool,
    depth: u32,
    sequence: u64,
}

/// Restores the reentrancy guard on every exit path, including early
/// returns from the degraded branch.
struct CaptureGuard<'a> {
    monitor: &'a ErrorMonitor,
}

impl Drop for CaptureGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.monitor.state.lock() {
            state.processing = false;
            state.depth = state.depth.saturating_sub(1);
        }
    }
}

// ============================================================================
// Error Monitor
// ============================================================================

/// Error aggregation service.
///
/// Explicitly constructed and injected (typically via [`ErrorMonitor::install`]),
/// never a process global: tests build isolated instances.
pub struct ErrorMonitor {
    logger: Arc<Logger>,
    state: Mutex<MonitorState>,
}

impl ErrorMonitor {
    /// Creates a monitor logging through the given logger.
    pub fn new(logger: Arc<Logger>) -> Self {
        Self {
            logger,
            state: Mutex::new(MonitorState::default()),
        }
    }

    /// Creates a monitor and registers it as one of the logger's error
    /// sinks, making it the sink for all error-level emissions.
    pub fn install(logger: &Arc<Logger>) -> Arc<Self> {
        let monitor = Arc::new(Self::new(Arc::clone(logger)));
        logger.add_error_sink(monitor.clone());
        monitor
    }

    /// Registers a process-wide panic hook that captures panics as
    /// errors, chaining the previously installed hook.
    ///
    /// This makes the monitor the sink for unhandled failures outside the
    /// request path as well. The hook holds the monitor alive for the
    /// rest of the process.
    pub fn install_panic_hook(self: &Arc<Self>) {
        let monitor = Arc::clone(self);
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            previous(info);

            let message = info
                .payload()
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| info.payload().downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic with non-string payload".to_string());
            let fault = match info.location() {
                Some(location) => Fault::new("Panic", message).with_stack(location.to_string()),
                None => Fault::new("Panic", message),
            };
            monitor.capture(&fault, "panic");
        }));
    }

    /// Captures an error, returning the new record's id.
    ///
    /// Returns `None` when the circuit breaker rejects the attempt (a
    /// capture is already in flight, or the depth limit is exceeded) or
    /// when the monitoring system itself fails; in both cases no record is
    /// created and the counters are untouched.
    pub fn capture(&self, fault: &Fault, source: &str) -> Option<String> {
        let (id, depth) = {
            let Ok(mut state) = self.state.lock() else {
                eprintln!("Error in error handling system: monitor state lock poisoned");
                return None;
            };

            if state.processing || state.depth > MAX_CAPTURE_DEPTH {
                drop(state);
                tracing::warn!("Error capture circuit breaker triggered, dropping error");
                return None;
            }

            state.processing = true;
            state.depth += 1;
            state.sequence += 1;
            (
                format!("err_{}_{}", Utc::now().timestamp_millis(), state.sequence),
                state.depth,
            )
        };
        let _guard = CaptureGuard { monitor: self };

        match self.store_and_log(fault, source, &id, depth) {
            Ok(()) => Some(id),
            Err(message) => {
                // Degraded path: plain stderr, never back through the
                // sink-bearing logger.
                eprintln!("Error in error handling system: {message}");
                None
            }
        }
    }

    fn store_and_log(
        &self,
        fault: &Fault,
        source: &str,
        id: &str,
        depth: u32,
    ) -> Result<(), String> {
        let is_cors = classify::is_cors_fault(fault);
        let record = ErrorRecord {
            id: id.to_string(),
            message: fault.message.clone(),
            stack: fault.stack.clone(),
            source: source.to_string(),
            timestamp: Utc::now(),
            is_cors_error: is_cors,
            depth,
            internal: fault.internal,
        };

        let cors_error_count = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| "monitor state lock poisoned".to_string())?;
            state.error_count += 1;
            if is_cors {
                state.cors_error_count += 1;
            }
            state.records.push(record);
            state.cors_error_count
        };

        // Logging happens outside the lock; a reentrant capture attempt
        // must hit the guard, not a deadlock.
        if is_cors {
            self.logger.internal_error(
                &format!("CORS ERROR [{id}]: {}", fault.message),
                &json!({
                    "source": source,
                    "status": fault.status,
                    "corsErrorCount": cors_error_count,
                    "headers": Self::diagnostic_headers(),
                    "corsHints": [
                        "Check the server's Access-Control-Allow-Origin header",
                        "Check whether credentials are sent to a wildcard origin",
                        "Check that preflight OPTIONS requests are handled by the server",
                    ],
                }),
            );
        } else {
            self.logger.internal_error(
                &format!("Error captured [{id}]: {}", fault.message),
                &json!({ "source": source, "name": fault.name, "status": fault.status }),
            );
        }

        Ok(())
    }

    /// Header snapshot attached to CORS diagnostics. Authorization
    /// material is not inspectable here and is reported redacted.
    fn diagnostic_headers() -> Value {
        json!({
            "content-type": "application/json",
            "accept": "application/json",
            "authorization": "Bearer [REDACTED]",
        })
    }

    fn state(&self) -> Option<MutexGuard<'_, MonitorState>> {
        self.state.lock().ok()
    }

    /// Returns all captured errors in capture order.
    pub fn all_errors(&self) -> Vec<ErrorRecord> {
        self.state().map(|s| s.records.clone()).unwrap_or_default()
    }

    /// Returns the captured errors classified as CORS.
    pub fn cors_errors(&self) -> Vec<ErrorRecord> {
        self.state()
            .map(|s| {
                s.records
                    .iter()
                    .filter(|r| r.is_cors_error)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Looks up a captured error by id.
    pub fn error_by_id(&self, id: &str) -> Option<ErrorRecord> {
        self.state()
            .and_then(|s| s.records.iter().find(|r| r.id == id).cloned())
    }

    /// Returns aggregate statistics.
    pub fn stats(&self) -> ErrorStats {
        self.state()
            .map(|s| ErrorStats::from_counts(s.error_count, s.cors_error_count))
            .unwrap_or_else(|| ErrorStats::from_counts(0, 0))
    }

    /// Clears all captured errors and counters atomically.
    pub fn clear(&self) {
        if let Some(mut state) = self.state() {
            state.records.clear();
            state.error_count = 0;
            state.cors_error_count = 0;
        }
    }
}

impl ErrorSink for ErrorMonitor {
    fn on_error(&self, fault: &Fault, source: &str) {
        if fault.internal {
            return;
        }
        self.capture(fault, source);
    }
}

impl std::fmt::Debug for ErrorMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorMonitor")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Test hooks
// ============================================================================

#[cfg(test)]
impl ErrorMonitor {
    fn force_processing(&self, processing: bool) {
        self.state.lock().unwrap().processing = processing;
    }

    fn force_depth(&self, depth: u32) {
        self.state.lock().unwrap().depth = depth;
    }

    fn current_depth(&self) -> u32 {
        self.state.lock().unwrap().depth
    }
}

// ============================================================================
// Tests
// ============================================================================
