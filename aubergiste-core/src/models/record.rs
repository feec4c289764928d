//! Captured error records and statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A captured error, stored by the error monitor.
///
/// Records are immutable after creation and live until an explicit clear.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Unique generated id, e.g. `err_1714406400123_42`.
    pub id: String,
    /// Error message.
    pub message: String,
    /// Rendered source chain, when one was available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Origin tag, e.g. `api_cors`, `logger`, `runtime`.
    pub source: String,
    /// Capture time.
    pub timestamp: DateTime<Utc>,
    /// Classified as a cross-origin failure.
    pub is_cors_error: bool,
    /// Capture recursion depth at the time of creation.
    pub depth: u32,
    /// Produced by the monitoring system itself.
    pub internal: bool,
}

/// Aggregate error statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorStats {
    /// Total captured errors.
    pub total_errors: u64,
    /// Captured errors classified as CORS.
    pub cors_errors: u64,
    /// CORS share of all captured errors, in percent. 0.0 when nothing has
    /// been captured.
    pub percentage: f64,
}

impl ErrorStats {
    /// Computes stats from raw counters, guarding the empty case.
    pub fn from_counts(total_errors: u64, cors_errors: u64) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let percentage = if total_errors == 0 {
            0.0
        } else {
            cors_errors as f64 / total_errors as f64 * 100.0
        };
        Self {
            total_errors,
            cors_errors,
            percentage,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
