//! Client error types.
//!
//! This taxonomy is internal plumbing: the request executor converts every
//! member into a [`aubergiste_core::ResponseEnvelope`] before anything
//! reaches a caller. It surfaces directly only at diagnostic boundaries
//! (CORS probe, CLI).

use aubergiste_core::CoreError;
use thiserror::Error;

/// Error type for client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request exceeded its deadline.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Heuristically detected cross-origin failure.
    #[error("Cross-origin request blocked: {0}")]
    Cors(String),

    /// Transport-level failure (DNS, connection refused, TLS).
    #[error("Network error: {0}")]
    Network(String),

    /// Server-side failure (5xx).
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status.
        status: u16,
        /// Server-provided message.
        message: String,
    },

    /// Client-side failure (4xx). Never retried.
    #[error("Client error ({status}): {message}")]
    Client {
        /// HTTP status.
        status: u16,
        /// Server-provided message.
        message: String,
    },

    /// Malformed response body.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Failure inside the error-handling system itself. Degrades to a
    /// plain stderr message at the monitor boundary; never propagates
    /// into application code.
    #[error("Error monitoring failure: {0}")]
    InternalMonitoring(String),

    /// HTTP client construction or protocol error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Core/storage error.
    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}
