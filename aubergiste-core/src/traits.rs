//! Service traits for the Aubergiste client.
//!
//! These are the injection seams of the workspace: the client crate
//! consumes them, the store crate implements the durable ones, and tests
//! substitute in-memory fakes.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::fault::Fault;
use crate::models::queued::QueuedRequest;

/// Durable storage for the bearer token.
///
/// Implementations track an expiry timestamp alongside the token and treat
/// an expired token as absent; the request executor never sees stale
/// credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the current token, or `None` when missing or expired.
    async fn token(&self) -> Result<Option<String>, CoreError>;

    /// Stores a token, with an optional time-to-live.
    async fn set_token(&self, token: &str, ttl: Option<Duration>) -> Result<(), CoreError>;

    /// Removes the token and its expiry.
    async fn clear_token(&self) -> Result<(), CoreError>;

    /// Returns true when a non-expired token is present.
    async fn has_valid_token(&self) -> bool {
        matches!(self.token().await, Ok(Some(_)))
    }
}

/// Observer of error-level log emissions.
///
/// The logger fans every error-level record out to its registered sinks.
/// This replaces interception-by-monkey-patch: the error monitor registers
/// itself as a sink, and faults tagged `internal` are skipped structurally
/// instead of by message matching.
pub trait ErrorSink: Send + Sync {
    /// Called for every non-internal error-level emission.
    fn on_error(&self, fault: &Fault, source: &str);
}

/// Durable storage for the offline request queue.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Loads the persisted queue, oldest first.
    async fn load(&self) -> Result<Vec<QueuedRequest>, CoreError>;

    /// Persists the full queue state, replacing what was stored.
    async fn save(&self, items: &[QueuedRequest]) -> Result<(), CoreError>;
}
