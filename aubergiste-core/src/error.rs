//! Core error types for the Aubergiste client.

use thiserror::Error;

/// Core error type shared across the Aubergiste crates.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A request descriptor was malformed or not usable in context.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Credential storage failed.
    #[error("Credential error: {0}")]
    Credential(String),

    /// Durable storage failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}
