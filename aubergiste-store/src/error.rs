//! Store error types.

use aubergiste_core::CoreError;
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Keychain access failed.
    #[error("Keychain error: {0}")]
    Keychain(String),

    /// Stored state was malformed.
    #[error("Corrupt state: {0}")]
    Corrupt(String),
}

impl From<keyring::Error> for StoreError {
    fn from(err: keyring::Error) -> Self {
        StoreError::Keychain(err.to_string())
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io(e) => CoreError::Io(e),
            StoreError::Serialization(e) => CoreError::Serialization(e),
            StoreError::Keychain(msg) => CoreError::Credential(msg),
            StoreError::Corrupt(msg) => CoreError::Storage(msg),
        }
    }
}
