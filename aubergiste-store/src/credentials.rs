//! Credential storage with expiry tracking.
//!
//! The request executor reads a bearer token before every call; these
//! stores own the token and its expiry timestamp, and report an expired
//! token as absent so stale credentials never reach the wire.
//!
//! Two durable implementations are provided: a JSON file under the config
//! directory (headless environments, tests) and the system keychain
//! (macOS Keychain, Windows Credential Manager, Linux Secret Service).

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use aubergiste_core::{CoreError, CredentialStore};
use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::persistence::{default_credentials_path, load_json_or_default, save_json};

/// Keychain service name for Aubergiste credentials.
const KEYCHAIN_SERVICE: &str = "aubergiste";

/// Account name under which the bearer token is stored.
const TOKEN_ACCOUNT: &str = "token";

/// Account name under which the token expiry is stored.
const TOKEN_EXPIRY_ACCOUNT: &str = "token_expires_at";

// ============================================================================
// Stored Shape
// ============================================================================

/// The persisted credential record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredCredentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_expires_at: Option<DateTime<Utc>>,
}

impl StoredCredentials {
    fn is_expired(&self) -> bool {
        matches!(self.token_expires_at, Some(at) if Utc::now() > at)
    }
}

fn expiry_from_ttl(ttl: Option<Duration>) -> Result<Option<DateTime<Utc>>, CoreError> {
    match ttl {
        None => Ok(None),
        Some(ttl) => {
            let ttl = chrono::Duration::from_std(ttl)
                .map_err(|e| CoreError::Credential(format!("TTL out of range: {e}")))?;
            Ok(Some(Utc::now() + ttl))
        }
    }
}

// ============================================================================
// File Credential Store
// ============================================================================

/// Credential store backed by a JSON file under the config directory.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store reading and writing the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at the default credentials path.
    pub fn at_default_path() -> Self {
        Self::new(default_credentials_path())
    }

    async fn write(&self, credentials: &StoredCredentials) -> Result<(), StoreError> {
        save_json(&self.path, credentials).await
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn token(&self) -> Result<Option<String>, CoreError> {
        let credentials: StoredCredentials = load_json_or_default(&self.path).await;

        if credentials.token.is_some() && credentials.is_expired() {
            debug!("Stored token is expired, clearing");
            self.write(&StoredCredentials::default())
                .await
                .map_err(CoreError::from)?;
            return Ok(None);
        }

        Ok(credentials.token)
    }

    async fn set_token(&self, token: &str, ttl: Option<Duration>) -> Result<(), CoreError> {
        let credentials = StoredCredentials {
            token: Some(token.to_string()),
            token_expires_at: expiry_from_ttl(ttl)?,
        };
        self.write(&credentials).await.map_err(CoreError::from)
    }

    async fn clear_token(&self) -> Result<(), CoreError> {
        self.write(&StoredCredentials::default())
            .await
            .map_err(CoreError::from)
    }
}

// ============================================================================
// System Keychain Store
// ============================================================================

/// Credential store backed by the system keychain.
#[derive(Debug, Clone, Default)]
pub struct SystemKeychainStore;

impl SystemKeychainStore {
    /// Creates a new system keychain store.
    pub fn new() -> Self {
        Self
    }

    fn entry(account: &str) -> Result<Entry, StoreError> {
        Entry::new(KEYCHAIN_SERVICE, account).map_err(StoreError::from)
    }

    fn read(account: &str) -> Result<Option<String>, StoreError> {
        match Self::entry(account)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(account: &str) -> Result<(), StoreError> {
        match Self::entry(account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CredentialStore for SystemKeychainStore {
    async fn token(&self) -> Result<Option<String>, CoreError> {
        let Some(token) = Self::read(TOKEN_ACCOUNT)? else {
            return Ok(None);
        };

        if let Some(raw_expiry) = Self::read(TOKEN_EXPIRY_ACCOUNT)? {
            match DateTime::parse_from_rfc3339(&raw_expiry) {
                Ok(at) if Utc::now() > at => {
                    debug!("Keychain token is expired, clearing");
                    self.clear_token().await?;
                    return Ok(None);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Unreadable token expiry in keychain, treating token as absent");
                    return Ok(None);
                }
            }
        }

        Ok(Some(token))
    }

    async fn set_token(&self, token: &str, ttl: Option<Duration>) -> Result<(), CoreError> {
        Self::entry(TOKEN_ACCOUNT)?
            .set_password(token)
            .map_err(StoreError::from)?;

        match expiry_from_ttl(ttl)? {
            Some(at) => Self::entry(TOKEN_EXPIRY_ACCOUNT)?
                .set_password(&at.to_rfc3339())
                .map_err(StoreError::from)?,
            None => Self::delete(TOKEN_EXPIRY_ACCOUNT)?,
        }

        Ok(())
    }

    async fn clear_token(&self) -> Result<(), CoreError> {
        Self::delete(TOKEN_ACCOUNT)?;
        Self::delete(TOKEN_EXPIRY_ACCOUNT)?;
        Ok(())
    }
}

// ============================================================================
// Memory Credential Store
// ============================================================================

/// In-memory credential store for tests and short-lived tools.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<StoredCredentials>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-loaded with a token that never expires.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(StoredCredentials {
                token: Some(token.into()),
                token_expires_at: None,
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoredCredentials>, CoreError> {
        self.inner
            .lock()
            .map_err(|_| CoreError::Credential("credential store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn token(&self) -> Result<Option<String>, CoreError> {
        let mut credentials = self.lock()?;
        if credentials.token.is_some() && credentials.is_expired() {
            *credentials = StoredCredentials::default();
            return Ok(None);
        }
        Ok(credentials.token.clone())
    }

    async fn set_token(&self, token: &str, ttl: Option<Duration>) -> Result<(), CoreError> {
        let expiry = expiry_from_ttl(ttl)?;
        let mut credentials = self.lock()?;
        *credentials = StoredCredentials {
            token: Some(token.to_string()),
            token_expires_at: expiry,
        };
        Ok(())
    }

    async fn clear_token(&self) -> Result<(), CoreError> {
        *self.lock()? = StoredCredentials::default();
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
