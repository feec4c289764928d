// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Aubergiste Store
//!
//! Durable state for the Aubergiste client.
//!
//! This crate provides:
//!
//! - **Persistence**: atomic JSON file I/O with restrictive permissions
//! - **Credential stores**: file-backed and system-keychain
//!   implementations of [`aubergiste_core::CredentialStore`], both with
//!   expiry tracking
//! - **Queue storage**: the persisted rendering of the offline request
//!   queue (`pending_requests.json`)
//!
//! ## Usage
//!
//! ```ignore
//! use aubergiste_store::{FileCredentialStore, FileQueueStore};
//!
//! let credentials = FileCredentialStore::at_default_path();
//! credentials.set_token("jwt...", Some(Duration::from_secs(3600))).await?;
//!
//! let queue_store = FileQueueStore::at_default_path();
//! let pending = queue_store.load().await?;
//! ```

pub mod credentials;
pub mod error;
pub mod persistence;
pub mod queue_store;

pub use credentials::{FileCredentialStore, MemoryCredentialStore, SystemKeychainStore};
pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_credentials_path, default_queue_path, load_json,
    load_json_or_default, save_json,
};
pub use queue_store::{FileQueueStore, MemoryQueueStore};
