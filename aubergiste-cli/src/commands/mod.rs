//! CLI commands.

pub mod cors;
pub mod health;
pub mod queue;
pub mod request;

use std::sync::Arc;

use anyhow::Result;
use aubergiste_client::{ApiClient, Logger};
use aubergiste_core::CredentialStore;
use aubergiste_store::{FileCredentialStore, SystemKeychainStore};

use crate::Cli;

/// Builds the API client shared by the network commands.
pub fn build_client(cli: &Cli) -> Result<Arc<ApiClient>> {
    let credentials: Arc<dyn CredentialStore> = if cli.keychain {
        Arc::new(SystemKeychainStore::new())
    } else {
        Arc::new(FileCredentialStore::at_default_path())
    };

    let client = ApiClient::builder()
        .logger(Arc::new(Logger::new()))
        .credentials(credentials)
        .build()?;

    Ok(Arc::new(client))
}
