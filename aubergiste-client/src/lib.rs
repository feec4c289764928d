// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Aubergiste Client
//!
//! The resilient HTTP request layer of the Aubergiste platform.
//!
//! Every backend call the application makes goes through this crate:
//!
//! - [`executor::ApiClient`] issues requests with header injection,
//!   deadlines, response parsing, and classifier-driven retries, always
//!   resolving to a [`aubergiste_core::ResponseEnvelope`]
//! - [`classify`] decides which failures look cross-origin and which are
//!   worth retrying
//! - [`monitor::ErrorMonitor`] aggregates every error in the process,
//!   guarded against capture recursion
//! - [`queue::OfflineRequestQueue`] defers requests while offline and
//!   replays them in order when connectivity returns
//! - [`probe::HealthMonitor`] tracks backend reachability
//!
//! ## Composition
//!
//! Services are explicitly constructed and injected; nothing here is a
//! process global.
//!
//! ```ignore
//! use std::sync::Arc;
//! use aubergiste_client::{ApiClient, ConnectivityMonitor, Logger, OfflineRequestQueue};
//! use aubergiste_store::{FileCredentialStore, FileQueueStore};
//!
//! let logger = Arc::new(Logger::new());
//! let connectivity = ConnectivityMonitor::online();
//!
//! let client = Arc::new(
//!     ApiClient::builder()
//!         .logger(Arc::clone(&logger))
//!         .connectivity(connectivity.clone())
//!         .credentials(Arc::new(FileCredentialStore::at_default_path()))
//!         .build()?,
//! );
//!
//! let queue = Arc::new(OfflineRequestQueue::new(
//!     Arc::new(FileQueueStore::at_default_path()),
//!     Arc::clone(&client) as _,
//!     connectivity,
//!     logger,
//! ));
//! queue.initialize().await?;
//! client.attach_queue(Arc::clone(&queue));
//!
//! let envelope = client.get("https://api.aubergiste.fr/clients").await;
//! ```

pub mod classify;
pub mod connectivity;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod logger;
pub mod monitor;
pub mod probe;
pub mod queue;
pub mod retry;

// Errors
pub use error::ClientError;

// Classification & retry
pub use classify::{is_cors_fault, should_retry};
pub use retry::{MAX_RETRY_ATTEMPTS, RetryPolicy};

// Logging & monitoring
pub use logger::{Environment, Logger};
pub use monitor::{ErrorMonitor, MAX_CAPTURE_DEPTH};

// Execution
pub use executor::{
    API_CORS_SOURCE, ApiClient, ApiClientBuilder, DEFAULT_REQUEST_TIMEOUT, DEFAULT_UPLOAD_TIMEOUT,
    Replayer, parse_api_error,
};

// Connectivity & offline queue
pub use connectivity::ConnectivityMonitor;
pub use queue::{OfflineRequestQueue, ReplayOutcome};

// Health & diagnostics
pub use diagnostics::{CorsProbeResult, CorsReport};
pub use probe::{DEFAULT_HEALTH_CHECK_INTERVAL, HealthMonitor, HealthStatus, check_endpoints};
