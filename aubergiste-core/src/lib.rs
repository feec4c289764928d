// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Aubergiste Core
//!
//! Core types, models, and traits for the Aubergiste client workspace.
//!
//! This crate provides the foundational abstractions used across the other
//! Aubergiste crates, including:
//!
//! - Request/response models ([`RequestDescriptor`], [`ResponseEnvelope`])
//! - The normalized failure shape ([`Fault`]) consumed by classification
//!   and monitoring
//! - Captured error records and statistics ([`ErrorRecord`], [`ErrorStats`])
//! - The persisted offline queue entry ([`QueuedRequest`])
//! - Service traits for credential storage, error observation, and queue
//!   persistence
//!
//! Nothing in this crate performs I/O; it is the shared vocabulary of the
//! client, store, and CLI crates.

pub mod error;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::CoreError;

// Re-export models
pub use models::envelope::ResponseEnvelope;
pub use models::fault::Fault;
pub use models::queued::QueuedRequest;
pub use models::record::{ErrorRecord, ErrorStats};
pub use models::request::{
    FilePart, FormPayload, Method, RequestBody, RequestDescriptor, RequestDescriptorBuilder,
};

// Re-export traits
pub use traits::{CredentialStore, ErrorSink, QueueStore};
