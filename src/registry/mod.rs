//! Registry client contract.
//!
//! # Data Flow
//! ```text
//! NodeController::start
//!     → RegistryConnector::connect(address)  (once, before any publish)
//!     → RegistryClient::publish(endpoint)     (per local service)
//!     → RegistryClient::subscribe(reference)  (per consumer declaration)
//!
//! NodeController::stop (retract_on_stop = true only)
//!     → RegistryClient::unregister(endpoint)
//! ```
//!
//! # Design Decisions
//! - The controller never retries; retry policy belongs to the client
//! - `memory://` addresses are served by the in-process `MemoryRegistry`

pub mod descriptor;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use descriptor::{ConsumerSubscription, ServiceEndpoint};
pub use memory::MemoryRegistry;

/// Errors reported by the registry collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Registry unreachable or address unusable.
    #[error("registry connection to '{address}' failed: {reason}")]
    Connection { address: String, reason: String },

    /// Registry rejected a publish or unregister.
    #[error("registration of '{service}' failed: {reason}")]
    Registration { service: String, reason: String },

    /// Registry rejected a subscribe.
    #[error("subscription to '{service}' failed: {reason}")]
    Subscription { service: String, reason: String },
}

/// A connected registry session.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn publish(&self, endpoint: &ServiceEndpoint) -> Result<(), RegistryError>;

    async fn subscribe(&self, subscription: &ConsumerSubscription) -> Result<(), RegistryError>;

    async fn unregister(&self, endpoint: &ServiceEndpoint) -> Result<(), RegistryError>;
}

/// Opens registry sessions.
#[async_trait]
pub trait RegistryConnector: Send + Sync {
    async fn connect(&self, address: &str) -> Result<Arc<dyn RegistryClient>, RegistryError>;
}
