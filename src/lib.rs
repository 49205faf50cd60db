//! RPC mesh node: boot/teardown orchestration, local service directory,
//! registry publication and inbound call dispatch.

pub mod admin;
pub mod config;
pub mod directory;
pub mod identity;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod registry;
pub mod service;
pub mod subscription;

pub use config::schema::NodeBootConfig;
pub use identity::NodeIdentity;
pub use lifecycle::{BootError, LifecycleState, NodeController, StopReport};
pub use service::{ServiceCatalog, ServiceHandler};
