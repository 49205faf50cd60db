//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → NodeBootConfig (validated, immutable)
//!     → handed to NodeController::start
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the node has booted
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use schema::{
    AdminConfig, ListenerConfig, NodeBootConfig, NodeConfig, ObservabilityConfig,
    PublishFailurePolicy, ReferenceConfig, RegistryConfig,
};
pub use validation::ValidationError;
