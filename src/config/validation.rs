//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Require a registry address and a node section
//! - Validate value ranges (port fits in u16, max_connections > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: NodeBootConfig → Result<(), Vec<ValidationError>>
//! - Runs before any registry or network I/O

use thiserror::Error;

use crate::config::schema::NodeBootConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("registry address must not be empty")]
    MissingRegistryAddress,

    #[error("node configuration is missing")]
    MissingNodeConfig,

    #[error("node port {0} is out of range")]
    PortOutOfRange(i64),

    #[error("reference #{0} has an empty service identifier")]
    EmptyReference(usize),

    #[error("listener max_connections must be greater than zero")]
    MaxConnectionsZero,
}

/// Validate a boot configuration.
pub fn validate_config(config: &NodeBootConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.registry.address.trim().is_empty() {
        errors.push(ValidationError::MissingRegistryAddress);
    }

    match &config.node {
        None => errors.push(ValidationError::MissingNodeConfig),
        Some(node) => {
            if node.port > i64::from(u16::MAX) {
                errors.push(ValidationError::PortOutOfRange(node.port));
            }
        }
    }

    for (i, reference) in config.references.iter().enumerate() {
        if reference.service.trim().is_empty() {
            errors.push(ValidationError::EmptyReference(i));
        }
    }

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::MaxConnectionsZero);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
