//! Configuration schema definitions.
//!
//! This module defines the complete boot configuration for a node.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Default node port when none (or a non-positive one) is configured.
pub const DEFAULT_NODE_PORT: u16 = 7777;

/// Root configuration for an RPC node.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NodeBootConfig {
    /// Registry connection settings.
    pub registry: RegistryConfig,

    /// Node identity settings. `None` when the `[node]` section is absent.
    pub node: Option<NodeConfig>,

    /// Suppress publication of local services.
    pub consumer_only: bool,

    /// Remote services this node consumes.
    pub references: Vec<ReferenceConfig>,

    /// Listener configuration for the RPC server.
    pub listener: ListenerConfig,

    /// What to do when a publish call fails mid-boot.
    pub publish: PublishConfig,

    /// Shutdown behavior.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin endpoint settings.
    pub admin: AdminConfig,
}

/// Registry connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry address (e.g., "memory://local").
    pub address: String,
}

/// Node identity configuration as supplied by the operator.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NodeConfig {
    /// Application name advertised to the registry.
    pub application: String,

    /// Advertised IP. Resolved from the host when empty.
    pub ip: String,

    /// Advertised port. Defaults to 7777 when `<= 0`.
    pub port: i64,
}

/// A remote service the node subscribes to.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReferenceConfig {
    /// Fully-qualified service identifier.
    pub service: String,

    /// Requested version (may be empty).
    #[serde(default)]
    pub version: String,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            max_connections: 1024,
        }
    }
}

/// Policy applied when the registry rejects a publish during boot.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PublishFailurePolicy {
    /// Leave local entries in place; nothing is rolled back.
    #[default]
    Retain,
    /// Remove the failing entry and retract everything published earlier in the run.
    Compensate,
}

/// Publish configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PublishConfig {
    pub on_failure: PublishFailurePolicy,
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Call `unregister` on the registry for every published endpoint on stop.
    pub retract_on_stop: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin endpoint.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin endpoint bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml() {
        let config: NodeBootConfig = toml::from_str(
            r#"
            [registry]
            address = "memory://local"

            [node]
            application = "orders"
            "#,
        )
        .unwrap();

        let node = config.node.unwrap();
        assert_eq!(node.application, "orders");
        assert_eq!(node.port, 0);
        assert!(node.ip.is_empty());
        assert!(!config.consumer_only);
        assert_eq!(config.publish.on_failure, PublishFailurePolicy::Retain);
        assert!(!config.shutdown.retract_on_stop);
    }

    #[test]
    fn test_missing_node_section_is_none() {
        let config: NodeBootConfig = toml::from_str(
            r#"
            [registry]
            address = "memory://local"
            "#,
        )
        .unwrap();
        assert!(config.node.is_none());
    }

    #[test]
    fn test_references_and_policies() {
        let config: NodeBootConfig = toml::from_str(
            r#"
            consumer_only = true

            [[references]]
            service = "com.acme.Billing"
            version = "1.0"

            [[references]]
            service = "com.acme.Audit"

            [publish]
            on_failure = "compensate"

            [shutdown]
            retract_on_stop = true
            "#,
        )
        .unwrap();

        assert!(config.consumer_only);
        assert_eq!(config.references.len(), 2);
        assert_eq!(config.references[1].version, "");
        assert_eq!(config.publish.on_failure, PublishFailurePolicy::Compensate);
        assert!(config.shutdown.retract_on_stop);
    }
}
