//! Descriptors exchanged with the registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identity::NodeIdentity;

pub const ATTR_APPLICATION: &str = "application";
pub const ATTR_IP: &str = "ip";
pub const ATTR_PORT: &str = "port";

fn node_attrs(identity: &NodeIdentity) -> BTreeMap<String, Value> {
    let mut attrs = BTreeMap::new();
    attrs.insert(ATTR_APPLICATION.to_string(), Value::from(identity.application.clone()));
    attrs.insert(ATTR_IP.to_string(), Value::from(identity.ip.clone()));
    attrs.insert(ATTR_PORT.to_string(), Value::from(identity.port));
    attrs
}

/// A locally-implemented service as published to the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub service: String,
    pub version: String,
    pub attrs: BTreeMap<String, Value>,
}

impl ServiceEndpoint {
    /// Build the endpoint for a service hosted by `identity`.
    pub fn for_node(service: &str, version: &str, identity: &NodeIdentity) -> Self {
        Self {
            service: service.to_string(),
            version: version.to_string(),
            attrs: node_attrs(identity),
        }
    }

    pub fn key(&self) -> &str {
        &self.service
    }

    pub fn ip(&self) -> Option<&str> {
        self.attrs.get(ATTR_IP).and_then(Value::as_str)
    }

    pub fn port(&self) -> Option<u16> {
        self.attrs
            .get(ATTR_PORT)
            .and_then(Value::as_u64)
            .and_then(|p| u16::try_from(p).ok())
    }
}

/// A remote service this node intends to consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerSubscription {
    pub service: String,
    pub version: String,
    pub attrs: BTreeMap<String, Value>,
}

impl ConsumerSubscription {
    pub fn for_node(service: &str, version: &str, identity: &NodeIdentity) -> Self {
        Self {
            service: service.to_string(),
            version: version.to_string(),
            attrs: node_attrs(identity),
        }
    }
}
