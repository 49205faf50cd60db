//! In-process registry.
//!
//! Serves `memory://` addresses. Several nodes in one process can share a
//! single `MemoryRegistry` (it is cheap to clone) and see each other's
//! publications.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use url::Url;

use crate::registry::{
    ConsumerSubscription, RegistryClient, RegistryConnector, RegistryError, ServiceEndpoint,
};

pub const MEMORY_SCHEME: &str = "memory";

/// A thread-safe registry held entirely in memory.
#[derive(Clone, Default)]
pub struct MemoryRegistry {
    /// service → endpoints of every node providing it.
    providers: Arc<DashMap<String, Vec<ServiceEndpoint>>>,
    /// service → nodes subscribed to it.
    subscribers: Arc<DashMap<String, Vec<ConsumerSubscription>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Endpoints currently published for a service.
    pub fn providers(&self, service: &str) -> Vec<ServiceEndpoint> {
        self.providers
            .get(service)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// Subscriptions recorded for a service.
    pub fn subscribers(&self, service: &str) -> Vec<ConsumerSubscription> {
        self.subscribers
            .get(service)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// Number of services with at least one provider.
    pub fn service_count(&self) -> usize {
        self.providers.iter().filter(|r| !r.value().is_empty()).count()
    }
}

fn same_node(a: &ServiceEndpoint, b: &ServiceEndpoint) -> bool {
    a.ip() == b.ip() && a.port() == b.port()
}

#[async_trait]
impl RegistryConnector for MemoryRegistry {
    async fn connect(&self, address: &str) -> Result<Arc<dyn RegistryClient>, RegistryError> {
        let url = Url::parse(address).map_err(|e| RegistryError::Connection {
            address: address.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() != MEMORY_SCHEME {
            return Err(RegistryError::Connection {
                address: address.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        tracing::debug!(address = %address, "Connected to in-memory registry");
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl RegistryClient for MemoryRegistry {
    async fn publish(&self, endpoint: &ServiceEndpoint) -> Result<(), RegistryError> {
        let mut entry = self.providers.entry(endpoint.service.clone()).or_default();
        entry.retain(|existing| !same_node(existing, endpoint));
        entry.push(endpoint.clone());
        Ok(())
    }

    async fn subscribe(&self, subscription: &ConsumerSubscription) -> Result<(), RegistryError> {
        self.subscribers
            .entry(subscription.service.clone())
            .or_default()
            .push(subscription.clone());
        Ok(())
    }

    async fn unregister(&self, endpoint: &ServiceEndpoint) -> Result<(), RegistryError> {
        if let Some(mut entry) = self.providers.get_mut(&endpoint.service) {
            entry.retain(|existing| !same_node(existing, endpoint));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::NodeIdentity;

    fn identity(port: u16) -> NodeIdentity {
        NodeIdentity {
            application: "app".into(),
            ip: "127.0.0.1".into(),
            port,
        }
    }

    #[tokio::test]
    async fn test_connect_rejects_other_schemes() {
        let registry = MemoryRegistry::new();
        assert!(registry.connect("memory://local").await.is_ok());

        let err = registry.connect("zk://10.0.0.1:2181").await.err().unwrap();
        assert!(matches!(err, RegistryError::Connection { .. }));

        let err = registry.connect("not a url").await.err().unwrap();
        assert!(matches!(err, RegistryError::Connection { .. }));
    }

    #[tokio::test]
    async fn test_publish_is_idempotent_per_node() {
        let registry = MemoryRegistry::new();
        let a = ServiceEndpoint::for_node("svc", "1", &identity(7001));
        let b = ServiceEndpoint::for_node("svc", "1", &identity(7002));

        registry.publish(&a).await.unwrap();
        registry.publish(&a).await.unwrap();
        registry.publish(&b).await.unwrap();
        assert_eq!(registry.providers("svc").len(), 2);

        registry.unregister(&a).await.unwrap();
        assert_eq!(registry.providers("svc"), vec![b]);
    }

    #[tokio::test]
    async fn test_unregister_unknown_is_noop() {
        let registry = MemoryRegistry::new();
        let a = ServiceEndpoint::for_node("svc", "1", &identity(7001));
        registry.unregister(&a).await.unwrap();
        assert_eq!(registry.service_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_records() {
        let registry = MemoryRegistry::new();
        let sub = ConsumerSubscription::for_node("remote.Svc", "1", &identity(7001));
        registry.subscribe(&sub).await.unwrap();
        assert_eq!(registry.subscribers("remote.Svc"), vec![sub]);
    }
}
