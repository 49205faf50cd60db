//! Local registration cache: service id → endpoint published for it.

use std::sync::Arc;

use dashmap::DashMap;

use crate::registry::ServiceEndpoint;

/// Record of what this node has published, used to drive shutdown.
#[derive(Clone, Default)]
pub struct RegistrationCache {
    inner: Arc<DashMap<String, ServiceEndpoint>>,
}

impl RegistrationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the endpoint recorded for its service.
    pub fn put(&self, endpoint: ServiceEndpoint) {
        self.inner.insert(endpoint.service.clone(), endpoint);
    }

    /// Remove `service`. Absent keys are a no-op.
    pub fn remove(&self, service: &str) -> Option<ServiceEndpoint> {
        self.inner.remove(service).map(|(_, endpoint)| endpoint)
    }

    pub fn get(&self, service: &str) -> Option<ServiceEndpoint> {
        self.inner.get(service).map(|r| r.value().clone())
    }

    pub fn contains(&self, service: &str) -> bool {
        self.inner.contains_key(service)
    }

    /// Owned snapshot, safe to iterate while removing from the cache.
    pub fn entries(&self) -> Vec<ServiceEndpoint> {
        self.inner.iter().map(|r| r.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
