//! Service directory: service id → local handler.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

use crate::service::ServiceHandler;

/// Lookup failure seen by the dispatch path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("no handler for service '{service}' (version '{version}')")]
    NotFound { service: String, version: String },
}

/// Read contract the network server dispatches against.
pub trait DirectoryLookup: Send + Sync {
    fn lookup(&self, service: &str, version: &str) -> Result<Arc<dyn ServiceHandler>, LookupError>;
}

/// A registered handler and the version it was declared with.
#[derive(Clone)]
pub struct DirectoryEntry {
    pub version: String,
    pub handler: Arc<dyn ServiceHandler>,
}

impl fmt::Debug for DirectoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryEntry")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Concurrent table of local handlers.
///
/// At most one handler per service id; a later `put` overwrites.
#[derive(Clone, Default)]
pub struct ServiceDirectory {
    inner: Arc<DashMap<String, DirectoryEntry>>,
}

impl ServiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the handler for `service`.
    pub fn put(&self, service: &str, version: &str, handler: Arc<dyn ServiceHandler>) {
        let previous = self.inner.insert(
            service.to_string(),
            DirectoryEntry {
                version: version.to_string(),
                handler,
            },
        );
        if let Some(previous) = previous {
            tracing::debug!(
                service = %service,
                previous_version = %previous.version,
                version = %version,
                "Directory entry overwritten"
            );
        }
    }

    /// Remove `service`. Absent keys are a no-op.
    pub fn remove(&self, service: &str) -> Option<DirectoryEntry> {
        self.inner.remove(service).map(|(_, entry)| entry)
    }

    pub fn get(&self, service: &str) -> Option<DirectoryEntry> {
        self.inner.get(service).map(|r| r.value().clone())
    }

    pub fn contains(&self, service: &str) -> bool {
        self.inner.contains_key(service)
    }

    /// Snapshot of `(service, version)` pairs.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.inner
            .iter()
            .map(|r| (r.key().clone(), r.value().version.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl DirectoryLookup for ServiceDirectory {
    fn lookup(&self, service: &str, version: &str) -> Result<Arc<dyn ServiceHandler>, LookupError> {
        let not_found = || LookupError::NotFound {
            service: service.to_string(),
            version: version.to_string(),
        };

        let entry = self.inner.get(service).ok_or_else(not_found)?;
        let registered = entry.value().version.as_str();
        if !version.is_empty() && !registered.is_empty() && version != registered {
            return Err(not_found());
        }
        Ok(entry.value().handler.clone())
    }
}
