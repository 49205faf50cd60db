//! Shutdown coordination for the node.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::directory::{RegistrationCache, ServiceDirectory};
use crate::observability::metrics;
use crate::registry::RegistryClient;

/// One-shot stop signal fanned out to the accept loop, every connection
/// task and the admin server.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal. Tasks that subscribe afterwards will not see it.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Tasks still listening for the signal.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of draining the local tables on stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StopReport {
    /// Entries removed from both tables.
    pub drained: usize,
    /// Endpoints the registry acknowledged as unregistered.
    pub retracted: usize,
    /// Endpoints the registry refused to unregister.
    pub retraction_failures: usize,
}

/// Remove every cached registration from both tables.
///
/// With `retract_with` set, each endpoint is unregistered first; a refusal is
/// logged and counted but the entry is still drained.
pub async fn drain_registrations(
    directory: &ServiceDirectory,
    registrations: &RegistrationCache,
    retract_with: Option<&dyn RegistryClient>,
) -> StopReport {
    let mut report = StopReport::default();

    for endpoint in registrations.entries() {
        if let Some(client) = retract_with {
            match client.unregister(&endpoint).await {
                Ok(()) => {
                    report.retracted += 1;
                    tracing::info!(service = %endpoint.service, "Service retracted");
                }
                Err(e) => {
                    report.retraction_failures += 1;
                    metrics::record_registry_error("unregister");
                    tracing::warn!(service = %endpoint.service, error = %e, "Retraction failed");
                }
            }
        }

        directory.remove(endpoint.key());
        registrations.remove(endpoint.key());
        report.drained += 1;
    }

    metrics::record_directory_size(directory.len());
    report
}
