//! Node lifecycle controller.
//!
//! Drives boot (validate → connect registry → publish → subscribe → start
//! server) and teardown (drain local registrations). Owns the service
//! directory and registration cache, so several nodes can live in one
//! process.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::validation::validate_config;
use crate::config::{ConfigError, NodeBootConfig, ValidationError};
use crate::directory::{RegistrationCache, ServiceDirectory};
use crate::identity::NodeIdentity;
use crate::lifecycle::shutdown::{drain_registrations, StopReport};
use crate::lifecycle::startup::{publish_services, PublishTargets};
use crate::lifecycle::state::{LifecycleState, StateCell};
use crate::net::server::{NetworkServer, ServerHandle, StartError};
use crate::observability::metrics;
use crate::registry::{RegistryClient, RegistryConnector, RegistryError};
use crate::service::ServiceCatalog;
use crate::subscription::SubscriptionManager;

/// Why `start` or `stop` failed.
#[derive(Debug, Error)]
pub enum BootError {
    /// Missing or invalid configuration; raised before any I/O.
    #[error("configuration error: {0}")]
    Configuration(ConfigError),

    /// Connection, registration or subscription failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Network listener could not start.
    #[error("network server failed to start: {0}")]
    Start(#[from] StartError),

    /// Operation not allowed in the current lifecycle state.
    #[error("cannot {operation} while node is {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },
}

impl From<Vec<ValidationError>> for BootError {
    fn from(errors: Vec<ValidationError>) -> Self {
        BootError::Configuration(ConfigError::Validation(errors))
    }
}

/// Orchestrates a node's boot and teardown.
pub struct NodeController {
    connector: Arc<dyn RegistryConnector>,
    server: Arc<dyn NetworkServer>,
    state: StateCell,
    directory: ServiceDirectory,
    registrations: RegistrationCache,
    identity: ArcSwapOption<NodeIdentity>,
    registry: Mutex<Option<Arc<dyn RegistryClient>>>,
    server_handle: Mutex<Option<ServerHandle>>,
    retract_on_stop: AtomicBool,
}

impl NodeController {
    pub fn new(connector: Arc<dyn RegistryConnector>, server: Arc<dyn NetworkServer>) -> Self {
        Self {
            connector,
            server,
            state: StateCell::new(),
            directory: ServiceDirectory::new(),
            registrations: RegistrationCache::new(),
            identity: ArcSwapOption::empty(),
            registry: Mutex::new(None),
            server_handle: Mutex::new(None),
            retract_on_stop: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state.load()
    }

    /// Identity resolved at boot; `None` until validation succeeds.
    pub fn identity(&self) -> Option<Arc<NodeIdentity>> {
        self.identity.load_full()
    }

    pub fn directory(&self) -> &ServiceDirectory {
        &self.directory
    }

    pub fn registrations(&self) -> &RegistrationCache {
        &self.registrations
    }

    /// Address the network server actually bound, while running.
    pub async fn server_addr(&self) -> Option<SocketAddr> {
        self.server_handle
            .lock()
            .await
            .as_ref()
            .map(ServerHandle::local_addr)
    }

    /// Boot the node. Any error leaves the controller in `Failed`.
    pub async fn start(
        &self,
        config: &NodeBootConfig,
        services: &ServiceCatalog,
    ) -> Result<(), BootError> {
        self.advance(LifecycleState::Validating, "start")?;

        match self.boot(config, services).await {
            Ok(()) => {
                self.advance(LifecycleState::Running, "start")?;
                tracing::info!(
                    services = self.directory.len(),
                    consumer_only = config.consumer_only,
                    "Node running"
                );
                Ok(())
            }
            Err(e) => {
                let _ = self.advance(LifecycleState::Failed, "fail");
                tracing::error!(error = %e, "Node boot failed");
                Err(e)
            }
        }
    }

    async fn boot(&self, config: &NodeBootConfig, services: &ServiceCatalog) -> Result<(), BootError> {
        // 1. validate and resolve identity
        validate_config(config)?;
        let node = config
            .node
            .as_ref()
            .ok_or_else(|| vec![ValidationError::MissingNodeConfig])?;
        let identity = NodeIdentity::resolve(node).map_err(|e| vec![e])?;
        self.identity.store(Some(Arc::new(identity.clone())));
        self.retract_on_stop
            .store(config.shutdown.retract_on_stop, Ordering::Relaxed);

        tracing::info!(
            application = %identity.application,
            endpoint = %identity.endpoint(),
            registry = %config.registry.address,
            "Node identity resolved"
        );

        // 2. registry session
        self.advance(LifecycleState::RegistryConnecting, "start")?;
        let client = match self.connector.connect(&config.registry.address).await {
            Ok(client) => client,
            Err(e) => {
                metrics::record_registry_error("connect");
                return Err(e.into());
            }
        };
        *self.registry.lock().await = Some(client.clone());

        // 3. local services
        self.advance(LifecycleState::PublishingServices, "start")?;
        if config.consumer_only {
            tracing::info!(
                declared = services.len(),
                "Consumer-only node, skipping service publication"
            );
        } else {
            publish_services(
                client.as_ref(),
                &identity,
                services,
                PublishTargets {
                    directory: &self.directory,
                    registrations: &self.registrations,
                },
                config.publish.on_failure,
            )
            .await?;
        }

        // 4. remote references
        self.advance(LifecycleState::SubscribingConsumers, "start")?;
        if !config.references.is_empty() {
            SubscriptionManager::new(client.as_ref(), &identity)
                .subscribe_all(&config.references)
                .await?;
        }

        // 5. network server
        self.advance(LifecycleState::StartingNetworkServer, "start")?;
        let handle = self
            .server
            .start(&identity.ip, identity.port, Arc::new(self.directory.clone()))
            .await?;
        *self.server_handle.lock().await = Some(handle);

        Ok(())
    }

    /// Drain local registrations and stop the network server.
    ///
    /// Registry entries are retracted only when `shutdown.retract_on_stop`
    /// was set at boot.
    pub async fn stop(&self) -> Result<StopReport, BootError> {
        self.advance(LifecycleState::ShuttingDown, "stop")?;

        let retract_with = if self.retract_on_stop.load(Ordering::Relaxed) {
            self.registry.lock().await.clone()
        } else {
            None
        };

        let report =
            drain_registrations(&self.directory, &self.registrations, retract_with.as_deref()).await;

        if let Some(handle) = self.server_handle.lock().await.take() {
            handle.shutdown().await;
        }

        self.advance(LifecycleState::Stopped, "stop")?;
        tracing::info!(
            drained = report.drained,
            retracted = report.retracted,
            retraction_failures = report.retraction_failures,
            "Node stopped"
        );
        Ok(report)
    }

    fn advance(&self, next: LifecycleState, operation: &'static str) -> Result<(), BootError> {
        match self.state.transition(next) {
            Ok(from) => {
                metrics::record_lifecycle_state(next as u8);
                tracing::debug!(from = %from, to = %next, "Lifecycle transition");
                Ok(())
            }
            Err(state) => Err(BootError::InvalidState { operation, state }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use crate::net::server::TcpRpcServer;
    use crate::registry::MemoryRegistry;
    use crate::service::PingService;

    fn config(port: i64) -> NodeBootConfig {
        let mut config = NodeBootConfig::default();
        config.registry.address = "memory://test".into();
        config.node = Some(NodeConfig {
            application: "unit".into(),
            ip: "127.0.0.1".into(),
            port,
        });
        config
    }

    fn controller(registry: &MemoryRegistry) -> NodeController {
        NodeController::new(
            Arc::new(registry.clone()),
            Arc::new(TcpRpcServer::default()),
        )
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let registry = MemoryRegistry::new();
        let node = controller(&registry);
        let services = ServiceCatalog::new().register("xrpc.Ping", "", Arc::new(PingService));

        node.start(&config(38_101), &services).await.unwrap();
        assert_eq!(node.state(), LifecycleState::Running);
        assert_eq!(node.server_addr().await.unwrap().port(), 38_101);
        assert_eq!(registry.providers("xrpc.Ping").len(), 1);

        let report = node.stop().await.unwrap();
        assert_eq!(report.drained, 1);
        assert_eq!(node.state(), LifecycleState::Stopped);
        assert!(node.server_addr().await.is_none());
        // retraction is opt-in
        assert_eq!(registry.providers("xrpc.Ping").len(), 1);
    }

    #[tokio::test]
    async fn test_second_start_rejected() {
        let registry = MemoryRegistry::new();
        let node = controller(&registry);
        let mut bad = config(0);
        bad.registry.address.clear();

        assert!(node.start(&bad, &ServiceCatalog::new()).await.is_err());
        assert_eq!(node.state(), LifecycleState::Failed);

        let err = node.start(&config(0), &ServiceCatalog::new()).await.unwrap_err();
        assert!(matches!(
            err,
            BootError::InvalidState {
                state: LifecycleState::Failed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_stop_before_start_rejected() {
        let node = controller(&MemoryRegistry::new());
        let err = node.stop().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot stop while node is uninitialized"
        );
    }
}
