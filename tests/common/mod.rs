//! Shared fakes for integration tests.
#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use xrpc_node::config::{NodeBootConfig, NodeConfig, ReferenceConfig};
use xrpc_node::directory::DirectoryLookup;
use xrpc_node::lifecycle::Shutdown;
use xrpc_node::net::connection::ConnectionTracker;
use xrpc_node::net::{NetworkServer, ServerHandle, StartError};
use xrpc_node::registry::{
    ConsumerSubscription, RegistryClient, RegistryConnector, RegistryError, ServiceEndpoint,
};
use xrpc_node::service::{HandlerError, ServiceHandler};

/// Every interaction with the registry, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    Connect(String),
    Publish(String),
    Subscribe(String),
    Unregister(String),
}

#[derive(Default)]
struct RegistryInner {
    calls: Mutex<Vec<RegistryCall>>,
    published: Mutex<Vec<ServiceEndpoint>>,
    fail_connect: bool,
    fail_publish: Option<String>,
    fail_subscribe: Option<String>,
    fail_unregister: bool,
}

/// Registry fake that records calls and fails on demand.
#[derive(Clone, Default)]
pub struct RecordingRegistry {
    inner: Arc<RegistryInner>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_connect() -> Self {
        Self::with(|i| i.fail_connect = true)
    }

    pub fn failing_publish(service: &str) -> Self {
        let service = service.to_string();
        Self::with(move |i| i.fail_publish = Some(service))
    }

    pub fn failing_subscribe(service: &str) -> Self {
        let service = service.to_string();
        Self::with(move |i| i.fail_subscribe = Some(service))
    }

    pub fn failing_unregister() -> Self {
        Self::with(|i| i.fail_unregister = true)
    }

    fn with(f: impl FnOnce(&mut RegistryInner)) -> Self {
        let mut inner = RegistryInner::default();
        f(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn calls(&self) -> Vec<RegistryCall> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<ServiceEndpoint> {
        self.inner.published.lock().unwrap().clone()
    }

    pub fn publish_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RegistryCall::Publish(_)))
            .count()
    }

    pub fn subscribe_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RegistryCall::Subscribe(_)))
            .count()
    }

    fn record(&self, call: RegistryCall) {
        self.inner.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RegistryConnector for RecordingRegistry {
    async fn connect(&self, address: &str) -> Result<Arc<dyn RegistryClient>, RegistryError> {
        self.record(RegistryCall::Connect(address.to_string()));
        if self.inner.fail_connect {
            return Err(RegistryError::Connection {
                address: address.to_string(),
                reason: "connection refused".into(),
            });
        }
        Ok(Arc::new(self.clone()))
    }
}

#[async_trait]
impl RegistryClient for RecordingRegistry {
    async fn publish(&self, endpoint: &ServiceEndpoint) -> Result<(), RegistryError> {
        self.record(RegistryCall::Publish(endpoint.service.clone()));
        if self.inner.fail_publish.as_deref() == Some(endpoint.service.as_str()) {
            return Err(RegistryError::Registration {
                service: endpoint.service.clone(),
                reason: "node exists".into(),
            });
        }
        self.inner.published.lock().unwrap().push(endpoint.clone());
        Ok(())
    }

    async fn subscribe(&self, subscription: &ConsumerSubscription) -> Result<(), RegistryError> {
        self.record(RegistryCall::Subscribe(subscription.service.clone()));
        if self.inner.fail_subscribe.as_deref() == Some(subscription.service.as_str()) {
            return Err(RegistryError::Subscription {
                service: subscription.service.clone(),
                reason: "no such path".into(),
            });
        }
        Ok(())
    }

    async fn unregister(&self, endpoint: &ServiceEndpoint) -> Result<(), RegistryError> {
        self.record(RegistryCall::Unregister(endpoint.service.clone()));
        if self.inner.fail_unregister {
            return Err(RegistryError::Registration {
                service: endpoint.service.clone(),
                reason: "session expired".into(),
            });
        }
        Ok(())
    }
}

/// Network server fake: records the bind request and keeps the lookup.
#[derive(Clone, Default)]
pub struct RecordingServer {
    started: Arc<Mutex<Vec<(String, u16)>>>,
    lookup: Arc<Mutex<Option<Arc<dyn DirectoryLookup>>>>,
    fail: bool,
}

impl RecordingServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn starts(&self) -> Vec<(String, u16)> {
        self.started.lock().unwrap().clone()
    }

    pub fn lookup(&self) -> Option<Arc<dyn DirectoryLookup>> {
        self.lookup.lock().unwrap().clone()
    }
}

#[async_trait]
impl NetworkServer for RecordingServer {
    async fn start(
        &self,
        ip: &str,
        port: u16,
        lookup: Arc<dyn DirectoryLookup>,
    ) -> Result<ServerHandle, StartError> {
        self.started.lock().unwrap().push((ip.to_string(), port));
        if self.fail {
            return Err(StartError::InvalidAddress(format!("{ip}:{port}")));
        }
        *self.lookup.lock().unwrap() = Some(lookup);

        let addr = format!("{ip}:{port}")
            .parse()
            .unwrap_or_else(|_| SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)));
        Ok(ServerHandle::new(
            addr,
            Shutdown::new(),
            None,
            ConnectionTracker::new(),
        ))
    }
}

/// Handler that answers every call with its own tag.
pub struct Tagged(pub &'static str);

#[async_trait]
impl ServiceHandler for Tagged {
    async fn call(&self, method: &str, params: Value) -> Result<Value, HandlerError> {
        match method {
            "tag" => Ok(json!(self.0)),
            "echo" => Ok(params),
            other => Err(HandlerError::UnknownMethod(other.to_string())),
        }
    }
}

/// A valid config pointing at a fake registry.
pub fn node_config(ip: &str, port: i64) -> NodeBootConfig {
    let mut config = NodeBootConfig::default();
    config.registry.address = "zk://127.0.0.1:2181".into();
    config.node = Some(NodeConfig {
        application: "it-node".into(),
        ip: ip.into(),
        port,
    });
    config
}

pub fn reference(service: &str) -> ReferenceConfig {
    ReferenceConfig {
        service: service.into(),
        version: "1.0".into(),
    }
}
