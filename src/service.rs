//! Local service declarations.
//!
//! The hosting environment lists the services this node implements in a
//! [`ServiceCatalog`] and hands it to the controller at boot. Each entry binds
//! a service identifier and version to a [`ServiceHandler`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors a handler can report back to the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("{0}")]
    Failed(String),
}

/// A locally-implemented service that inbound calls are dispatched to.
#[async_trait]
pub trait ServiceHandler: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> Result<Value, HandlerError>;
}

/// One declared local service.
#[derive(Clone)]
pub struct LocalService {
    pub service: String,
    pub version: String,
    pub handler: Arc<dyn ServiceHandler>,
}

impl fmt::Debug for LocalService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalService")
            .field("service", &self.service)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Ordered list of local services supplied by the host.
///
/// Duplicate identifiers are kept; the directory resolves them
/// last-writer-wins in registration order.
#[derive(Debug, Clone, Default)]
pub struct ServiceCatalog {
    services: Vec<LocalService>,
}

impl ServiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a service implementation.
    pub fn register(
        mut self,
        service: impl Into<String>,
        version: impl Into<String>,
        handler: Arc<dyn ServiceHandler>,
    ) -> Self {
        self.services.push(LocalService {
            service: service.into(),
            version: version.into(),
            handler,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalService> {
        self.services.iter()
    }
}

/// Liveness probe served by every node binary.
#[derive(Debug, Default)]
pub struct PingService;

/// Identifier the node binary registers [`PingService`] under.
pub const PING_SERVICE: &str = "xrpc.Ping";

#[async_trait]
impl ServiceHandler for PingService {
    async fn call(&self, method: &str, params: Value) -> Result<Value, HandlerError> {
        match method {
            "ping" => Ok(Value::String("pong".into())),
            "echo" => Ok(params),
            other => Err(HandlerError::UnknownMethod(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_catalog_keeps_order_and_duplicates() {
        let catalog = ServiceCatalog::new()
            .register("a.Svc", "1", Arc::new(PingService))
            .register("b.Svc", "", Arc::new(PingService))
            .register("a.Svc", "2", Arc::new(PingService));

        let names: Vec<_> = catalog
            .iter()
            .map(|s| (s.service.as_str(), s.version.as_str()))
            .collect();
        assert_eq!(names, vec![("a.Svc", "1"), ("b.Svc", ""), ("a.Svc", "2")]);
        assert_eq!(catalog.len(), 3);
    }

    #[tokio::test]
    async fn test_ping_service() {
        let svc = PingService;
        assert_eq!(svc.call("ping", Value::Null).await.unwrap(), json!("pong"));
        assert_eq!(svc.call("echo", json!({"a": 1})).await.unwrap(), json!({"a": 1}));
        assert_eq!(
            svc.call("nope", Value::Null).await.unwrap_err(),
            HandlerError::UnknownMethod("nope".into())
        );
    }
}
