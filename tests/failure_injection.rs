//! Failure injection tests for node boot.

use std::sync::Arc;

use xrpc_node::config::PublishFailurePolicy;
use xrpc_node::lifecycle::{BootError, LifecycleState, NodeController};
use xrpc_node::registry::RegistryError;
use xrpc_node::ServiceCatalog;

mod common;
use common::{node_config, reference, RecordingRegistry, RecordingServer, RegistryCall, Tagged};

fn services() -> ServiceCatalog {
    ServiceCatalog::new()
        .register("svc.A", "1", Arc::new(Tagged("a")))
        .register("svc.B", "1", Arc::new(Tagged("b")))
        .register("svc.C", "1", Arc::new(Tagged("c")))
}

#[tokio::test]
async fn test_registry_unreachable_aborts_boot() {
    let registry = RecordingRegistry::failing_connect();
    let server = RecordingServer::new();
    let node = NodeController::new(Arc::new(registry.clone()), Arc::new(server.clone()));

    let err = node
        .start(&node_config("10.0.0.1", 9000), &services())
        .await
        .unwrap_err();

    assert!(matches!(err, BootError::Registry(RegistryError::Connection { .. })));
    assert_eq!(registry.calls().len(), 1);
    assert!(node.directory().is_empty());
    assert!(server.starts().is_empty());
    assert_eq!(node.state(), LifecycleState::Failed);
}

#[tokio::test]
async fn test_publish_failure_retains_partial_state() {
    let registry = RecordingRegistry::failing_publish("svc.B");
    let server = RecordingServer::new();
    let node = NodeController::new(Arc::new(registry.clone()), Arc::new(server.clone()));

    let mut config = node_config("10.0.0.1", 9000);
    config.references = vec![reference("remote.X")];

    let err = node.start(&config, &services()).await.unwrap_err();

    match &err {
        BootError::Registry(RegistryError::Registration { service, .. }) => {
            assert_eq!(service, "svc.B");
        }
        other => panic!("expected registration error, got {other}"),
    }

    // Observed behavior: A stays published, B is in the local tables without
    // a registry entry, C is never attempted, nothing later runs.
    assert_eq!(registry.published().len(), 1);
    assert_eq!(registry.published()[0].service, "svc.A");
    assert!(node.directory().contains("svc.A"));
    assert!(node.directory().contains("svc.B"));
    assert!(node.registrations().contains("svc.B"));
    assert!(!node.directory().contains("svc.C"));
    assert_eq!(registry.subscribe_count(), 0);
    assert!(server.starts().is_empty());
    assert_eq!(node.state(), LifecycleState::Failed);
}

#[tokio::test]
async fn test_publish_failure_compensates_when_configured() {
    let registry = RecordingRegistry::failing_publish("svc.C");
    let server = RecordingServer::new();
    let node = NodeController::new(Arc::new(registry.clone()), Arc::new(server.clone()));

    let mut config = node_config("10.0.0.1", 9000);
    config.publish.on_failure = PublishFailurePolicy::Compensate;

    node.start(&config, &services()).await.unwrap_err();

    assert!(node.directory().is_empty());
    assert!(node.registrations().is_empty());
    let calls = registry.calls();
    let tail: Vec<_> = calls.iter().rev().take(2).cloned().collect();
    assert_eq!(
        tail,
        vec![
            RegistryCall::Unregister("svc.A".into()),
            RegistryCall::Unregister("svc.B".into()),
        ]
    );
    assert!(server.starts().is_empty());
}

#[tokio::test]
async fn test_subscription_failure_aborts_boot() {
    let registry = RecordingRegistry::failing_subscribe("remote.Y");
    let server = RecordingServer::new();
    let node = NodeController::new(Arc::new(registry.clone()), Arc::new(server.clone()));

    let mut config = node_config("10.0.0.1", 9000);
    config.references = vec![reference("remote.X"), reference("remote.Y"), reference("remote.Z")];

    let err = node.start(&config, &services()).await.unwrap_err();

    assert!(matches!(err, BootError::Registry(RegistryError::Subscription { .. })));
    assert_eq!(registry.subscribe_count(), 2);
    assert_eq!(registry.publish_count(), 3);
    assert!(server.starts().is_empty());
}

#[tokio::test]
async fn test_server_start_failure_aborts_boot() {
    let registry = RecordingRegistry::new();
    let server = RecordingServer::failing();
    let node = NodeController::new(Arc::new(registry.clone()), Arc::new(server.clone()));

    let err = node
        .start(&node_config("10.0.0.1", 9000), &services())
        .await
        .unwrap_err();

    assert!(matches!(err, BootError::Start(_)));
    assert_eq!(server.starts().len(), 1);
    assert_eq!(node.state(), LifecycleState::Failed);

    // A failed node cannot be stopped; its tables are left as boot left them.
    assert!(node.stop().await.is_err());
    assert_eq!(node.directory().len(), 3);
}

#[tokio::test]
async fn test_bind_conflict_is_start_error() {
    let holder = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let taken = holder.local_addr().unwrap().port();

    let registry = RecordingRegistry::new();
    let node = NodeController::new(
        Arc::new(registry),
        Arc::new(xrpc_node::net::TcpRpcServer::default()),
    );

    let err = node
        .start(&node_config("127.0.0.1", i64::from(taken)), &services())
        .await
        .unwrap_err();
    assert!(matches!(err, BootError::Start(_)));
}
