//! Read-only admin HTTP endpoint.
//!
//! - `GET /admin/status`: lifecycle state and node identity
//! - `GET /admin/services`: service directory contents

pub mod auth;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::config::AdminConfig;
use crate::lifecycle::NodeController;

/// State injected into admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub controller: Arc<NodeController>,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/services", get(get_services))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}

/// Bind the admin listener when the endpoint is enabled.
///
/// Call before `NodeController::start` so a bad `bind_address` fails the
/// process before anything is published.
pub async fn bind(config: &AdminConfig) -> std::io::Result<Option<TcpListener>> {
    if !config.enabled {
        return Ok(None);
    }
    TcpListener::bind(&config.bind_address).await.map(Some)
}

/// Serve the admin router on `listener` until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    state: AdminState,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let addr: SocketAddr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin endpoint listening");

    axum::serve(listener, setup_admin_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}
