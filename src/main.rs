//! xrpc node (v1)
//!
//! Boots a node into an RPC mesh and serves its local services.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                      XRPC NODE                        │
//!                 │                                                       │
//!   node.toml ───▶│  config ──▶ lifecycle::NodeController                 │
//!                 │                 │                                     │
//!                 │                 ├──▶ registry (connect/publish/sub) ──┼──▶ Registry
//!                 │                 │                                     │
//!                 │                 ├──▶ directory (handlers + cache)     │
//!                 │                 │          ▲                          │
//!                 │                 └──▶ net::server ── lookup ┘          │
//!   Callers ─────▶│                          │                            │
//!                 │                          ▼                            │
//!                 │                   ServiceHandler::call                │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use xrpc_node::admin::{self, AdminState};
use xrpc_node::config::loader::load_config;
use xrpc_node::lifecycle::{signals, NodeController, Shutdown};
use xrpc_node::net::TcpRpcServer;
use xrpc_node::observability::{logging, metrics};
use xrpc_node::registry::MemoryRegistry;
use xrpc_node::service::{PingService, ServiceCatalog, PING_SERVICE};

#[derive(Parser)]
#[command(name = "xrpc-node")]
#[command(about = "Run a node in an xrpc service mesh", long_about = None)]
struct Cli {
    /// Path to the node configuration file.
    #[arg(short, long, default_value = "xrpc-node.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        config = %cli.config.display(),
        registry = %config.registry.address,
        consumer_only = config.consumer_only,
        references = config.references.len(),
        "xrpc-node v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let controller = Arc::new(NodeController::new(
        Arc::new(MemoryRegistry::new()),
        Arc::new(TcpRpcServer::new(config.listener.clone())),
    ));

    let admin_listener = admin::bind(&config.admin).await?;

    let services = ServiceCatalog::new().register(PING_SERVICE, "1", Arc::new(PingService));
    controller.start(&config, &services).await?;

    let admin_shutdown = Shutdown::new();
    let admin_task = admin_listener.map(|listener| {
        let state = AdminState {
            controller: controller.clone(),
            api_key: Arc::from(config.admin.api_key.as_str()),
        };
        tokio::spawn(admin::serve(listener, state, admin_shutdown.subscribe()))
    });

    signals::shutdown_signal().await;

    let report = controller.stop().await?;
    admin_shutdown.trigger();
    if let Some(task) = admin_task {
        match task.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Admin endpoint failed"),
            Err(e) => tracing::error!(error = %e, "Admin task panicked"),
            Ok(Ok(())) => {}
        }
    }

    tracing::info!(drained = report.drained, "Shutdown complete");
    Ok(())
}
