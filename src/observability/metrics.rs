//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define node metrics (publications, subscriptions, dispatch outcomes)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `xrpc_services_published_total` (counter)
//! - `xrpc_subscriptions_total` (counter)
//! - `xrpc_registry_errors_total` (counter): by operation
//! - `xrpc_directory_entries` (gauge)
//! - `xrpc_lifecycle_state` (gauge): numeric `LifecycleState`
//! - `xrpc_requests_total` (counter): by service, outcome. Calls to a service
//!   with no local handler are counted under `service="unknown"`
//! - `xrpc_request_duration_seconds` (histogram)
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

/// Label for requests whose service did not resolve. Callers pick the
/// service name, so it never becomes a label value before lookup succeeds.
pub const UNKNOWN_SERVICE: &str = "unknown";

pub fn record_publish() {
    counter!("xrpc_services_published_total").increment(1);
}

pub fn record_subscription() {
    counter!("xrpc_subscriptions_total").increment(1);
}

pub fn record_registry_error(op: &'static str) {
    counter!("xrpc_registry_errors_total", "op" => op).increment(1);
}

pub fn record_directory_size(entries: usize) {
    gauge!("xrpc_directory_entries").set(entries as f64);
}

pub fn record_lifecycle_state(state: u8) {
    gauge!("xrpc_lifecycle_state").set(f64::from(state));
}

pub fn record_request(service: &str, outcome: &'static str, start: Instant) {
    counter!(
        "xrpc_requests_total",
        "service" => service.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("xrpc_request_duration_seconds").record(start.elapsed().as_secs_f64());
}
