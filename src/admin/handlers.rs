use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::identity::NodeIdentity;
use crate::lifecycle::LifecycleState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub state: LifecycleState,
    pub identity: Option<NodeIdentity>,
    pub services: usize,
}

#[derive(Serialize)]
pub struct ServiceStatus {
    pub service: String,
    pub version: String,
    pub published: bool,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let node = &state.controller;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        state: node.state(),
        identity: node.identity().map(|id| id.as_ref().clone()),
        services: node.directory().len(),
    })
}

pub async fn get_services(State(state): State<AdminState>) -> Json<Vec<ServiceStatus>> {
    let node = &state.controller;
    let mut services: Vec<ServiceStatus> = node
        .directory()
        .entries()
        .into_iter()
        .map(|(service, version)| ServiceStatus {
            published: node.registrations().contains(&service),
            service,
            version,
        })
        .collect();
    services.sort_by(|a, b| a.service.cmp(&b.service));
    Json(services)
}
