//! Publication of local services during boot.
//!
//! # Responsibilities
//! - Build one `ServiceEndpoint` per declared local service
//! - Insert into the directory, then the registration cache, then publish
//! - Apply the configured `PublishFailurePolicy` when the registry refuses
//!
//! # Design Decisions
//! - Fail fast: the first rejected publish aborts the batch
//! - Entries become dispatchable before the registry acknowledges them

use crate::config::PublishFailurePolicy;
use crate::directory::{RegistrationCache, ServiceDirectory};
use crate::identity::NodeIdentity;
use crate::observability::metrics;
use crate::registry::{RegistryClient, RegistryError, ServiceEndpoint};
use crate::service::ServiceCatalog;

/// Where publication writes its local state.
pub struct PublishTargets<'a> {
    pub directory: &'a ServiceDirectory,
    pub registrations: &'a RegistrationCache,
}

/// Publish every service in `catalog`. Returns how many were published.
pub async fn publish_services(
    client: &dyn RegistryClient,
    identity: &NodeIdentity,
    catalog: &ServiceCatalog,
    targets: PublishTargets<'_>,
    policy: PublishFailurePolicy,
) -> Result<usize, RegistryError> {
    let mut published: Vec<ServiceEndpoint> = Vec::with_capacity(catalog.len());

    for local in catalog.iter() {
        let endpoint = ServiceEndpoint::for_node(&local.service, &local.version, identity);

        targets
            .directory
            .put(&local.service, &local.version, local.handler.clone());
        targets.registrations.put(endpoint.clone());
        metrics::record_directory_size(targets.directory.len());

        if let Err(e) = client.publish(&endpoint).await {
            metrics::record_registry_error("publish");
            tracing::error!(
                service = %endpoint.service,
                version = %endpoint.version,
                error = %e,
                ?policy,
                "Publish rejected"
            );
            if policy == PublishFailurePolicy::Compensate {
                compensate(client, &targets, &endpoint, &published).await;
            }
            return Err(e);
        }

        metrics::record_publish();
        tracing::info!(
            service = %endpoint.service,
            version = %endpoint.version,
            endpoint = %identity.endpoint(),
            "Service published"
        );
        published.push(endpoint);
    }

    Ok(published.len())
}

/// Undo a partially published batch: drop the failed entry, then retract
/// earlier publications newest-first.
async fn compensate(
    client: &dyn RegistryClient,
    targets: &PublishTargets<'_>,
    failed: &ServiceEndpoint,
    published: &[ServiceEndpoint],
) {
    targets.directory.remove(failed.key());
    targets.registrations.remove(failed.key());

    for endpoint in published.iter().rev() {
        if let Err(e) = client.unregister(endpoint).await {
            metrics::record_registry_error("unregister");
            tracing::warn!(
                service = %endpoint.service,
                error = %e,
                "Compensating unregister failed"
            );
        }
        targets.directory.remove(endpoint.key());
        targets.registrations.remove(endpoint.key());
    }

    metrics::record_directory_size(targets.directory.len());
    tracing::info!(
        rolled_back = published.len(),
        "Rolled back partial publication"
    );
}
