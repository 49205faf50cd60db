//! Consumer subscriptions.
//!
//! # Responsibilities
//! - Build one `ConsumerSubscription` per configured reference
//! - Forward each to the registry client, in declaration order
//!
//! # Design Decisions
//! - Stateless: nothing is retained after the subscribe call
//! - First failure aborts the batch; earlier subscriptions are not rolled back

use crate::config::ReferenceConfig;
use crate::identity::NodeIdentity;
use crate::observability::metrics;
use crate::registry::{ConsumerSubscription, RegistryClient, RegistryError};

pub struct SubscriptionManager<'a> {
    client: &'a dyn RegistryClient,
    identity: &'a NodeIdentity,
}

impl<'a> SubscriptionManager<'a> {
    pub fn new(client: &'a dyn RegistryClient, identity: &'a NodeIdentity) -> Self {
        Self { client, identity }
    }

    /// Subscribe to every reference. Returns how many succeeded.
    pub async fn subscribe_all(&self, references: &[ReferenceConfig]) -> Result<usize, RegistryError> {
        let mut subscribed = 0;
        for reference in references {
            let subscription =
                ConsumerSubscription::for_node(&reference.service, &reference.version, self.identity);

            if let Err(e) = self.client.subscribe(&subscription).await {
                metrics::record_registry_error("subscribe");
                tracing::error!(
                    service = %reference.service,
                    version = %reference.version,
                    error = %e,
                    "Subscription failed"
                );
                return Err(e);
            }

            metrics::record_subscription();
            tracing::info!(
                service = %reference.service,
                version = %reference.version,
                "Subscribed to remote service"
            );
            subscribed += 1;
        }
        Ok(subscribed)
    }
}
