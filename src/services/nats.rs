//! Event publishing over NATS.

use async_trait::async_trait;

use super::EventPublisher;
use crate::domain::events::DomainEvent;
use crate::{CommerceError, Result};

pub struct NatsPublisher { client: async_nats::Client }

impl NatsPublisher {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = async_nats::connect(url).await.map_err(|e| CommerceError::Remote(format!("NATS connect: {e}")))?;
        tracing::info!(url, "Connected to NATS");
        Ok(Self { client })
    }
}

impl std::fmt::Debug for NatsPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("NatsPublisher").finish_non_exhaustive() }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<()> {
        let subject = event.subject();
        let payload = serde_json::to_vec(event)?;
        self.client.publish(subject.clone(), payload.into()).await.map_err(|e| CommerceError::Remote(e.to_string()))?;
        tracing::debug!(subject = %subject, "Published domain event");
        Ok(())
    }
}

/// Drops events; used when no bus is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<()> {
        tracing::trace!(subject = %event.subject(), "No event bus configured; dropping event");
        Ok(())
    }
}
