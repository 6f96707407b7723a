//! JetStream publisher for domain events.

use async_nats::jetstream::Context;
use tracing::debug;

use super::NatsError;
use crate::Event;

/// Publishes events to a JetStream subject.
pub struct NatsPublisher {
    jetstream: Context,
    subject: String,
}

impl NatsPublisher {
    pub fn new(jetstream: Context, subject: impl Into<String>) -> Self {
        Self {
            jetstream,
            subject: subject.into(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Publish an event and wait for the broker's ack.
    ///
    /// Returns the stream sequence number of the stored message.
    pub async fn publish<E: Event>(&self, event: &E) -> Result<u64, NatsError> {
        let payload = serde_json::to_vec(event)?;

        let ack = self
            .jetstream
            .publish(self.subject.clone(), payload.into())
            .await
            .map_err(|e| NatsError::Publish(e.to_string()))?
            .await
            .map_err(|e| NatsError::Publish(e.to_string()))?;

        debug!(
            subject = %self.subject,
            sequence = ack.sequence,
            event_id = %event.event_id(),
            "Published event"
        );

        Ok(ack.sequence)
    }
}
