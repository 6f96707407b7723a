//! Pull-based JetStream consumer loop.

use std::marker::PhantomData;
use std::sync::Arc;

use async_nats::jetstream::consumer::pull::Config as ConsumerConfig;
use async_nats::jetstream::consumer::{AckPolicy, Consumer};
use async_nats::jetstream::Context;
use futures::StreamExt;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use super::{NatsError, StreamDef};
use crate::{ErrorCategory, Event, Processor};

/// Consumes one event channel and applies each message through a
/// [`Processor`], one message at a time.
///
/// Delivery is at-least-once: a message is acked only after the processor
/// returns. A crash mid-processing leaves the message unacked, so the broker
/// redelivers it after the ack-wait, so processors must be idempotent.
pub struct EventConsumer<E: Event> {
    jetstream: Context,
    def: StreamDef,
    processor: Arc<dyn Processor<E>>,
    _marker: PhantomData<E>,
}

impl<E: Event> EventConsumer<E> {
    pub fn new(jetstream: Context, def: StreamDef, processor: Arc<dyn Processor<E>>) -> Self {
        Self {
            jetstream,
            def,
            processor,
            _marker: PhantomData,
        }
    }

    /// Ensure the durable consumer exists, creating it if necessary.
    async fn ensure_consumer(&self) -> Result<Consumer<ConsumerConfig>, NatsError> {
        let stream = self
            .jetstream
            .get_stream(&self.def.stream_name)
            .await
            .map_err(|e| NatsError::Stream(e.to_string()))?;

        if let Ok(consumer) = stream
            .get_consumer::<ConsumerConfig>(&self.def.durable_name)
            .await
        {
            debug!(consumer = %self.def.durable_name, "Consumer already exists");
            return Ok(consumer);
        }

        info!(
            consumer = %self.def.durable_name,
            stream = %self.def.stream_name,
            "Creating consumer"
        );
        stream
            .create_consumer(ConsumerConfig {
                durable_name: Some(self.def.durable_name.clone()),
                name: Some(self.def.durable_name.clone()),
                ack_policy: AckPolicy::Explicit,
                ack_wait: self.def.ack_wait,
                max_deliver: self.def.max_deliver,
                filter_subject: self.def.subject.clone(),
                ..Default::default()
            })
            .await
            .map_err(|e| NatsError::Consumer(e.to_string()))
    }

    /// Run the consume loop until the shutdown signal fires.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<(), NatsError> {
        super::ensure_stream(&self.jetstream, &self.def.stream_name, &self.def.subject).await?;
        let consumer = self.ensure_consumer().await?;

        let mut messages = consumer
            .messages()
            .await
            .map_err(|e| NatsError::Consumer(e.to_string()))?;

        info!(
            stream = %self.def.stream_name,
            consumer = %self.def.durable_name,
            processor = self.processor.name(),
            "Consumer started"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!(consumer = %self.def.durable_name, "Consumer shutting down");
                    return Ok(());
                }
                next = messages.next() => {
                    match next {
                        Some(Ok(message)) => self.handle(message).await,
                        Some(Err(e)) => {
                            warn!(error = %e, "Failed to pull message, continuing");
                        }
                        None => {
                            warn!(consumer = %self.def.durable_name, "Message stream closed");
                            return Err(NatsError::Consumer("message stream closed".into()));
                        }
                    }
                }
            }
        }
    }

    async fn handle(&self, message: async_nats::jetstream::Message) {
        let event: E = match serde_json::from_slice(&message.payload) {
            Ok(event) => event,
            Err(e) => {
                // Undecodable payloads can never succeed; ack and move on.
                error!(
                    subject = %message.subject,
                    error = %e,
                    "Discarding malformed event payload"
                );
                self.ack(&message).await;
                return;
            }
        };

        let event_id = event.event_id();
        match self.processor.process(&event).await {
            Ok(()) => {
                debug!(event_id = %event_id, processor = self.processor.name(), "Event applied");
                self.ack(&message).await;
            }
            Err(e) if e.category() == ErrorCategory::Permanent => {
                error!(
                    event_id = %event_id,
                    processor = self.processor.name(),
                    error = %e,
                    "Event rejected permanently"
                );
                self.ack(&message).await;
            }
            Err(e) => {
                // Leave unacked; the broker redelivers after the ack-wait.
                warn!(
                    event_id = %event_id,
                    processor = self.processor.name(),
                    error = %e,
                    "Transient failure, awaiting redelivery"
                );
            }
        }
    }

    async fn ack(&self, message: &async_nats::jetstream::Message) {
        if let Err(e) = message.ack().await {
            warn!(error = %e, "Failed to ack message; it will be redelivered");
        }
    }
}
