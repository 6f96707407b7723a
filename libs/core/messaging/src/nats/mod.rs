//! NATS JetStream backend: at-least-once consumer loop and publisher.

mod config;
mod consumer;
mod publisher;

pub use config::StreamDef;
pub use consumer::EventConsumer;
pub use publisher::NatsPublisher;

use async_nats::jetstream::{self, Context};
use thiserror::Error;

/// Errors surfaced by the NATS backend.
#[derive(Debug, Error)]
pub enum NatsError {
    #[error("connect error: {0}")]
    Connect(#[from] async_nats::ConnectError),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("consumer error: {0}")]
    Consumer(String),

    #[error("publish error: {0}")]
    Publish(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Connect to NATS and return a JetStream context.
pub async fn connect(url: &str) -> Result<Context, NatsError> {
    let client = async_nats::connect(url).await?;
    Ok(jetstream::new(client))
}

/// Ensure a stream capturing `subject` exists, creating it if necessary.
///
/// Publishers call this for their outbound stream; consumers call it before
/// attaching their durable consumer.
pub async fn ensure_stream(
    jetstream: &Context,
    stream_name: &str,
    subject: &str,
) -> Result<(), NatsError> {
    if jetstream.get_stream(stream_name).await.is_ok() {
        tracing::debug!(stream = %stream_name, "Stream already exists");
        return Ok(());
    }

    tracing::info!(stream = %stream_name, subject = %subject, "Creating stream");
    jetstream
        .create_stream(jetstream::stream::Config {
            name: stream_name.to_string(),
            subjects: vec![subject.to_string()],
            max_messages: 100_000,
            max_age: std::time::Duration::from_secs(7 * 24 * 60 * 60),
            ..Default::default()
        })
        .await
        .map_err(|e| NatsError::Stream(e.to_string()))?;

    Ok(())
}
