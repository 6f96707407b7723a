//! Event-streaming abstractions for cross-service consistency.
//!
//! Domain crates define their event payloads and a [`Processor`] that applies
//! them; the [`nats`] module supplies the at-least-once delivery channel
//! (JetStream pull consumer, explicit ack after processing) and a publisher.
//!
//! Error handling is category-driven: a [`ProcessingError::Transient`] leaves
//! the message unacked so the broker redelivers it, while a
//! [`ProcessingError::Permanent`] acks the message and logs it, since
//! retrying a malformed or logically-rejected event would never succeed.

mod error;
mod event;
mod processor;

pub mod nats;

pub use error::{ErrorCategory, ProcessingError};
pub use event::Event;
pub use processor::{FailingProcessor, NoOpProcessor, Processor};
