//! Processor trait for applying consumed events.

use crate::error::ProcessingError;
use crate::event::Event;
use async_trait::async_trait;

/// Applies a consumed event to the domain.
///
/// Implementations must be idempotent: the delivery channel is at-least-once,
/// so the same event may be processed more than once.
#[async_trait]
pub trait Processor<E: Event>: Send + Sync {
    /// Apply the event. The message is acked only when this returns `Ok`
    /// or a permanent error.
    async fn process(&self, event: &E) -> Result<(), ProcessingError>;

    /// Processor name, used as a logging label.
    fn name(&self) -> &'static str;
}

/// A no-op processor for testing.
#[derive(Debug, Clone, Default)]
pub struct NoOpProcessor;

#[async_trait]
impl<E: Event> Processor<E> for NoOpProcessor {
    async fn process(&self, _event: &E) -> Result<(), ProcessingError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop_processor"
    }
}

/// A processor that always fails (for testing).
#[derive(Debug, Clone)]
pub struct FailingProcessor {
    error_message: String,
    transient: bool,
}

impl FailingProcessor {
    /// Create a processor that fails with transient errors.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            error_message: message.into(),
            transient: true,
        }
    }

    /// Create a processor that fails with permanent errors.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            error_message: message.into(),
            transient: false,
        }
    }
}

#[async_trait]
impl<E: Event> Processor<E> for FailingProcessor {
    async fn process(&self, _event: &E) -> Result<(), ProcessingError> {
        if self.transient {
            Err(ProcessingError::transient(&self.error_message))
        } else {
            Err(ProcessingError::permanent(&self.error_message))
        }
    }

    fn name(&self) -> &'static str {
        "failing_processor"
    }
}
