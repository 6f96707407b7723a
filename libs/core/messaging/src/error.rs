//! Error types for event processing.

use std::fmt;
use thiserror::Error;

/// Error categories determine redelivery behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Temporary failure (store unavailable, timeout). The message is left
    /// unacked and the broker redelivers it after the ack-wait elapses.
    Transient,

    /// Unrecoverable failure (malformed payload, violated business rule).
    /// The message is acked and logged; redelivery would never succeed.
    Permanent,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Transient => write!(f, "transient"),
            ErrorCategory::Permanent => write!(f, "permanent"),
        }
    }
}

/// Error that can occur while applying a consumed event.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("transient error: {message}")]
    Transient {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("permanent error: {message}")]
    Permanent {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Payload could not be decoded; always permanent.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl ProcessingError {
    /// Create a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transient error with a source.
    pub fn transient_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transient {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a permanent error.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
            source: None,
        }
    }

    /// Create a permanent error with a source.
    pub fn permanent_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Permanent {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProcessingError::Transient { .. } => ErrorCategory::Transient,
            ProcessingError::Permanent { .. } => ErrorCategory::Permanent,
            ProcessingError::Malformed(_) => ErrorCategory::Permanent,
        }
    }
}
