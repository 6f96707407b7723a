use crate::{env_or_default, env_required, ConfigError, FromEnv};

/// NATS JetStream connection configuration.
///
/// The broker carries the quiz-lifecycle events this service consumes and
/// the user-lifecycle events it produces.
#[derive(Clone, Debug)]
pub struct NatsConfig {
    pub url: String,
}

impl FromEnv for NatsConfig {
    /// Reads `NATS_URL` (required).
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env_required("NATS_URL")?,
        })
    }
}

impl NatsConfig {
    /// Local default, used by tests and development tooling.
    pub fn local() -> Self {
        Self {
            url: env_or_default("NATS_URL", "nats://localhost:4222"),
        }
    }
}
