use async_trait::async_trait;
use domain_users::{DeleteUserEvent, PublishError, UserEventPublisher};
use messaging::nats::NatsPublisher;

/// Bridges the domain's publish port onto the JetStream publisher.
pub struct NatsUserEventPublisher {
    inner: NatsPublisher,
}

impl NatsUserEventPublisher {
    pub fn new(inner: NatsPublisher) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl UserEventPublisher for NatsUserEventPublisher {
    async fn publish_user_deleted(&self, event: DeleteUserEvent) -> Result<(), PublishError> {
        self.inner
            .publish(&event)
            .await
            .map(|_| ())
            .map_err(|e| PublishError(e.to_string()))
    }
}
