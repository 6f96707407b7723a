use std::sync::Arc;

use async_nats::jetstream::Context;
use axum_helpers::ShutdownCoordinator;
use domain_users::{AuthEventProcessor, InMemoryUserRepository, QuizEventProcessor, UserService};
use messaging::nats::{EventConsumer, StreamDef};
use tokio::task::JoinHandle;
use tracing::error;

/// Stream holding the events this service publishes.
pub const USER_STREAM: &str = "USER_EVENTS";
pub const USER_DELETED_SUBJECT: &str = "user.events.deleted";

/// Durable consumer name; one per consuming service, shared across replicas.
const DURABLE_NAME: &str = "user-api";

fn quiz_stream() -> StreamDef {
    StreamDef::new("QUIZ_EVENTS", "quiz.events", DURABLE_NAME)
}

fn auth_stream() -> StreamDef {
    StreamDef::new("AUTH_EVENTS", "auth.events", DURABLE_NAME)
}

/// Spawn the quiz and auth event consumers as background tasks.
pub fn spawn(
    jetstream: Context,
    service: UserService<InMemoryUserRepository>,
    shutdown: &ShutdownCoordinator,
) -> Vec<JoinHandle<()>> {
    let quiz_consumer = EventConsumer::new(
        jetstream.clone(),
        quiz_stream(),
        Arc::new(QuizEventProcessor::new(service.clone())),
    );
    let auth_consumer = EventConsumer::new(
        jetstream,
        auth_stream(),
        Arc::new(AuthEventProcessor::new(service)),
    );

    let quiz_rx = shutdown.subscribe();
    let auth_rx = shutdown.subscribe();

    vec![
        tokio::spawn(async move {
            if let Err(e) = quiz_consumer.run(quiz_rx).await {
                error!(error = %e, "Quiz event consumer stopped");
            }
        }),
        tokio::spawn(async move {
            if let Err(e) = auth_consumer.run(auth_rx).await {
                error!(error = %e, "Auth event consumer stopped");
            }
        }),
    ]
}
