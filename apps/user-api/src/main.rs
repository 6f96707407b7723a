//! User API - account, profile and quiz-progress service

use std::sync::Arc;
use std::time::Duration;

use axum_helpers::{health_router, JwtAuth, ShutdownCoordinator};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_users::{handlers, HttpQuizClient, InMemoryUserRepository, UserService};
use messaging::nats::NatsPublisher;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

mod config;
mod consumers;
mod publisher;

use config::Config;
use publisher::NatsUserEventPublisher;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!("Connecting to NATS at {}", config.nats.url);
    let jetstream = messaging::nats::connect(&config.nats.url).await?;
    messaging::nats::ensure_stream(
        &jetstream,
        consumers::USER_STREAM,
        consumers::USER_DELETED_SUBJECT,
    )
    .await?;

    let publisher = Arc::new(NatsUserEventPublisher::new(NatsPublisher::new(
        jetstream.clone(),
        consumers::USER_DELETED_SUBJECT,
    )));
    let repository = Arc::new(InMemoryUserRepository::new());
    let quiz_client = Arc::new(HttpQuizClient::new(config.quiz.base_url.clone()));
    let service = UserService::new(repository, quiz_client, publisher);

    let (shutdown, _) = ShutdownCoordinator::new();
    let consumer_handles = consumers::spawn(jetstream, service.clone(), &shutdown);

    let jwt_auth = JwtAuth::new(&config.jwt);
    let app = axum::Router::new()
        .nest("/user", handlers::router(service, jwt_auth))
        .merge(health_router(config.app))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    let listener = tokio::net::TcpListener::bind(config.server.address()).await?;
    info!("Starting User API on {}", config.server.address());

    let signal_coordinator = shutdown.clone();
    tokio::spawn(async move { signal_coordinator.listen_for_signals().await });

    let mut shutdown_rx = shutdown.subscribe();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

    // The HTTP server is down; wait for the consumers to drain.
    shutdown.shutdown();
    for handle in consumer_handles {
        let _ = handle.await;
    }

    info!("User API shutdown complete");
    Ok(())
}
