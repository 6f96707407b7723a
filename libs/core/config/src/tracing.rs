use crate::Environment;
use tracing_error::ErrorLayer;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Install color-eyre with a project-standard configuration.
///
/// Call this early in main(), before any fallible operations, to ensure
/// colored error output. Safe to call multiple times.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Initialize tracing with environment-aware configuration.
///
/// - **Production** (`APP_ENV=production`): JSON format for log aggregation,
///   module targets hidden.
/// - **Development** (default): pretty-printed, targets shown.
///
/// `RUST_LOG` overrides the default filter in either mode. Includes an
/// `ErrorLayer` so span traces are captured when errors surface.
///
/// Safe to call multiple times; later calls silently no-op (common in tests).
pub fn init_tracing(environment: &Environment) {
    let is_production = environment.is_production();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if is_production {
            EnvFilter::new("info,tower_http=info")
        } else {
            EnvFilter::new("debug,tower_http=debug")
        }
    });

    let result = if is_production {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .with(ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().pretty().with_target(true))
            .with(ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    if result.is_ok() {
        tracing::debug!(production = is_production, "Tracing initialized");
    }
}
