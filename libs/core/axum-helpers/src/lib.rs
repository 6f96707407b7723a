//! Shared HTTP plumbing for the service binaries: request validation,
//! JWT verification, health endpoints, and graceful shutdown.

pub mod auth;
pub mod extractors;
pub mod health;
pub mod shutdown;

pub use auth::{jwt_auth_middleware, BearerToken, JwtAuth, JwtClaims};
pub use extractors::ValidatedJson;
pub use health::health_router;
pub use shutdown::ShutdownCoordinator;
