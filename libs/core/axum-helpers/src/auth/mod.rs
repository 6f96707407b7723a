mod jwt;
mod middleware;

pub use jwt::{JwtAuth, JwtClaims};
pub use middleware::{jwt_auth_middleware, BearerToken};
