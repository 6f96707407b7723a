use crate::{env_required, ConfigError, FromEnv};

/// JWT verification configuration.
///
/// This service only verifies tokens issued by the authentication service;
/// it never issues them (test helpers aside), so a shared HS256 secret is
/// all it needs.
#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
}

impl FromEnv for JwtConfig {
    /// Reads `JWT_SECRET` (required).
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret: env_required("JWT_SECRET")?,
        })
    }
}
