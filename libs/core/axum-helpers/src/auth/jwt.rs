use chrono::{Duration, Utc};
use core_config::jwt::JwtConfig;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claims carried by tokens the authentication service issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user id)
    pub sub: String,
    /// Role name, e.g. "USER" or "ADMIN"
    pub role: String,
    /// Expiration time (unix seconds)
    pub exp: i64,
    /// Issued at (unix seconds)
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

/// HS256 token verification.
///
/// Token issuance lives in the authentication service; `create_token` exists
/// so tests and local tooling can mint compatible tokens.
#[derive(Clone)]
pub struct JwtAuth {
    secret: String,
}

impl JwtAuth {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            secret: config.secret.clone(),
        }
    }

    pub fn from_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verify the token signature and expiry, returning its claims.
    pub fn verify_token(&self, token: &str) -> Result<JwtClaims, JwtError> {
        let data = decode::<JwtClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }

    /// Mint a token with the given subject and role, valid for `ttl_seconds`.
    pub fn create_token(
        &self,
        user_id: &str,
        role: &str,
        ttl_seconds: i64,
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            role: role.to_string(),
            exp: (now + Duration::seconds(ttl_seconds)).timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(
            &Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;
        Ok(token)
    }
}
