use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json, RequestPartsExt,
};
use axum_helpers::JwtClaims;
use serde_json::json;
use uuid::Uuid;

use crate::models::Role;

/// The authenticated caller, as established by the JWT middleware.
///
/// Event consumers construct this directly for the event's subject, so the
/// same ownership checks run for HTTP and event pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn user(id: Uuid) -> Self {
        Self {
            id,
            role: Role::User,
        }
    }

    pub fn admin(id: Uuid) -> Self {
        Self {
            id,
            role: Role::Admin,
        }
    }

    /// Owner-or-admin rule: every mutation of a user's state requires the
    /// caller to be that user or an admin.
    pub fn can_mutate(&self, target_id: Uuid) -> bool {
        self.id == target_id || self.role == Role::Admin
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Extension(claims) = parts
            .extract::<Extension<JwtClaims>>()
            .await
            .map_err(|_| unauthorized("Missing authentication"))?;

        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| unauthorized("Invalid token subject"))?;
        let role = claims
            .role
            .parse::<Role>()
            .map_err(|_| unauthorized("Invalid token role"))?;

        Ok(Principal { id, role })
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": {
                "type": "unauthorized",
                "message": message,
            }
        })),
    )
        .into_response()
}
