use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// User domain errors
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("User already exists")]
    AlreadyExists,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Password does not match")]
    PasswordMismatch,

    #[error("Account has no local password")]
    OAuthNoPassword,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Quiz service error: {0}")]
    QuizService(String),

    #[error("Event publish error: {0}")]
    Publish(String),

    #[error("Repository error: {0}")]
    Repository(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            UserError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            UserError::AlreadyExists => (StatusCode::CONFLICT, "already_exists", self.to_string()),
            UserError::PermissionDenied => {
                (StatusCode::FORBIDDEN, "permission_denied", self.to_string())
            }
            UserError::PasswordMismatch => {
                (StatusCode::BAD_REQUEST, "password_mismatch", self.to_string())
            }
            // Surfaced as a plain 404 so credential probes cannot distinguish
            // a missing account from a federated one.
            UserError::OAuthNoPassword => {
                (StatusCode::NOT_FOUND, "not_found", "User not found".to_string())
            }
            UserError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "validation_error", self.to_string())
            }
            UserError::PasswordHash(msg) => {
                tracing::error!(error = %msg, "password hashing failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
            UserError::QuizService(msg) => {
                tracing::error!(error = %msg, "quiz service call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "quiz_service_error",
                    "Upstream quiz service unavailable".to_string(),
                )
            }
            UserError::Publish(msg) => {
                tracing::error!(error = %msg, "event publish failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
            UserError::Repository(msg) => {
                tracing::error!(error = %msg, "repository operation failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "repository_error",
                    "Storage unavailable".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
