use super::jwt::JwtAuth;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Raw bearer token of the current request, inserted alongside the decoded
/// claims so downstream calls can forward the caller's credentials.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

/// Extract a bearer token from the Authorization header.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer ").map(|s| s.to_string()))
}

/// JWT authentication middleware.
///
/// Verifies the bearer token and inserts [`JwtClaims`](super::JwtClaims) and
/// [`BearerToken`] into request extensions for handlers to extract.
///
/// # Example
///
/// ```ignore
/// let protected = Router::new()
///     .route("/users/{id}", put(update_user))
///     .layer(axum::middleware::from_fn_with_state(auth.clone(), jwt_auth_middleware));
/// ```
pub async fn jwt_auth_middleware(
    State(auth): State<JwtAuth>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    let token = match extract_token(&headers) {
        Some(t) => t,
        None => {
            tracing::debug!("No bearer token in Authorization header");
            return Err((StatusCode::UNAUTHORIZED, "No token provided"));
        }
    };

    let claims = match auth.verify_token(&token) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(error = %e, "JWT verification failed");
            return Err((StatusCode::UNAUTHORIZED, "Invalid token"));
        }
    };

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(BearerToken(token));
    Ok(next.run(request).await)
}
