use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use axum_helpers::{jwt_auth_middleware, BearerToken, JwtAuth, ValidatedJson};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::UserResult;
use crate::models::{ChangePassword, CreateUser, MatchPassword, UpdateProfile, UserResponse};
use crate::repository::UserRepository;
use crate::service::UserService;

/// Build the user router. Registration, lookup and the global ranking are
/// public; everything that mutates or identifies the caller requires a
/// valid token.
pub fn router<R: UserRepository + 'static>(
    service: UserService<R>,
    jwt_auth: JwtAuth,
) -> Router {
    let state = Arc::new(service);
    let auth = middleware::from_fn_with_state(jwt_auth, jwt_auth_middleware);

    Router::new()
        .route("/", post(create_user::<R>))
        .route("/ranking", get(get_ranking::<R>))
        .route(
            "/ranking/course/{course_id}",
            get(get_ranking_by_course::<R>).layer(auth.clone()),
        )
        .route(
            "/authentication",
            get(get_authenticated_user::<R>).layer(auth.clone()),
        )
        .route("/username/{username}", get(get_user_by_username::<R>))
        .route(
            "/username/{username}/match-password",
            post(match_password::<R>),
        )
        .route(
            "/{id}",
            get(get_user::<R>).merge(
                put(update_profile::<R>)
                    .merge(delete(delete_user::<R>))
                    .layer(auth.clone()),
            ),
        )
        .route(
            "/{id}/change-password",
            post(change_password::<R>).layer(auth),
        )
        .with_state(state)
}

async fn create_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    ValidatedJson(input): ValidatedJson<CreateUser>,
) -> UserResult<impl IntoResponse> {
    let user = service.create_user(input).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

async fn get_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Path(id): Path<Uuid>,
) -> UserResult<Json<UserResponse>> {
    let user = service.get_user(id).await?;
    Ok(Json(UserResponse::from(user)))
}

async fn get_user_by_username<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Path(username): Path<String>,
) -> UserResult<Json<UserResponse>> {
    let user = service.get_user_by_username(&username).await?;
    Ok(Json(UserResponse::from(user)))
}

async fn match_password<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Path(username): Path<String>,
    Json(input): Json<MatchPassword>,
) -> UserResult<Json<UserResponse>> {
    let user = service.verify_credentials(&username, &input.password).await?;
    Ok(Json(UserResponse::from(user)))
}

async fn get_authenticated_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    principal: Principal,
) -> UserResult<Json<UserResponse>> {
    let user = service.get_authenticated_user(&principal).await?;
    Ok(Json(UserResponse::from(user)))
}

async fn get_ranking<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
) -> UserResult<Json<Vec<UserResponse>>> {
    let users = service.get_ranking().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

async fn get_ranking_by_course<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Path(course_id): Path<String>,
    Extension(token): Extension<BearerToken>,
) -> UserResult<Json<Vec<UserResponse>>> {
    let users = service.get_ranking_by_course(&course_id, &token.0).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

async fn update_profile<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Path(id): Path<Uuid>,
    principal: Principal,
    ValidatedJson(input): ValidatedJson<UpdateProfile>,
) -> UserResult<Json<UserResponse>> {
    let user = service.update_profile(id, &principal, input).await?;
    Ok(Json(UserResponse::from(user)))
}

async fn change_password<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Path(id): Path<Uuid>,
    principal: Principal,
    ValidatedJson(input): ValidatedJson<ChangePassword>,
) -> UserResult<Json<UserResponse>> {
    let user = service.change_password(id, &principal, input).await?;
    Ok(Json(UserResponse::from(user)))
}

async fn delete_user<R: UserRepository>(
    State(service): State<Arc<UserService<R>>>,
    Path(id): Path<Uuid>,
    principal: Principal,
) -> UserResult<StatusCode> {
    service.delete_user(id, &principal).await?;
    Ok(StatusCode::NO_CONTENT)
}
