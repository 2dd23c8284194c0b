use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{extractors::AuthUser, handlers::is_valid_email, password::hash_password},
    error::ApiError,
    pagination::{Page, PageParams},
    state::AppState,
    users::{
        dto::{CreateUserRequest, UserDto, UserUpdateRequest},
        repo::{NewUser, User},
    },
};

/// User management. Every route here is admin-only.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, principal, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(mut payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserDto>), ApiError> {
    principal.ensure_admin()?;

    payload.email = payload.email.trim().to_lowercase();
    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.username.trim().len() < 3 {
        return Err(ApiError::Validation("Username too short".into()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::Validation("Password too short".into()));
    }

    if User::exists_by_email(&state.db, &payload.email).await? {
        warn!(email = %payload.email, "email already taken");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        &NewUser {
            username: payload.username.trim().to_owned(),
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
            password_hash: hash,
            role: payload.role,
        },
    )
    .await?;

    info!(user_id = %user.id, role = ?user.role, "user created by admin");
    Ok((StatusCode::CREATED, Json(UserDto::from(user))))
}

#[instrument(skip(state, principal))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<UserDto>>, ApiError> {
    principal.ensure_admin()?;

    let users = User::list(&state.db, params.limit(), params.offset()).await?;
    let total = User::count(&state.db).await?;
    let content = users.into_iter().map(UserDto::from).collect();
    Ok(Json(Page::new(content, params, total)))
}

#[instrument(skip(state, principal))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserDto>, ApiError> {
    principal.ensure_admin()?;

    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(UserDto::from(user)))
}

#[instrument(skip(state, principal, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<UserUpdateRequest>,
) -> Result<Json<UserDto>, ApiError> {
    principal.ensure_admin()?;

    payload.email = payload.email.trim().to_lowercase();
    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.username.trim().len() < 3 {
        return Err(ApiError::Validation("Username too short".into()));
    }

    let user = User::update_profile(
        &state.db,
        id,
        payload.username.trim(),
        payload.first_name.as_deref(),
        payload.last_name.as_deref(),
        &payload.email,
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    info!(user_id = %user.id, "user updated");
    Ok(Json(UserDto::from(user)))
}

#[instrument(skip(state, principal))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    principal.ensure_admin()?;

    User::delete_by_id(&state.db, id).await?;
    info!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
