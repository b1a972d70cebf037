//! API request handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::auth::{AuthError, AuthenticatedUser, RequireAdmin};
use crate::user::UserInfo;

use super::error::ApiResult;
use super::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login endpoint: verify credentials and issue a token.
///
/// The success body is the bearer token itself. Every failure mode uses
/// the one fixed message; no partial state is produced.
#[instrument(skip(state, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<String, AuthError> {
    let user = state
        .users
        .verify_credentials(&request.email, &request.password)
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .ok_or(AuthError::InvalidCredentials)?;

    let token = state.auth.codec.issue(&user)?;
    info!(user_id = user.id, "User logged in");

    Ok(token)
}

/// Identity attached to the current request.
pub async fn me(user: AuthenticatedUser) -> Json<AuthenticatedUser> {
    Json(user)
}

/// List all users, including deactivated ones (admin only).
#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> ApiResult<Json<Vec<UserInfo>>> {
    let users = state.users.list_users().await?;
    Ok(Json(users.into_iter().map(UserInfo::from).collect()))
}

/// Deactivate a user (admin only).
///
/// Soft delete: the account disappears from authentication lookups, so any
/// still-unexpired token it holds stops resolving.
#[instrument(skip(state, admin))]
pub async fn deactivate_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(email): Path<String>,
) -> ApiResult<StatusCode> {
    state.users.set_active(&email, false, &admin.email).await?;
    info!(email = %email, "Admin deactivated user");
    Ok(StatusCode::NO_CONTENT)
}

/// Reactivate a user (admin only).
#[instrument(skip(state, admin))]
pub async fn activate_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(email): Path<String>,
) -> ApiResult<StatusCode> {
    state.users.set_active(&email, true, &admin.email).await?;
    info!(email = %email, "Admin activated user");
    Ok(StatusCode::NO_CONTENT)
}
