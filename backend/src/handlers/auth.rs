//! Authentication handlers

use axum::{extract::State, Json};
use shared::ApiResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::auth::{AuthToken, ChangePasswordInput, LoginInput, UserProfile};
use crate::services::AuthService;
use crate::AppState;

/// Exchange email and password for a bearer token
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<Json<ApiResponse<AuthToken>>> {
    let token = AuthService::new(state.db, &state.config.jwt).login(input).await?;
    Ok(Json(ApiResponse::ok(token).with_message("Login successful")))
}

/// Profile of the authenticated user
pub async fn me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = AuthService::new(state.db, &state.config.jwt)
        .me(current_user.id())
        .await?;
    Ok(Json(ApiResponse::ok(profile)))
}

pub async fn change_password(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ChangePasswordInput>,
) -> AppResult<Json<ApiResponse<()>>> {
    AuthService::new(state.db, &state.config.jwt)
        .change_password(current_user.id(), input)
        .await?;
    Ok(Json(ApiResponse::message("Password updated")))
}
