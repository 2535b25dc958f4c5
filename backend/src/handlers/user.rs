//! User administration handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{access, ApiResponse, PaginationQuery};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::page_of;
use crate::middleware::CurrentUser;
use crate::services::auth::UserProfile;
use crate::services::user::{CreateUserInput, UpdateUserInput, UserFilter};
use crate::services::UserService;
use crate::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<PaginationQuery>,
    Query(filter): Query<UserFilter>,
) -> AppResult<Json<ApiResponse<Vec<UserProfile>>>> {
    current_user.require_role(access::ADMIN_ONLY)?;
    let page = page_of(&state, &pagination);
    let users = UserService::new(state.db).list(&filter, page).await?;
    Ok(Json(ApiResponse::paginated(users.data, users.pagination)))
}

pub async fn get_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    current_user.require_role(access::ADMIN_ONLY)?;
    let user = UserService::new(state.db).get(id).await?;
    Ok(Json(ApiResponse::ok(user)))
}

pub async fn create_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateUserInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserProfile>>)> {
    current_user.require_role(access::ADMIN_ONLY)?;
    let user = UserService::new(state.db).create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(user).with_message("User created")),
    ))
}

pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    current_user.require_role(access::ADMIN_ONLY)?;
    let user = UserService::new(state.db).update(id, input).await?;
    Ok(Json(ApiResponse::ok(user).with_message("User updated")))
}

pub async fn delete_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require_role(access::ADMIN_ONLY)?;
    UserService::new(state.db).delete(id, current_user.id()).await?;
    Ok(Json(ApiResponse::message("User deleted")))
}
