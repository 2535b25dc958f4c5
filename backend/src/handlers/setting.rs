//! Settings handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{access, ApiResponse};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::setting::{BulkSettingsInput, Setting, SettingFilter, SettingValueInput};
use crate::services::SettingService;
use crate::AppState;

pub async fn list_settings(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<SettingFilter>,
) -> AppResult<Json<ApiResponse<Vec<Setting>>>> {
    let settings = SettingService::new(state.db).list(&filter).await?;
    Ok(Json(ApiResponse::ok(settings)))
}

pub async fn get_setting(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(key): Path<String>,
) -> AppResult<Json<ApiResponse<Setting>>> {
    let setting = SettingService::new(state.db).get(&key).await?;
    Ok(Json(ApiResponse::ok(setting)))
}

pub async fn put_setting(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(key): Path<String>,
    Json(input): Json<SettingValueInput>,
) -> AppResult<Json<ApiResponse<Setting>>> {
    current_user.require_role(access::ADMIN_ONLY)?;
    let setting = SettingService::new(state.db)
        .put(&key, input, current_user.id())
        .await?;
    Ok(Json(ApiResponse::ok(setting).with_message("Setting saved")))
}

pub async fn put_settings(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<BulkSettingsInput>,
) -> AppResult<Json<ApiResponse<Vec<Setting>>>> {
    current_user.require_role(access::ADMIN_ONLY)?;
    let settings = SettingService::new(state.db)
        .put_many(input, current_user.id())
        .await?;
    Ok(Json(ApiResponse::ok(settings).with_message("Settings saved")))
}

pub async fn delete_setting(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(key): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require_role(access::ADMIN_ONLY)?;
    SettingService::new(state.db).delete(&key).await?;
    Ok(Json(ApiResponse::message("Setting deleted")))
}
