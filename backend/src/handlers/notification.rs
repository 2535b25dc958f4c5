//! HTTP handlers for the notification inbox

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use shared::{access, ApiResponse, PaginationQuery};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::page_of;
use crate::middleware::CurrentUser;
use crate::services::notification::{
    CreateNotificationInput, Delivery, Notification, NotificationFilter,
};
use crate::services::NotificationService;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkedReadResponse {
    pub updated: u64,
}

/// Inbox of the current user
pub async fn list_notifications(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<PaginationQuery>,
    Query(filter): Query<NotificationFilter>,
) -> AppResult<Json<ApiResponse<Vec<Notification>>>> {
    let page = page_of(&state, &pagination);
    let notifications = NotificationService::new(state.db)
        .list(current_user.id(), &filter, page)
        .await?;
    Ok(Json(ApiResponse::paginated(
        notifications.data,
        notifications.pagination,
    )))
}

pub async fn get_unread_count(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<UnreadCountResponse>>> {
    let count = NotificationService::new(state.db)
        .unread_count(current_user.id())
        .await?;
    Ok(Json(ApiResponse::ok(UnreadCountResponse { count })))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Notification>>> {
    let notification = NotificationService::new(state.db)
        .mark_read(current_user.id(), id)
        .await?;
    Ok(Json(ApiResponse::ok(notification)))
}

pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<MarkedReadResponse>>> {
    let updated = NotificationService::new(state.db)
        .mark_all_read(current_user.id())
        .await?;
    Ok(Json(
        ApiResponse::ok(MarkedReadResponse { updated })
            .with_message("All notifications marked as read"),
    ))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    NotificationService::new(state.db)
        .delete(current_user.id(), id)
        .await?;
    Ok(Json(ApiResponse::message("Notification deleted")))
}

/// Fan a notification out to roles and/or individual users
pub async fn broadcast_notification(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateNotificationInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Delivery>>)> {
    current_user.require_role(access::MANAGEMENT)?;
    let delivery = NotificationService::new(state.db).broadcast(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(delivery).with_message("Notification sent")),
    ))
}
