//! Attendance handlers

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
use crate::services::attendance::{
    Attendance, AttendanceEntry, AttendanceFilter, AttendanceSummary, CheckInInput,
    CheckOutInput, CreateAttendanceInput, UpdateAttendanceInput,
};
use crate::services::AttendanceService;
use crate::AppState;

/// List attendance; omitting both `page` and `limit` returns every match
pub async fn list_attendance(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(pagination): Query<PaginationQuery>,
    Query(filter): Query<AttendanceFilter>,
) -> AppResult<Json<ApiResponse<Vec<AttendanceEntry>>>> {
    let page = (!pagination.is_unbounded()).then(|| page_of(&state, &pagination));
    let (data, meta) = AttendanceService::new(state.db).list(&filter, page).await?;
    let response = match meta {
        Some(meta) => ApiResponse::paginated(data, meta),
        None => ApiResponse::ok(data),
    };
    Ok(Json(response))
}

pub async fn get_attendance(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AttendanceEntry>>> {
    let entry = AttendanceService::new(state.db).get(id).await?;
    Ok(Json(ApiResponse::ok(entry)))
}

pub async fn create_attendance(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateAttendanceInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Attendance>>)> {
    current_user.require_role(access::FLOOR)?;
    let record = AttendanceService::new(state.db).create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(record).with_message("Attendance recorded")),
    ))
}

pub async fn check_in(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CheckInInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Attendance>>)> {
    current_user.require_role(access::FLOOR)?;
    let record = AttendanceService::new(state.db).check_in(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(record).with_message("Checked in")),
    ))
}

pub async fn check_out(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CheckOutInput>,
) -> AppResult<Json<ApiResponse<Attendance>>> {
    current_user.require_role(access::FLOOR)?;
    let record = AttendanceService::new(state.db).check_out(input).await?;
    Ok(Json(ApiResponse::ok(record).with_message("Checked out")))
}

pub async fn update_attendance(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateAttendanceInput>,
) -> AppResult<Json<ApiResponse<Attendance>>> {
    current_user.require_role(access::FLOOR)?;
    let record = AttendanceService::new(state.db).update(id, input).await?;
    Ok(Json(ApiResponse::ok(record).with_message("Attendance updated")))
}

pub async fn delete_attendance(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require_role(access::FLOOR)?;
    AttendanceService::new(state.db).delete(id).await?;
    Ok(Json(ApiResponse::message("Attendance deleted")))
}

/// Status counts and hours, defaulting to the current month
pub async fn attendance_summary(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(filter): Query<AttendanceFilter>,
) -> AppResult<Json<ApiResponse<AttendanceSummary>>> {
    let summary = AttendanceService::new(state.db).summary(&filter).await?;
    Ok(Json(ApiResponse::ok(summary)))
}
