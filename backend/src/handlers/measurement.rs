//! Measurement handlers

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
use crate::services::measurement::{
    CreateMeasurementInput, Measurement, MeasurementEntry, MeasurementFilter,
    UpdateMeasurementInput,
};
use crate::services::MeasurementService;
use crate::AppState;

pub async fn list_measurements(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(pagination): Query<PaginationQuery>,
    Query(filter): Query<MeasurementFilter>,
) -> AppResult<Json<ApiResponse<Vec<MeasurementEntry>>>> {
    let page = page_of(&state, &pagination);
    let measurements = MeasurementService::new(state.db).list(&filter, page).await?;
    Ok(Json(ApiResponse::paginated(
        measurements.data,
        measurements.pagination,
    )))
}

pub async fn get_measurement(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MeasurementEntry>>> {
    let measurement = MeasurementService::new(state.db).get(id).await?;
    Ok(Json(ApiResponse::ok(measurement)))
}

pub async fn create_measurement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateMeasurementInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Measurement>>)> {
    current_user.require_role(access::FRONT_DESK)?;
    let measurement = MeasurementService::new(state.db)
        .create(input, current_user.id())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(measurement).with_message("Measurement recorded")),
    ))
}

pub async fn update_measurement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateMeasurementInput>,
) -> AppResult<Json<ApiResponse<Measurement>>> {
    current_user.require_role(access::FRONT_DESK)?;
    let measurement = MeasurementService::new(state.db).update(id, input).await?;
    Ok(Json(ApiResponse::ok(measurement).with_message("Measurement updated")))
}

pub async fn delete_measurement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require_role(access::MANAGEMENT)?;
    MeasurementService::new(state.db).delete(id).await?;
    Ok(Json(ApiResponse::message("Measurement deleted")))
}
