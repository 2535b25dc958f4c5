//! Machine handlers

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
use crate::services::machine::{
    CreateMachineInput, Machine, MachineFilter, MaintenanceWindow, UpdateMachineInput,
};
use crate::services::MachineService;
use crate::AppState;

pub async fn list_machines(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(pagination): Query<PaginationQuery>,
    Query(filter): Query<MachineFilter>,
) -> AppResult<Json<ApiResponse<Vec<Machine>>>> {
    let page = page_of(&state, &pagination);
    let machines = MachineService::new(state.db).list(&filter, page).await?;
    Ok(Json(ApiResponse::paginated(machines.data, machines.pagination)))
}

pub async fn get_machine(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Machine>>> {
    let machine = MachineService::new(state.db).get(id).await?;
    Ok(Json(ApiResponse::ok(machine)))
}

pub async fn create_machine(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateMachineInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Machine>>)> {
    current_user.require_role(access::FLOOR)?;
    let machine = MachineService::new(state.db).create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(machine).with_message("Machine created")),
    ))
}

pub async fn update_machine(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateMachineInput>,
) -> AppResult<Json<ApiResponse<Machine>>> {
    current_user.require_role(access::FLOOR)?;
    let machine = MachineService::new(state.db).update(id, input).await?;
    Ok(Json(ApiResponse::ok(machine).with_message("Machine updated")))
}

pub async fn delete_machine(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require_role(access::FLOOR)?;
    MachineService::new(state.db).delete(id).await?;
    Ok(Json(ApiResponse::message("Machine deleted")))
}

/// Machines whose next maintenance falls within `days` (default 7)
pub async fn maintenance_due(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(window): Query<MaintenanceWindow>,
) -> AppResult<Json<ApiResponse<Vec<Machine>>>> {
    let machines = MachineService::new(state.db)
        .maintenance_due(window.days)
        .await?;
    Ok(Json(ApiResponse::ok(machines)))
}
