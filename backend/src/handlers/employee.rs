//! Employee handlers

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
use crate::services::employee::{
    CreateEmployeeInput, Employee, EmployeeFilter, UpdateEmployeeInput,
};
use crate::services::EmployeeService;
use crate::AppState;

pub async fn list_employees(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(pagination): Query<PaginationQuery>,
    Query(filter): Query<EmployeeFilter>,
) -> AppResult<Json<ApiResponse<Vec<Employee>>>> {
    let page = page_of(&state, &pagination);
    let employees = EmployeeService::new(state.db).list(&filter, page).await?;
    Ok(Json(ApiResponse::paginated(employees.data, employees.pagination)))
}

pub async fn get_employee(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Employee>>> {
    let employee = EmployeeService::new(state.db).get(id).await?;
    Ok(Json(ApiResponse::ok(employee)))
}

pub async fn create_employee(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateEmployeeInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Employee>>)> {
    current_user.require_role(access::FLOOR)?;
    let employee = EmployeeService::new(state.db).create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(employee).with_message("Employee created")),
    ))
}

pub async fn update_employee(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateEmployeeInput>,
) -> AppResult<Json<ApiResponse<Employee>>> {
    current_user.require_role(access::FLOOR)?;
    let employee = EmployeeService::new(state.db).update(id, input).await?;
    Ok(Json(ApiResponse::ok(employee).with_message("Employee updated")))
}

pub async fn delete_employee(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require_role(access::FLOOR)?;
    EmployeeService::new(state.db).delete(id).await?;
    Ok(Json(ApiResponse::message("Employee deleted")))
}
