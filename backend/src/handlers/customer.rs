//! Customer handlers

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
use crate::services::customer::{
    CreateCustomerInput, Customer, CustomerFilter, CustomerListItem, UpdateCustomerInput,
};
use crate::services::CustomerService;
use crate::AppState;

pub async fn list_customers(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(pagination): Query<PaginationQuery>,
    Query(filter): Query<CustomerFilter>,
) -> AppResult<Json<ApiResponse<Vec<CustomerListItem>>>> {
    let page = page_of(&state, &pagination);
    let customers = CustomerService::new(state.db).list(&filter, page).await?;
    Ok(Json(ApiResponse::paginated(customers.data, customers.pagination)))
}

pub async fn get_customer(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    let customer = CustomerService::new(state.db).get(id).await?;
    Ok(Json(ApiResponse::ok(customer)))
}

pub async fn create_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateCustomerInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Customer>>)> {
    current_user.require_role(access::FRONT_DESK)?;
    let customer = CustomerService::new(state.db).create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(customer).with_message("Customer created")),
    ))
}

pub async fn update_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCustomerInput>,
) -> AppResult<Json<ApiResponse<Customer>>> {
    current_user.require_role(access::FRONT_DESK)?;
    let customer = CustomerService::new(state.db).update(id, input).await?;
    Ok(Json(ApiResponse::ok(customer).with_message("Customer updated")))
}

/// Only customers without measurements on file can be removed
pub async fn delete_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require_role(access::MANAGEMENT)?;
    CustomerService::new(state.db).delete(id).await?;
    Ok(Json(ApiResponse::message("Customer deleted")))
}
