//! Supplier handlers

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
use crate::services::supplier::{
    CreateSupplierInput, Supplier, SupplierFilter, SupplierListItem, UpdateSupplierInput,
};
use crate::services::SupplierService;
use crate::AppState;

pub async fn list_suppliers(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(pagination): Query<PaginationQuery>,
    Query(filter): Query<SupplierFilter>,
) -> AppResult<Json<ApiResponse<Vec<SupplierListItem>>>> {
    let page = page_of(&state, &pagination);
    let suppliers = SupplierService::new(state.db).list(&filter, page).await?;
    Ok(Json(ApiResponse::paginated(suppliers.data, suppliers.pagination)))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Supplier>>> {
    let supplier = SupplierService::new(state.db).get(id).await?;
    Ok(Json(ApiResponse::ok(supplier)))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateSupplierInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Supplier>>)> {
    current_user.require_role(access::PURCHASING)?;
    let supplier = SupplierService::new(state.db).create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(supplier).with_message("Supplier created")),
    ))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateSupplierInput>,
) -> AppResult<Json<ApiResponse<Supplier>>> {
    current_user.require_role(access::PURCHASING)?;
    let supplier = SupplierService::new(state.db).update(id, input).await?;
    Ok(Json(ApiResponse::ok(supplier).with_message("Supplier updated")))
}

/// Only suppliers without purchase orders can be removed
pub async fn delete_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require_role(access::PURCHASING)?;
    SupplierService::new(state.db).delete(id).await?;
    Ok(Json(ApiResponse::message("Supplier deleted")))
}
