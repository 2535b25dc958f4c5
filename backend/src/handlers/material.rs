//! Material and stock ledger handlers

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use shared::{access, ApiResponse, PaginationQuery};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::page_of;
use crate::middleware::CurrentUser;
use crate::services::material::{
    CreateMaterialInput, Material, MaterialDetail, MaterialFilter, MaterialTransaction,
    StockMovement, StockTransactionInput, UpdateMaterialInput,
};
use crate::services::MaterialService;
use crate::AppState;

pub async fn list_materials(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(pagination): Query<PaginationQuery>,
    Query(filter): Query<MaterialFilter>,
) -> AppResult<Json<ApiResponse<Vec<Material>>>> {
    let page = page_of(&state, &pagination);
    let materials = MaterialService::new(state.db).list(&filter, page).await?;
    Ok(Json(ApiResponse::paginated(materials.data, materials.pagination)))
}

/// Material with supplier name and latest ledger entries
pub async fn get_material(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MaterialDetail>>> {
    let material = MaterialService::new(state.db).get(id).await?;
    Ok(Json(ApiResponse::ok(material)))
}

pub async fn create_material(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateMaterialInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<Material>>)> {
    current_user.require_role(access::FLOOR)?;
    let material = MaterialService::new(state.db)
        .create(input, current_user.id())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(material).with_message("Material created")),
    ))
}

pub async fn update_material(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateMaterialInput>,
) -> AppResult<Json<ApiResponse<Material>>> {
    current_user.require_role(access::FLOOR)?;
    let material = MaterialService::new(state.db).update(id, input).await?;
    Ok(Json(ApiResponse::ok(material).with_message("Material updated")))
}

pub async fn delete_material(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require_role(access::FLOOR)?;
    MaterialService::new(state.db).delete(id).await?;
    Ok(Json(ApiResponse::message("Material deleted")))
}

pub async fn low_stock_materials(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<Material>>>> {
    let materials = MaterialService::new(state.db).low_stock().await?;
    Ok(Json(ApiResponse::ok(materials)))
}

pub async fn list_material_transactions(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(pagination): Query<PaginationQuery>,
) -> AppResult<Json<ApiResponse<Vec<MaterialTransaction>>>> {
    let page = page_of(&state, &pagination);
    let ledger = MaterialService::new(state.db).transactions(id, page).await?;
    Ok(Json(ApiResponse::paginated(ledger.data, ledger.pagination)))
}

/// Book an IN or OUT movement
pub async fn record_material_transaction(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<StockTransactionInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<StockMovement>>)> {
    current_user.require_role(access::FLOOR)?;
    let movement = MaterialService::new(state.db)
        .record_transaction(id, input, current_user.id())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(movement).with_message("Stock updated")),
    ))
}

/// Download the stock sheet as CSV
pub async fn export_materials(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    let csv = MaterialService::new(state.db).export_csv().await?;
    let disposition = format!(
        "attachment; filename=\"materials-{}.csv\"",
        Utc::now().format("%Y%m%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}
