//! Purchase order handlers

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
use crate::services::purchase_order::{
    CreatePurchaseOrderInput, PurchaseOrderDetail, PurchaseOrderFilter, PurchaseOrderListItem,
    PurchaseOrderStats, ReceiveItemsInput, UpdatePurchaseOrderInput,
};
use crate::services::PurchaseOrderService;
use crate::AppState;

pub async fn list_purchase_orders(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(pagination): Query<PaginationQuery>,
    Query(filter): Query<PurchaseOrderFilter>,
) -> AppResult<Json<ApiResponse<Vec<PurchaseOrderListItem>>>> {
    let page = page_of(&state, &pagination);
    let orders = PurchaseOrderService::new(state.db).list(&filter, page).await?;
    Ok(Json(ApiResponse::paginated(orders.data, orders.pagination)))
}

/// Order with supplier and items
pub async fn get_purchase_order(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PurchaseOrderDetail>>> {
    let order = PurchaseOrderService::new(state.db).get(id).await?;
    Ok(Json(ApiResponse::ok(order)))
}

pub async fn create_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreatePurchaseOrderInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<PurchaseOrderDetail>>)> {
    current_user.require_role(access::PURCHASING)?;
    let order = PurchaseOrderService::new(state.db)
        .create(input, current_user.id())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(order).with_message("Purchase order created")),
    ))
}

pub async fn update_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePurchaseOrderInput>,
) -> AppResult<Json<ApiResponse<PurchaseOrderDetail>>> {
    current_user.require_role(access::PURCHASING)?;
    let order = PurchaseOrderService::new(state.db).update(id, input).await?;
    Ok(Json(ApiResponse::ok(order).with_message("Purchase order updated")))
}

pub async fn submit_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PurchaseOrderDetail>>> {
    current_user.require_role(access::PURCHASING)?;
    let order = PurchaseOrderService::new(state.db).submit(id).await?;
    Ok(Json(
        ApiResponse::ok(order).with_message("Purchase order submitted for approval"),
    ))
}

pub async fn approve_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PurchaseOrderDetail>>> {
    current_user.require_role(access::MANAGEMENT)?;
    let order = PurchaseOrderService::new(state.db)
        .approve(id, current_user.id())
        .await?;
    Ok(Json(ApiResponse::ok(order).with_message("Purchase order approved")))
}

pub async fn cancel_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PurchaseOrderDetail>>> {
    current_user.require_role(access::MANAGEMENT)?;
    let order = PurchaseOrderService::new(state.db).cancel(id).await?;
    Ok(Json(ApiResponse::ok(order).with_message("Purchase order cancelled")))
}

/// Record received quantities and book them into stock
pub async fn receive_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ReceiveItemsInput>,
) -> AppResult<Json<ApiResponse<PurchaseOrderDetail>>> {
    current_user.require_role(access::RECEIVING)?;
    let order = PurchaseOrderService::new(state.db)
        .receive(id, input, current_user.id())
        .await?;
    Ok(Json(ApiResponse::ok(order).with_message("Items received")))
}

pub async fn delete_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    current_user.require_role(access::PURCHASING)?;
    PurchaseOrderService::new(state.db).delete(id).await?;
    Ok(Json(ApiResponse::message("Purchase order deleted")))
}

pub async fn purchase_order_stats(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<ApiResponse<PurchaseOrderStats>>> {
    let stats = PurchaseOrderService::new(state.db).summary().await?;
    Ok(Json(ApiResponse::ok(stats)))
}
