//! Purchase order service
//!
//! Lifecycle rules and receiving arithmetic live in `shared`; this service
//! loads and locks the rows, applies the outcome and books received goods
//! into material stock, all inside one transaction per operation.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    reconcile_receipt, CodeKind, ItemProgress, NotificationType, Page, PurchaseOrderError,
    PurchaseOrderStatus, PurchaseOrderTotals, ReceiptLine, TransactionType,
};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::material::record_movement;
use crate::services::notification::{notify_users, NewNotification};
use crate::services::{code, ensure_exists, like_pattern, search_term, validate_list, Paginated};

/// Purchase order service
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub po_number: String,
    pub supplier_id: Uuid,
    pub created_by: Uuid,
    pub status: PurchaseOrderStatus,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub shipping_cost: Decimal,
    pub total_amount: Decimal,
    pub order_date: NaiveDate,
    pub expected_date: Option<NaiveDate>,
    pub received_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    fn totals(&self) -> PurchaseOrderTotals {
        PurchaseOrderTotals {
            subtotal: self.subtotal,
            tax_rate: self.tax_rate,
            tax_amount: self.tax_amount,
            shipping_cost: self.shipping_cost,
            total_amount: self.total_amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderItem {
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub line_no: i32,
    pub material_id: Option<Uuid>,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
    pub received_qty: Decimal,
}

impl PurchaseOrderItem {
    fn progress(&self) -> ItemProgress {
        ItemProgress {
            id: self.id,
            quantity: self.quantity,
            received_qty: self.received_qty,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SupplierRef {
    pub id: Uuid,
    pub code: String,
    pub name: String,
}

/// Order with supplier and items
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderDetail {
    #[serde(flatten)]
    pub order: PurchaseOrder,
    pub supplier: SupplierRef,
    pub items: Vec<PurchaseOrderItem>,
}

/// Row of the order list
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: PurchaseOrder,
    pub supplier_name: String,
    pub item_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub status: PurchaseOrderStatus,
    pub count: i64,
    pub total_amount: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderStats {
    pub total_orders: i64,
    pub total_spent: Decimal,
    pub by_status: Vec<StatusSummary>,
    pub recent_orders: Vec<PurchaseOrderListItem>,
}

impl PurchaseOrderStats {
    /// Fold per-status rows into totals
    pub fn from_summaries(
        by_status: Vec<StatusSummary>,
        recent_orders: Vec<PurchaseOrderListItem>,
    ) -> Self {
        let total_orders = by_status.iter().map(|s| s.count).sum();
        let total_spent = by_status
            .iter()
            .filter(|s| s.status.counts_as_spent())
            .map(|s| s.total_amount)
            .sum();
        Self {
            total_orders,
            total_spent,
            by_status,
            recent_orders,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderItemInput {
    pub material_id: Option<Uuid>,
    #[validate(length(min = 1, max = 500, message = "Description is required"))]
    pub description: String,
    #[validate(custom = "shared::positive_quantity")]
    pub quantity: Decimal,
    #[validate(custom = "shared::non_negative_amount")]
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseOrderInput {
    pub supplier_id: Uuid,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<PurchaseOrderItemInput>,
    #[validate(custom = "shared::percentage")]
    pub tax_rate: Option<Decimal>,
    #[validate(custom = "shared::non_negative_amount")]
    pub shipping_cost: Option<Decimal>,
    pub order_date: Option<NaiveDate>,
    pub expected_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(max = 2000))]
    pub terms: Option<String>,
    pub status: Option<PurchaseOrderStatus>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePurchaseOrderInput {
    pub supplier_id: Option<Uuid>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Option<Vec<PurchaseOrderItemInput>>,
    #[validate(custom = "shared::percentage")]
    pub tax_rate: Option<Decimal>,
    #[validate(custom = "shared::non_negative_amount")]
    pub shipping_cost: Option<Decimal>,
    pub order_date: Option<NaiveDate>,
    pub expected_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(max = 2000))]
    pub terms: Option<String>,
    pub status: Option<PurchaseOrderStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiveItemsInput {
    pub items: Vec<ReceiptLine>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderFilter {
    pub status: Option<PurchaseOrderStatus>,
    pub supplier_id: Option<Uuid>,
    pub search: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

const ORDER_COLUMNS: &str = "id, po_number, supplier_id, created_by, status, subtotal, tax_rate, \
     tax_amount, shipping_cost, total_amount, order_date, expected_date, received_date, notes, \
     terms, approved_by, approved_at, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, purchase_order_id, line_no, material_id, description, quantity, \
     unit_price, amount, received_qty";

const LIST_SELECT: &str = "SELECT po.id, po.po_number, po.supplier_id, po.created_by, po.status, \
     po.subtotal, po.tax_rate, po.tax_amount, po.shipping_cost, po.total_amount, po.order_date, \
     po.expected_date, po.received_date, po.notes, po.terms, po.approved_by, po.approved_at, \
     po.created_at, po.updated_at, s.name AS supplier_name, \
     (SELECT COUNT(*) FROM purchase_order_items i WHERE i.purchase_order_id = po.id) AS item_count \
     FROM purchase_orders po JOIN suppliers s ON s.id = po.supplier_id WHERE TRUE";

impl PurchaseOrderService {
    /// Create a new PurchaseOrderService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        filter: &PurchaseOrderFilter,
        page: Page,
    ) -> AppResult<Paginated<PurchaseOrderListItem>> {
        if matches!((filter.start_date, filter.end_date), (Some(s), Some(e)) if s > e) {
            return Ok(Paginated {
                data: Vec::new(),
                pagination: page.meta(0),
            });
        }

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM purchase_orders po WHERE TRUE",
        );
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut query = QueryBuilder::<Postgres>::new(LIST_SELECT);
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY po.created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let data = query
            .build_query_as::<PurchaseOrderListItem>()
            .fetch_all(&self.db)
            .await?;

        Ok(Paginated {
            data,
            pagination: page.meta(total),
        })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<PurchaseOrderDetail> {
        let mut conn = self.db.acquire().await?;
        load_detail(&mut conn, id).await
    }

    /// Create an order with its items
    #[tracing::instrument(skip(self, input), fields(supplier_id = %input.supplier_id))]
    pub async fn create(
        &self,
        input: CreatePurchaseOrderInput,
        user_id: Uuid,
    ) -> AppResult<PurchaseOrderDetail> {
        input.validate()?;
        validate_list("items", &input.items)?;
        if input.items.is_empty() {
            return Err(PurchaseOrderError::NoItems.into());
        }
        let status = PurchaseOrderStatus::initial(input.status)?;
        let totals = PurchaseOrderTotals::compute(
            input.items.iter().map(|i| (i.quantity, i.unit_price)),
            input.tax_rate.unwrap_or(Decimal::ZERO),
            input.shipping_cost.unwrap_or(Decimal::ZERO),
        )?;

        let mut tx = self.db.begin().await?;
        ensure_exists(&mut tx, "suppliers", input.supplier_id, "Supplier").await?;
        ensure_materials_exist(&mut tx, &input.items).await?;

        let po_number = code::next_code(&mut tx, CodeKind::PurchaseOrder).await?;
        let order = sqlx::query_as::<_, PurchaseOrder>(&format!(
            r#"
            INSERT INTO purchase_orders
                (po_number, supplier_id, created_by, status, subtotal, tax_rate, tax_amount,
                 shipping_cost, total_amount, order_date, expected_date, notes, terms)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, COALESCE($10, CURRENT_DATE), $11, $12, $13)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(&po_number)
        .bind(input.supplier_id)
        .bind(user_id)
        .bind(status)
        .bind(totals.subtotal)
        .bind(totals.tax_rate)
        .bind(totals.tax_amount)
        .bind(totals.shipping_cost)
        .bind(totals.total_amount)
        .bind(input.order_date)
        .bind(input.expected_date)
        .bind(&input.notes)
        .bind(&input.terms)
        .fetch_one(&mut *tx)
        .await?;

        insert_items(&mut tx, order.id, &input.items).await?;
        let detail = load_detail(&mut tx, order.id).await?;
        tx.commit().await?;

        tracing::info!(po_id = %order.id, %po_number, total = %order.total_amount, "Purchase order created");
        Ok(detail)
    }

    /// Edit a non-terminal order
    ///
    /// Supplied items replace the existing ones. Totals are always recomputed
    /// from the effective items, tax rate and shipping cost.
    #[tracing::instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdatePurchaseOrderInput,
    ) -> AppResult<PurchaseOrderDetail> {
        input.validate()?;
        if let Some(items) = &input.items {
            validate_list("items", items)?;
        }

        let mut tx = self.db.begin().await?;
        let current = lock_order(&mut tx, id).await?;
        current.status.ensure_editable()?;
        let status = match input.status {
            Some(requested) => current.status.edit_to(requested)?,
            None => current.status,
        };

        if let Some(supplier_id) = input.supplier_id {
            ensure_exists(&mut tx, "suppliers", supplier_id, "Supplier").await?;
        }

        let tax_rate = input.tax_rate.unwrap_or(current.tax_rate);
        let shipping_cost = input.shipping_cost.unwrap_or(current.shipping_cost);

        let totals = match &input.items {
            Some(items) => {
                if items.is_empty() {
                    return Err(PurchaseOrderError::NoItems.into());
                }
                let existing = load_items(&mut tx, id).await?;
                if existing.iter().any(|i| i.received_qty > Decimal::ZERO) {
                    return Err(AppError::InvalidStateTransition(
                        "Items cannot be replaced after goods have been received".to_string(),
                    ));
                }
                ensure_materials_exist(&mut tx, items).await?;
                sqlx::query("DELETE FROM purchase_order_items WHERE purchase_order_id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                insert_items(&mut tx, id, items).await?;
                PurchaseOrderTotals::compute(
                    items.iter().map(|i| (i.quantity, i.unit_price)),
                    tax_rate,
                    shipping_cost,
                )?
            }
            None if input.tax_rate.is_some() || input.shipping_cost.is_some() => {
                let existing = load_items(&mut tx, id).await?;
                PurchaseOrderTotals::compute(
                    existing.iter().map(|i| (i.quantity, i.unit_price)),
                    tax_rate,
                    shipping_cost,
                )?
            }
            None => current.totals(),
        };

        sqlx::query(
            r#"
            UPDATE purchase_orders SET
                supplier_id = COALESCE($2, supplier_id),
                status = $3,
                subtotal = $4,
                tax_rate = $5,
                tax_amount = $6,
                shipping_cost = $7,
                total_amount = $8,
                order_date = COALESCE($9, order_date),
                expected_date = COALESCE($10, expected_date),
                notes = COALESCE($11, notes),
                terms = COALESCE($12, terms),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(input.supplier_id)
        .bind(status)
        .bind(totals.subtotal)
        .bind(totals.tax_rate)
        .bind(totals.tax_amount)
        .bind(totals.shipping_cost)
        .bind(totals.total_amount)
        .bind(input.order_date)
        .bind(input.expected_date)
        .bind(&input.notes)
        .bind(&input.terms)
        .execute(&mut *tx)
        .await?;

        let detail = load_detail(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(po_id = %id, status = %status, "Purchase order updated");
        Ok(detail)
    }

    /// `DRAFT → PENDING_APPROVAL`
    #[tracing::instrument(skip(self))]
    pub async fn submit(&self, id: Uuid) -> AppResult<PurchaseOrderDetail> {
        let mut tx = self.db.begin().await?;
        let current = lock_order(&mut tx, id).await?;
        let status = current.status.submit()?;

        sqlx::query("UPDATE purchase_orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut *tx)
            .await?;

        let detail = load_detail(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(po_id = %id, "Purchase order submitted for approval");
        Ok(detail)
    }

    /// `PENDING_APPROVAL → APPROVED`, stamping the approver
    #[tracing::instrument(skip(self))]
    pub async fn approve(&self, id: Uuid, approver_id: Uuid) -> AppResult<PurchaseOrderDetail> {
        let mut tx = self.db.begin().await?;
        let current = lock_order(&mut tx, id).await?;
        let status = current.status.approve()?;

        sqlx::query(
            r#"
            UPDATE purchase_orders
            SET status = $2, approved_by = $3, approved_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(approver_id)
        .execute(&mut *tx)
        .await?;

        let notification = NewNotification::new(
            NotificationType::Success,
            "Purchase order approved",
            format!("{} has been approved", current.po_number),
        )
        .with_link(format!("/purchase-orders/{}", id));
        notify_users(&mut tx, &[current.created_by], &notification).await?;

        let detail = load_detail(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(po_id = %id, %approver_id, "Purchase order approved");
        Ok(detail)
    }

    /// Move any non-terminal order to `CANCELLED`
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, id: Uuid) -> AppResult<PurchaseOrderDetail> {
        let mut tx = self.db.begin().await?;
        let current = lock_order(&mut tx, id).await?;
        let status = current.status.cancel()?;

        sqlx::query("UPDATE purchase_orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&mut *tx)
            .await?;

        let detail = load_detail(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(po_id = %id, from = %current.status, "Purchase order cancelled");
        Ok(detail)
    }

    /// Record goods received against the order
    ///
    /// The order and the touched materials stay locked until commit, so two
    /// concurrent receipts are applied one after the other. Materials are
    /// always locked in id order.
    #[tracing::instrument(skip(self, input))]
    pub async fn receive(
        &self,
        id: Uuid,
        input: ReceiveItemsInput,
        user_id: Uuid,
    ) -> AppResult<PurchaseOrderDetail> {
        let mut tx = self.db.begin().await?;
        let order = lock_order(&mut tx, id).await?;
        let items = sqlx::query_as::<_, PurchaseOrderItem>(&format!(
            "SELECT {} FROM purchase_order_items WHERE purchase_order_id = $1 \
             ORDER BY line_no FOR UPDATE",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let progress: Vec<ItemProgress> = items.iter().map(PurchaseOrderItem::progress).collect();
        let outcome = reconcile_receipt(order.status, &progress, &input.items)?;

        for (item_id, quantity) in &outcome.increments {
            sqlx::query(
                "UPDATE purchase_order_items SET received_qty = received_qty + $2 WHERE id = $1",
            )
            .bind(item_id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }

        for (material_id, quantity) in stock_bookings(&items, &outcome.increments) {
            record_movement(
                &mut tx,
                material_id,
                TransactionType::In,
                quantity,
                Some(&order.po_number),
                Some("Received against purchase order"),
                Some(user_id),
            )
            .await?;
        }

        sqlx::query(
            r#"
            UPDATE purchase_orders SET
                status = $2,
                received_date = CASE WHEN $3 THEN CURRENT_DATE ELSE received_date END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(outcome.status)
        .bind(outcome.is_complete())
        .execute(&mut *tx)
        .await?;

        let detail = load_detail(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(
            po_id = %id,
            lines = outcome.increments.len(),
            status = %outcome.status,
            "Purchase order goods received"
        );
        Ok(detail)
    }

    /// Delete a `DRAFT` order and its items
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let current = lock_order(&mut tx, id).await?;
        current.status.ensure_deletable()?;

        sqlx::query("DELETE FROM purchase_orders WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(po_id = %id, po_number = %current.po_number, "Purchase order deleted");
        Ok(())
    }

    /// Counts and amounts per status, money spent and the latest orders
    pub async fn summary(&self) -> AppResult<PurchaseOrderStats> {
        let by_status = sqlx::query_as::<_, StatusSummary>(
            r#"
            SELECT status, COUNT(*) AS count, COALESCE(SUM(total_amount), 0) AS total_amount
            FROM purchase_orders
            GROUP BY status
            ORDER BY status
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let recent_orders = sqlx::query_as::<_, PurchaseOrderListItem>(&format!(
            "{} ORDER BY po.created_at DESC LIMIT 5",
            LIST_SELECT
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(PurchaseOrderStats::from_summaries(by_status, recent_orders))
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &PurchaseOrderFilter) {
    if let Some(status) = filter.status {
        query.push(" AND po.status = ").push_bind(status);
    }
    if let Some(supplier_id) = filter.supplier_id {
        query.push(" AND po.supplier_id = ").push_bind(supplier_id);
    }
    if let Some(term) = search_term(&filter.search) {
        query
            .push(" AND po.po_number ILIKE ")
            .push_bind(like_pattern(term));
    }
    if let Some(start) = filter.start_date {
        query.push(" AND po.order_date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        query.push(" AND po.order_date <= ").push_bind(end);
    }
}

async fn lock_order(conn: &mut PgConnection, id: Uuid) -> AppResult<PurchaseOrder> {
    sqlx::query_as::<_, PurchaseOrder>(&format!(
        "SELECT {} FROM purchase_orders WHERE id = $1 FOR UPDATE",
        ORDER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::not_found("Purchase order"))
}

async fn load_items(conn: &mut PgConnection, id: Uuid) -> AppResult<Vec<PurchaseOrderItem>> {
    let items = sqlx::query_as::<_, PurchaseOrderItem>(&format!(
        "SELECT {} FROM purchase_order_items WHERE purchase_order_id = $1 ORDER BY line_no",
        ITEM_COLUMNS
    ))
    .bind(id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

async fn load_detail(conn: &mut PgConnection, id: Uuid) -> AppResult<PurchaseOrderDetail> {
    let order = sqlx::query_as::<_, PurchaseOrder>(&format!(
        "SELECT {} FROM purchase_orders WHERE id = $1",
        ORDER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("Purchase order"))?;

    let supplier = sqlx::query_as::<_, SupplierRef>(
        "SELECT id, code, name FROM suppliers WHERE id = $1",
    )
    .bind(order.supplier_id)
    .fetch_one(&mut *conn)
    .await?;

    let items = load_items(conn, id).await?;

    Ok(PurchaseOrderDetail {
        order,
        supplier,
        items,
    })
}

async fn insert_items(
    conn: &mut PgConnection,
    purchase_order_id: Uuid,
    items: &[PurchaseOrderItemInput],
) -> AppResult<()> {
    let amounts = items
        .iter()
        .map(|item| shared::line_amount(item.quantity, item.unit_price))
        .collect::<Result<Vec<_>, _>>()?;

    let mut query = QueryBuilder::<Postgres>::new(
        "INSERT INTO purchase_order_items \
         (purchase_order_id, line_no, material_id, description, quantity, unit_price, amount) ",
    );
    query.push_values(items.iter().zip(amounts).enumerate(), |mut row, (index, (item, amount))| {
        row.push_bind(purchase_order_id)
            .push_bind(index as i32 + 1)
            .push_bind(item.material_id)
            .push_bind(item.description.trim().to_string())
            .push_bind(item.quantity)
            .push_bind(item.unit_price)
            .push_bind(amount);
    });
    query.build().execute(conn).await?;
    Ok(())
}

/// Stock to book per received item with a linked material, ordered by
/// material id so concurrent receipts lock materials in the same order
fn stock_bookings(
    items: &[PurchaseOrderItem],
    increments: &[(Uuid, Decimal)],
) -> Vec<(Uuid, Decimal)> {
    let mut bookings: Vec<(Uuid, Decimal)> = increments
        .iter()
        .filter_map(|(item_id, quantity)| {
            items
                .iter()
                .find(|item| item.id == *item_id)
                .and_then(|item| item.material_id)
                .map(|material_id| (material_id, *quantity))
        })
        .collect();
    bookings.sort_by_key(|(material_id, _)| *material_id);
    bookings
}

async fn ensure_materials_exist(
    conn: &mut PgConnection,
    items: &[PurchaseOrderItemInput],
) -> AppResult<()> {
    let wanted: HashSet<Uuid> = items.iter().filter_map(|i| i.material_id).collect();
    if wanted.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = wanted.iter().copied().collect();
    let found: HashSet<Uuid> =
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM materials WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(conn)
            .await?
            .into_iter()
            .collect();

    match wanted.iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(AppError::not_found(format!("Material {}", missing))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(status: PurchaseOrderStatus, count: i64, total: i64) -> StatusSummary {
        StatusSummary {
            status,
            count,
            total_amount: Decimal::from(total),
        }
    }

    #[test]
    fn test_stats_total_spent() {
        let stats = PurchaseOrderStats::from_summaries(
            vec![
                summary(PurchaseOrderStatus::Draft, 2, 300),
                summary(PurchaseOrderStatus::Approved, 1, 1000),
                summary(PurchaseOrderStatus::PartiallyReceived, 1, 250),
                summary(PurchaseOrderStatus::Received, 3, 900),
                summary(PurchaseOrderStatus::Cancelled, 1, 75),
            ],
            Vec::new(),
        );
        assert_eq!(stats.total_orders, 8);
        assert_eq!(stats.total_spent, Decimal::from(1150));
    }

    #[test]
    fn test_create_input_validation() {
        let input: CreatePurchaseOrderInput = serde_json::from_value(serde_json::json!({
            "supplierId": Uuid::new_v4(),
            "items": [],
            "taxRate": "120"
        }))
        .unwrap();
        let err = input.validate().unwrap_err();
        let fields = err.field_errors();
        assert!(fields.contains_key("items"));
        assert!(fields.contains_key("tax_rate") || fields.contains_key("taxRate"));
    }

    fn line(no: i32, material_id: Option<Uuid>) -> PurchaseOrderItem {
        PurchaseOrderItem {
            id: Uuid::new_v4(),
            purchase_order_id: Uuid::nil(),
            line_no: no,
            material_id,
            description: format!("Line {}", no),
            quantity: Decimal::from(10),
            unit_price: Decimal::ONE,
            amount: Decimal::from(10),
            received_qty: Decimal::ZERO,
        }
    }

    #[test]
    fn test_stock_bookings_follow_material_order() {
        let mut ids = [Uuid::new_v4(), Uuid::new_v4()];
        ids.sort();
        let [low, high] = ids;
        let items = vec![line(1, Some(high)), line(2, None), line(3, Some(low))];
        let increments = vec![
            (items[0].id, Decimal::from(2)),
            (items[1].id, Decimal::from(3)),
            (items[2].id, Decimal::from(4)),
        ];

        let bookings = stock_bookings(&items, &increments);
        assert_eq!(
            bookings,
            vec![(low, Decimal::from(4)), (high, Decimal::from(2))]
        );

        // Same materials listed the other way round lock in the same order
        let reversed: Vec<_> = increments.iter().rev().copied().collect();
        assert_eq!(stock_bookings(&items, &reversed), bookings);
    }

    #[test]
    fn test_receive_input_shape() {
        let id = Uuid::new_v4();
        let input: ReceiveItemsInput = serde_json::from_value(serde_json::json!({
            "items": [{ "id": id, "quantity": 4 }]
        }))
        .unwrap();
        assert_eq!(input.items[0].id, id);
        assert_eq!(input.items[0].quantity, Decimal::from(4));
    }
}
