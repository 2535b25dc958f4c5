//! Material inventory service
//!
//! Stock only moves through the transaction ledger. Every movement recomputes
//! the stored status in the same database transaction, and a material that
//! drops to low or out of stock raises a warning for management.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    access, apply_movement, CodeKind, MaterialStatus, NotificationType, Page, TransactionType,
};
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::notification::{notify_roles, NewNotification};
use crate::services::{code, ensure_exists, like_pattern, search_term, Paginated};

/// Material service for stock levels and the stock ledger
#[derive(Clone)]
pub struct MaterialService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub quantity: Decimal,
    pub min_quantity: Decimal,
    pub unit_price: Decimal,
    pub supplier_id: Option<Uuid>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub status: MaterialStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MaterialTransaction {
    pub id: Uuid,
    pub material_id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub quantity: Decimal,
    pub balance_after: Decimal,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Material together with its latest ledger entries
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDetail {
    #[serde(flatten)]
    pub material: Material,
    pub supplier_name: Option<String>,
    pub recent_transactions: Vec<MaterialTransaction>,
}

/// Result of a single stock movement
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub material: Material,
    pub transaction: MaterialTransaction,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaterialInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 100, message = "Category is required"))]
    pub category: String,
    #[validate(length(min = 1, max = 20, message = "Unit is required"))]
    pub unit: String,
    #[validate(custom = "shared::non_negative_quantity")]
    #[serde(default)]
    pub quantity: Decimal,
    #[validate(custom = "shared::non_negative_quantity")]
    #[serde(default)]
    pub min_quantity: Decimal,
    #[validate(custom = "shared::non_negative_amount")]
    #[serde(default)]
    pub unit_price: Decimal,
    pub supplier_id: Option<Uuid>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

/// Editable attributes; stock quantity changes go through transactions
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaterialInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub unit: Option<String>,
    #[validate(custom = "shared::non_negative_quantity")]
    pub min_quantity: Option<Decimal>,
    #[validate(custom = "shared::non_negative_amount")]
    pub unit_price: Option<Decimal>,
    pub supplier_id: Option<Uuid>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StockTransactionInput {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    #[validate(custom = "shared::positive_quantity")]
    pub quantity: Decimal,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<MaterialStatus>,
    pub supplier_id: Option<Uuid>,
}

/// One row of the stock export
#[derive(Debug, Serialize)]
struct StockRecord<'a> {
    #[serde(rename = "Code")]
    code: &'a str,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Category")]
    category: &'a str,
    #[serde(rename = "Unit")]
    unit: &'a str,
    #[serde(rename = "Quantity")]
    quantity: Decimal,
    #[serde(rename = "Min Quantity")]
    min_quantity: Decimal,
    #[serde(rename = "Unit Price")]
    unit_price: Decimal,
    #[serde(rename = "Stock Value")]
    stock_value: Decimal,
    #[serde(rename = "Status")]
    status: &'a str,
    #[serde(rename = "Location")]
    location: &'a str,
}

const MATERIAL_COLUMNS: &str = "id, code, name, category, unit, quantity, min_quantity, \
     unit_price, supplier_id, location, description, status, created_at, updated_at";

const TRANSACTION_COLUMNS: &str = "id, material_id, type AS transaction_type, quantity, \
     balance_after, reference, notes, created_by, created_at";

impl MaterialService {
    /// Create a new MaterialService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, filter: &MaterialFilter, page: Page) -> AppResult<Paginated<Material>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM materials WHERE TRUE");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM materials WHERE TRUE",
            MATERIAL_COLUMNS
        ));
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY name ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let data = query.build_query_as::<Material>().fetch_all(&self.db).await?;

        Ok(Paginated {
            data,
            pagination: page.meta(total),
        })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<MaterialDetail> {
        let material = self.find(id).await?;
        let supplier_name = match material.supplier_id {
            Some(supplier_id) => {
                sqlx::query_scalar::<_, String>("SELECT name FROM suppliers WHERE id = $1")
                    .bind(supplier_id)
                    .fetch_optional(&self.db)
                    .await?
            }
            None => None,
        };
        let recent_transactions = sqlx::query_as::<_, MaterialTransaction>(&format!(
            "SELECT {} FROM material_transactions WHERE material_id = $1 \
             ORDER BY created_at DESC LIMIT 10",
            TRANSACTION_COLUMNS
        ))
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(MaterialDetail {
            material,
            supplier_name,
            recent_transactions,
        })
    }

    async fn find(&self, id: Uuid) -> AppResult<Material> {
        sqlx::query_as::<_, Material>(&format!(
            "SELECT {} FROM materials WHERE id = $1",
            MATERIAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Material"))
    }

    /// Create a material; a non-zero opening quantity is booked as an `IN`
    /// entry
    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: CreateMaterialInput, user_id: Uuid) -> AppResult<Material> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        if let Some(supplier_id) = input.supplier_id {
            ensure_exists(&mut tx, "suppliers", supplier_id, "Supplier").await?;
        }

        let code = code::next_code(&mut tx, CodeKind::Material).await?;
        let mut material = sqlx::query_as::<_, Material>(&format!(
            r#"
            INSERT INTO materials
                (code, name, category, unit, quantity, min_quantity, unit_price,
                 supplier_id, location, description, status)
            VALUES ($1, $2, $3, $4, 0, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            MATERIAL_COLUMNS
        ))
        .bind(&code)
        .bind(input.name.trim())
        .bind(input.category.trim())
        .bind(input.unit.trim())
        .bind(input.min_quantity)
        .bind(input.unit_price)
        .bind(input.supplier_id)
        .bind(&input.location)
        .bind(&input.description)
        .bind(MaterialStatus::derive(Decimal::ZERO, input.min_quantity))
        .fetch_one(&mut *tx)
        .await?;

        if input.quantity > Decimal::ZERO {
            let movement = record_movement(
                &mut tx,
                material.id,
                TransactionType::In,
                input.quantity,
                Some("Opening stock"),
                None,
                Some(user_id),
            )
            .await?;
            material = movement.material;
        }

        tx.commit().await?;
        tracing::info!(material_id = %material.id, code = %material.code, "Material created");
        Ok(material)
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdateMaterialInput) -> AppResult<Material> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        let current = lock_material(&mut tx, id).await?;
        if let Some(supplier_id) = input.supplier_id {
            ensure_exists(&mut tx, "suppliers", supplier_id, "Supplier").await?;
        }

        let min_quantity = input.min_quantity.unwrap_or(current.min_quantity);
        let status = MaterialStatus::derive(current.quantity, min_quantity);

        let material = sqlx::query_as::<_, Material>(&format!(
            r#"
            UPDATE materials SET
                name = COALESCE($2, name),
                category = COALESCE($3, category),
                unit = COALESCE($4, unit),
                min_quantity = $5,
                unit_price = COALESCE($6, unit_price),
                supplier_id = COALESCE($7, supplier_id),
                location = COALESCE($8, location),
                description = COALESCE($9, description),
                status = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            MATERIAL_COLUMNS
        ))
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.category.as_deref().map(str::trim))
        .bind(input.unit.as_deref().map(str::trim))
        .bind(min_quantity)
        .bind(input.unit_price)
        .bind(input.supplier_id)
        .bind(&input.location)
        .bind(&input.description)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        if status != current.status && status.needs_attention() {
            alert_stock_level(&mut tx, &material).await?;
        }

        tx.commit().await?;
        Ok(material)
    }

    /// Delete a material; refused while purchase order lines reference it
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let in_use = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM purchase_order_items WHERE material_id = $1)",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        if in_use {
            return Err(AppError::InUse(
                "Material is referenced by purchase orders".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM materials WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Material"));
        }
        tracing::info!(material_id = %id, "Material deleted");
        Ok(())
    }

    /// Materials at or below their reorder threshold, emptiest first
    pub async fn low_stock(&self) -> AppResult<Vec<Material>> {
        let materials = sqlx::query_as::<_, Material>(&format!(
            "SELECT {} FROM materials WHERE status <> $1 ORDER BY quantity ASC, name ASC",
            MATERIAL_COLUMNS
        ))
        .bind(MaterialStatus::Available)
        .fetch_all(&self.db)
        .await?;
        Ok(materials)
    }

    pub async fn transactions(
        &self,
        material_id: Uuid,
        page: Page,
    ) -> AppResult<Paginated<MaterialTransaction>> {
        self.find(material_id).await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM material_transactions WHERE material_id = $1",
        )
        .bind(material_id)
        .fetch_one(&self.db)
        .await?;

        let data = sqlx::query_as::<_, MaterialTransaction>(&format!(
            "SELECT {} FROM material_transactions WHERE material_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
            TRANSACTION_COLUMNS
        ))
        .bind(material_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(Paginated {
            data,
            pagination: page.meta(total),
        })
    }

    /// Book a manual stock movement
    #[tracing::instrument(skip(self, input))]
    pub async fn record_transaction(
        &self,
        material_id: Uuid,
        input: StockTransactionInput,
        user_id: Uuid,
    ) -> AppResult<StockMovement> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        let movement = record_movement(
            &mut tx,
            material_id,
            input.transaction_type,
            input.quantity,
            input.reference.as_deref(),
            input.notes.as_deref(),
            Some(user_id),
        )
        .await?;
        tx.commit().await?;

        Ok(movement)
    }

    /// Current stock of every material as CSV
    pub async fn export_csv(&self) -> AppResult<String> {
        let materials = sqlx::query_as::<_, Material>(&format!(
            "SELECT {} FROM materials ORDER BY code ASC",
            MATERIAL_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        stock_csv(&materials)
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &MaterialFilter) {
    if let Some(term) = search_term(&filter.search) {
        let pattern = like_pattern(term);
        query
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR category ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = search_term(&filter.category) {
        query.push(" AND category = ").push_bind(category.to_string());
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status);
    }
    if let Some(supplier_id) = filter.supplier_id {
        query.push(" AND supplier_id = ").push_bind(supplier_id);
    }
}

async fn lock_material(conn: &mut PgConnection, id: Uuid) -> AppResult<Material> {
    sqlx::query_as::<_, Material>(&format!(
        "SELECT {} FROM materials WHERE id = $1 FOR UPDATE",
        MATERIAL_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::not_found("Material"))
}

/// Move stock of one material and append the ledger entry
///
/// Runs on the caller's connection, normally inside a transaction. The row is
/// locked for the rest of that transaction.
pub(crate) async fn record_movement(
    conn: &mut PgConnection,
    material_id: Uuid,
    kind: TransactionType,
    quantity: Decimal,
    reference: Option<&str>,
    notes: Option<&str>,
    created_by: Option<Uuid>,
) -> AppResult<StockMovement> {
    let current = lock_material(&mut *conn, material_id).await?;
    let balance = apply_movement(current.quantity, kind, quantity)?;
    let status = MaterialStatus::derive(balance, current.min_quantity);

    let material = sqlx::query_as::<_, Material>(&format!(
        "UPDATE materials SET quantity = $2, status = $3, updated_at = NOW() \
         WHERE id = $1 RETURNING {}",
        MATERIAL_COLUMNS
    ))
    .bind(material_id)
    .bind(balance)
    .bind(status)
    .fetch_one(&mut *conn)
    .await?;

    let transaction = sqlx::query_as::<_, MaterialTransaction>(&format!(
        r#"
        INSERT INTO material_transactions
            (material_id, type, quantity, balance_after, reference, notes, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {}
        "#,
        TRANSACTION_COLUMNS
    ))
    .bind(material_id)
    .bind(kind)
    .bind(quantity)
    .bind(balance)
    .bind(reference)
    .bind(notes)
    .bind(created_by)
    .fetch_one(&mut *conn)
    .await?;

    tracing::info!(
        %material_id,
        kind = kind.as_str(),
        %quantity,
        %balance,
        "Stock moved"
    );

    if status != current.status && status.needs_attention() {
        alert_stock_level(&mut *conn, &material).await?;
    }

    Ok(StockMovement {
        material,
        transaction,
    })
}

async fn alert_stock_level(conn: &mut PgConnection, material: &Material) -> AppResult<()> {
    let title = match material.status {
        MaterialStatus::OutOfStock => "Material out of stock",
        _ => "Material running low",
    };
    let message = format!(
        "{} ({}) is at {} {} (minimum {})",
        material.name, material.code, material.quantity, material.unit, material.min_quantity
    );
    let notification = NewNotification::new(NotificationType::Warning, title, message)
        .with_link(format!("/materials/{}", material.id));
    let sent = notify_roles(conn, access::MANAGEMENT, &notification).await?;
    tracing::warn!(material_id = %material.id, status = %material.status, sent, "Stock alert");
    Ok(())
}

/// Render materials as CSV with a header row
pub(crate) fn stock_csv(materials: &[Material]) -> AppResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for material in materials {
        writer
            .serialize(StockRecord {
                code: &material.code,
                name: &material.name,
                category: &material.category,
                unit: &material.unit,
                quantity: material.quantity,
                min_quantity: material.min_quantity,
                unit_price: material.unit_price,
                stock_value: (material.quantity * material.unit_price).round_dp(2),
                status: material.status.as_str(),
                location: material.location.as_deref().unwrap_or(""),
            })
            .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material(code: &str, quantity: i64, min: i64, price: i64) -> Material {
        Material {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: "Cotton twill".to_string(),
            category: "Fabric".to_string(),
            unit: "m".to_string(),
            quantity: Decimal::from(quantity),
            min_quantity: Decimal::from(min),
            unit_price: Decimal::from(price),
            supplier_id: None,
            location: Some("Rack A".to_string()),
            description: None,
            status: MaterialStatus::derive(Decimal::from(quantity), Decimal::from(min)),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_stock_csv() {
        let csv = stock_csv(&[material("MAT0001", 12, 5, 3), material("MAT0002", 0, 5, 4)]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "Code,Name,Category,Unit,Quantity,Min Quantity,Unit Price,Stock Value,Status,Location"
        );
        assert_eq!(lines[1], "MAT0001,Cotton twill,Fabric,m,12,5,3,36,AVAILABLE,Rack A");
        assert_eq!(lines[2], "MAT0002,Cotton twill,Fabric,m,0,5,4,0,OUT_OF_STOCK,Rack A");
    }

    #[test]
    fn test_stock_csv_empty() {
        assert_eq!(stock_csv(&[]).unwrap(), "");
    }
}
