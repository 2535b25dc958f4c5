//! Supplier management service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{CodeKind, Page};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::{code, like_pattern, search_term, Paginated};

/// Supplier service
#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub materials: Option<String>,
    pub payment_terms: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SupplierListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub supplier: Supplier,
    pub purchase_order_count: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupplierInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(length(max = 200))]
    pub contact_person: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(custom = "shared::phone_number")]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 1000))]
    pub materials: Option<String>,
    #[validate(length(max = 200))]
    pub payment_terms: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSupplierInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 200))]
    pub contact_person: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(custom = "shared::phone_number")]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 1000))]
    pub materials: Option<String>,
    #[validate(length(max = 200))]
    pub payment_terms: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierFilter {
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

const SUPPLIER_COLUMNS: &str = "id, code, name, contact_person, email, phone, address, city, \
     materials, payment_terms, notes, is_active, created_at, updated_at";

impl SupplierService {
    /// Create a new SupplierService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        filter: &SupplierFilter,
        page: Page,
    ) -> AppResult<Paginated<SupplierListItem>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM suppliers s WHERE TRUE");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT s.id, s.code, s.name, s.contact_person, s.email, s.phone, s.address, s.city, \
             s.materials, s.payment_terms, s.notes, s.is_active, s.created_at, s.updated_at, \
             (SELECT COUNT(*) FROM purchase_orders po WHERE po.supplier_id = s.id) \
             AS purchase_order_count \
             FROM suppliers s WHERE TRUE",
        );
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY s.name ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let data = query
            .build_query_as::<SupplierListItem>()
            .fetch_all(&self.db)
            .await?;

        Ok(Paginated {
            data,
            pagination: page.meta(total),
        })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Supplier> {
        sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {} FROM suppliers WHERE id = $1",
            SUPPLIER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Supplier"))
    }

    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: CreateSupplierInput) -> AppResult<Supplier> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        let code = code::next_code(&mut tx, CodeKind::Supplier).await?;
        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            INSERT INTO suppliers
                (code, name, contact_person, email, phone, address, city, materials,
                 payment_terms, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            SUPPLIER_COLUMNS
        ))
        .bind(&code)
        .bind(input.name.trim())
        .bind(&input.contact_person)
        .bind(input.email.as_deref().map(str::to_lowercase))
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.materials)
        .bind(&input.payment_terms)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(supplier_id = %supplier.id, %code, "Supplier created");
        Ok(supplier)
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdateSupplierInput) -> AppResult<Supplier> {
        input.validate()?;

        sqlx::query_as::<_, Supplier>(&format!(
            r#"
            UPDATE suppliers SET
                name = COALESCE($2, name),
                contact_person = COALESCE($3, contact_person),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                address = COALESCE($6, address),
                city = COALESCE($7, city),
                materials = COALESCE($8, materials),
                payment_terms = COALESCE($9, payment_terms),
                notes = COALESCE($10, notes),
                is_active = COALESCE($11, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SUPPLIER_COLUMNS
        ))
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(&input.contact_person)
        .bind(input.email.as_deref().map(str::to_lowercase))
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.materials)
        .bind(&input.payment_terms)
        .bind(&input.notes)
        .bind(input.is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Supplier"))
    }

    /// Delete a supplier that no purchase order refers to
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let orders = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM purchase_orders WHERE supplier_id = $1",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        if orders > 0 {
            return Err(AppError::InUse(format!(
                "Supplier has {} purchase order(s); deactivate instead",
                orders
            )));
        }

        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Supplier"));
        }
        tracing::info!(supplier_id = %id, "Supplier deleted");
        Ok(())
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &SupplierFilter) {
    if let Some(term) = search_term(&filter.search) {
        let pattern = like_pattern(term);
        query.push(" AND (");
        let mut columns = query.separated(" OR ");
        for column in ["s.name", "s.code", "s.contact_person", "s.email", "s.materials"] {
            columns
                .push(format!("{} ILIKE ", column))
                .push_bind_unseparated(pattern.clone());
        }
        query.push(")");
    }
    if let Some(is_active) = filter.is_active {
        query.push(" AND s.is_active = ").push_bind(is_active);
    }
}
