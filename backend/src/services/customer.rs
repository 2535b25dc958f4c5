//! Customer management service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{CodeKind, Page};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::{code, like_pattern, search_term, Paginated};

/// Customer service
#[derive(Clone)]
pub struct CustomerService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub company: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Customer with the number of measurements on file
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomerListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub customer: Customer,
    pub measurement_count: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(custom = "shared::phone_number")]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 200))]
    pub company: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(custom = "shared::phone_number")]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 200))]
    pub company: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerFilter {
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

const CUSTOMER_COLUMNS: &str = "id, code, name, email, phone, address, city, company, notes, \
     is_active, created_at, updated_at";

impl CustomerService {
    /// Create a new CustomerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        filter: &CustomerFilter,
        page: Page,
    ) -> AppResult<Paginated<CustomerListItem>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM customers c WHERE TRUE");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT c.id, c.code, c.name, c.email, c.phone, c.address, c.city, c.company, \
             c.notes, c.is_active, c.created_at, c.updated_at, \
             (SELECT COUNT(*) FROM measurements m WHERE m.customer_id = c.id) AS measurement_count \
             FROM customers c WHERE TRUE",
        );
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY c.created_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let data = query
            .build_query_as::<CustomerListItem>()
            .fetch_all(&self.db)
            .await?;

        Ok(Paginated {
            data,
            pagination: page.meta(total),
        })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Customer> {
        sqlx::query_as::<_, Customer>(&format!(
            "SELECT {} FROM customers WHERE id = $1",
            CUSTOMER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Customer"))
    }

    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: CreateCustomerInput) -> AppResult<Customer> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        let code = code::next_code(&mut tx, CodeKind::Customer).await?;
        let customer = sqlx::query_as::<_, Customer>(&format!(
            r#"
            INSERT INTO customers (code, name, email, phone, address, city, company, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(&code)
        .bind(input.name.trim())
        .bind(input.email.as_deref().map(str::to_lowercase))
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.company)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(customer_id = %customer.id, %code, "Customer created");
        Ok(customer)
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdateCustomerInput) -> AppResult<Customer> {
        input.validate()?;

        sqlx::query_as::<_, Customer>(&format!(
            r#"
            UPDATE customers SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                address = COALESCE($5, address),
                city = COALESCE($6, city),
                company = COALESCE($7, company),
                notes = COALESCE($8, notes),
                is_active = COALESCE($9, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.email.as_deref().map(str::to_lowercase))
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.company)
        .bind(&input.notes)
        .bind(input.is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Customer"))
    }

    /// Delete a customer without measurements on file
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let measurements = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM measurements WHERE customer_id = $1",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        if measurements > 0 {
            return Err(AppError::InUse(format!(
                "Customer has {} measurement(s); deactivate instead",
                measurements
            )));
        }

        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Customer"));
        }
        tracing::info!(customer_id = %id, "Customer deleted");
        Ok(())
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &CustomerFilter) {
    if let Some(term) = search_term(&filter.search) {
        let pattern = like_pattern(term);
        query.push(" AND (");
        let mut columns = query.separated(" OR ");
        for column in ["c.name", "c.code", "c.email", "c.phone", "c.company"] {
            columns
                .push(format!("{} ILIKE ", column))
                .push_bind_unseparated(pattern.clone());
        }
        query.push(")");
    }
    if let Some(is_active) = filter.is_active {
        query.push(" AND c.is_active = ").push_bind(is_active);
    }
}
