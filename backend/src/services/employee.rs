//! Employee records

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{EmployeeStatus, Page};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::{ensure_exists, like_pattern, search_term, Paginated};

/// Employee service
#[derive(Clone)]
pub struct EmployeeService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Uuid,
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department: String,
    pub position: String,
    pub hire_date: NaiveDate,
    pub salary: Option<Decimal>,
    pub status: EmployeeStatus,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployeeInput {
    #[validate(length(min = 1, max = 20, message = "Employee code is required"))]
    pub employee_code: String,
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(custom = "shared::phone_number")]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Department is required"))]
    pub department: String,
    #[validate(length(min = 1, max = 100, message = "Position is required"))]
    pub position: String,
    pub hire_date: NaiveDate,
    #[validate(custom = "shared::non_negative_amount")]
    pub salary: Option<Decimal>,
    pub status: Option<EmployeeStatus>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployeeInput {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(custom = "shared::phone_number")]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub department: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub position: Option<String>,
    pub hire_date: Option<NaiveDate>,
    #[validate(custom = "shared::non_negative_amount")]
    pub salary: Option<Decimal>,
    pub status: Option<EmployeeStatus>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeFilter {
    pub search: Option<String>,
    pub department: Option<String>,
    pub status: Option<EmployeeStatus>,
}

const EMPLOYEE_COLUMNS: &str = "id, employee_code, first_name, last_name, email, phone, \
     department, position, hire_date, salary, status, user_id, created_at, updated_at";

impl EmployeeService {
    /// Create a new EmployeeService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, filter: &EmployeeFilter, page: Page) -> AppResult<Paginated<Employee>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM employees WHERE TRUE");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM employees WHERE TRUE",
            EMPLOYEE_COLUMNS
        ));
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY last_name ASC, first_name ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let data = query.build_query_as::<Employee>().fetch_all(&self.db).await?;

        Ok(Paginated {
            data,
            pagination: page.meta(total),
        })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Employee> {
        sqlx::query_as::<_, Employee>(&format!(
            "SELECT {} FROM employees WHERE id = $1",
            EMPLOYEE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Employee"))
    }

    #[tracing::instrument(skip(self, input), fields(code = %input.employee_code))]
    pub async fn create(&self, input: CreateEmployeeInput) -> AppResult<Employee> {
        input.validate()?;
        if let Some(user_id) = input.user_id {
            let mut conn = self.db.acquire().await?;
            ensure_exists(&mut conn, "users", user_id, "User").await?;
        }

        let employee = sqlx::query_as::<_, Employee>(&format!(
            r#"
            INSERT INTO employees
                (employee_code, first_name, last_name, email, phone, department, position,
                 hire_date, salary, status, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            EMPLOYEE_COLUMNS
        ))
        .bind(input.employee_code.trim().to_uppercase())
        .bind(input.first_name.trim())
        .bind(input.last_name.trim())
        .bind(input.email.as_deref().map(str::to_lowercase))
        .bind(&input.phone)
        .bind(input.department.trim())
        .bind(input.position.trim())
        .bind(input.hire_date)
        .bind(input.salary)
        .bind(input.status.unwrap_or(EmployeeStatus::Active))
        .bind(input.user_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(employee_id = %employee.id, "Employee created");
        Ok(employee)
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdateEmployeeInput) -> AppResult<Employee> {
        input.validate()?;
        if let Some(user_id) = input.user_id {
            let mut conn = self.db.acquire().await?;
            ensure_exists(&mut conn, "users", user_id, "User").await?;
        }

        sqlx::query_as::<_, Employee>(&format!(
            r#"
            UPDATE employees SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                department = COALESCE($6, department),
                position = COALESCE($7, position),
                hire_date = COALESCE($8, hire_date),
                salary = COALESCE($9, salary),
                status = COALESCE($10, status),
                user_id = COALESCE($11, user_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            EMPLOYEE_COLUMNS
        ))
        .bind(id)
        .bind(input.first_name.as_deref().map(str::trim))
        .bind(input.last_name.as_deref().map(str::trim))
        .bind(input.email.as_deref().map(str::to_lowercase))
        .bind(&input.phone)
        .bind(input.department.as_deref().map(str::trim))
        .bind(input.position.as_deref().map(str::trim))
        .bind(input.hire_date)
        .bind(input.salary)
        .bind(input.status)
        .bind(input.user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Employee"))
    }

    /// Delete an employee together with their attendance history
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Employee"));
        }
        tracing::info!(employee_id = %id, "Employee deleted");
        Ok(())
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &EmployeeFilter) {
    if let Some(term) = search_term(&filter.search) {
        let pattern = like_pattern(term);
        query.push(" AND (");
        let mut columns = query.separated(" OR ");
        for column in ["first_name", "last_name", "employee_code", "email"] {
            columns
                .push(format!("{} ILIKE ", column))
                .push_bind_unseparated(pattern.clone());
        }
        query.push(")");
    }
    if let Some(department) = search_term(&filter.department) {
        query.push(" AND department = ").push_bind(department.to_string());
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status);
    }
}
