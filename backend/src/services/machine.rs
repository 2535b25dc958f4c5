//! Machine register and maintenance planning

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::{maintenance_due, CodeKind, MachineStatus, Page};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::{code, like_pattern, search_term, Paginated};

/// Default look-ahead for the maintenance-due list
pub const DEFAULT_MAINTENANCE_WINDOW_DAYS: i64 = 7;

/// Machine service
#[derive(Clone)]
pub struct MachineService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    #[serde(rename = "type")]
    pub machine_type: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub last_maintenance: Option<NaiveDate>,
    pub next_maintenance: Option<NaiveDate>,
    pub location: Option<String>,
    pub status: MachineStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMachineInput {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 100, message = "Type is required"))]
    pub machine_type: String,
    #[validate(length(max = 100))]
    pub brand: Option<String>,
    #[validate(length(max = 100))]
    pub model: Option<String>,
    #[validate(length(max = 100))]
    pub serial_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub last_maintenance: Option<NaiveDate>,
    pub next_maintenance: Option<NaiveDate>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    pub status: Option<MachineStatus>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMachineInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 100))]
    pub machine_type: Option<String>,
    #[validate(length(max = 100))]
    pub brand: Option<String>,
    #[validate(length(max = 100))]
    pub model: Option<String>,
    #[validate(length(max = 100))]
    pub serial_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub last_maintenance: Option<NaiveDate>,
    pub next_maintenance: Option<NaiveDate>,
    #[validate(length(max = 100))]
    pub location: Option<String>,
    pub status: Option<MachineStatus>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineFilter {
    pub search: Option<String>,
    pub status: Option<MachineStatus>,
    #[serde(rename = "type")]
    pub machine_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MaintenanceWindow {
    pub days: Option<i64>,
}

const MACHINE_COLUMNS: &str = "id, code, name, type AS machine_type, brand, model, serial_number, \
     purchase_date, last_maintenance, next_maintenance, location, status, notes, created_at, \
     updated_at";

impl MachineService {
    /// Create a new MachineService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, filter: &MachineFilter, page: Page) -> AppResult<Paginated<Machine>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM machines WHERE TRUE");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM machines WHERE TRUE",
            MACHINE_COLUMNS
        ));
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY code ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let data = query.build_query_as::<Machine>().fetch_all(&self.db).await?;

        Ok(Paginated {
            data,
            pagination: page.meta(total),
        })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Machine> {
        sqlx::query_as::<_, Machine>(&format!(
            "SELECT {} FROM machines WHERE id = $1",
            MACHINE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Machine"))
    }

    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: CreateMachineInput) -> AppResult<Machine> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        let code = code::next_code(&mut tx, CodeKind::Machine).await?;
        let machine = sqlx::query_as::<_, Machine>(&format!(
            r#"
            INSERT INTO machines
                (code, name, type, brand, model, serial_number, purchase_date,
                 last_maintenance, next_maintenance, location, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            MACHINE_COLUMNS
        ))
        .bind(&code)
        .bind(input.name.trim())
        .bind(input.machine_type.trim())
        .bind(&input.brand)
        .bind(&input.model)
        .bind(&input.serial_number)
        .bind(input.purchase_date)
        .bind(input.last_maintenance)
        .bind(input.next_maintenance)
        .bind(&input.location)
        .bind(input.status.unwrap_or(MachineStatus::Operational))
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(machine_id = %machine.id, %code, "Machine registered");
        Ok(machine)
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdateMachineInput) -> AppResult<Machine> {
        input.validate()?;

        let machine = sqlx::query_as::<_, Machine>(&format!(
            r#"
            UPDATE machines SET
                name = COALESCE($2, name),
                type = COALESCE($3, type),
                brand = COALESCE($4, brand),
                model = COALESCE($5, model),
                serial_number = COALESCE($6, serial_number),
                purchase_date = COALESCE($7, purchase_date),
                last_maintenance = COALESCE($8, last_maintenance),
                next_maintenance = COALESCE($9, next_maintenance),
                location = COALESCE($10, location),
                status = COALESCE($11, status),
                notes = COALESCE($12, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            MACHINE_COLUMNS
        ))
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.machine_type.as_deref().map(str::trim))
        .bind(&input.brand)
        .bind(&input.model)
        .bind(&input.serial_number)
        .bind(input.purchase_date)
        .bind(input.last_maintenance)
        .bind(input.next_maintenance)
        .bind(&input.location)
        .bind(input.status)
        .bind(&input.notes)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Machine"))?;

        tracing::info!(machine_id = %id, status = ?machine.status, "Machine updated");
        Ok(machine)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM machines WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Machine"));
        }
        tracing::info!(machine_id = %id, "Machine deleted");
        Ok(())
    }

    /// Machines in service whose next maintenance falls within `days`
    pub async fn maintenance_due(&self, days: Option<i64>) -> AppResult<Vec<Machine>> {
        let days = days.unwrap_or(DEFAULT_MAINTENANCE_WINDOW_DAYS).clamp(0, 365);
        let today = Utc::now().date_naive();

        let candidates = sqlx::query_as::<_, Machine>(&format!(
            "SELECT {} FROM machines WHERE next_maintenance IS NOT NULL AND status <> $1 \
             ORDER BY next_maintenance ASC",
            MACHINE_COLUMNS
        ))
        .bind(MachineStatus::Retired)
        .fetch_all(&self.db)
        .await?;

        Ok(candidates
            .into_iter()
            .filter(|m| maintenance_due(m.status, m.next_maintenance, today, days))
            .collect())
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &MachineFilter) {
    if let Some(term) = search_term(&filter.search) {
        let pattern = like_pattern(term);
        query.push(" AND (");
        let mut columns = query.separated(" OR ");
        for column in ["name", "code", "brand", "model", "serial_number"] {
            columns
                .push(format!("{} ILIKE ", column))
                .push_bind_unseparated(pattern.clone());
        }
        query.push(")");
    }
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status);
    }
    if let Some(machine_type) = search_term(&filter.machine_type) {
        query.push(" AND type = ").push_bind(machine_type.to_string());
    }
}
