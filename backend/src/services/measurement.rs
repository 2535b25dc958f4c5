//! Customer body measurements

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{CodeKind, MeasurementUnit, MeasurementValues, Page};
use sqlx::{types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::{code, ensure_exists, like_pattern, search_term, Paginated};

/// Measurement service
#[derive(Clone)]
pub struct MeasurementService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub id: Uuid,
    pub code: String,
    pub customer_id: Uuid,
    pub garment_type: String,
    #[sqlx(rename = "measurement_values")]
    pub values: Json<MeasurementValues>,
    pub unit: MeasurementUnit,
    pub notes: Option<String>,
    pub taken_by: Option<Uuid>,
    pub taken_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub measurement: Measurement,
    pub customer_code: String,
    pub customer_name: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMeasurementInput {
    pub customer_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "Garment type is required"))]
    pub garment_type: String,
    #[validate(custom = "shared::measurement_values")]
    pub values: MeasurementValues,
    #[serde(default)]
    pub unit: MeasurementUnit,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub taken_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeasurementInput {
    #[validate(length(min = 1, max = 100))]
    pub garment_type: Option<String>,
    #[validate(custom = "shared::measurement_values")]
    pub values: Option<MeasurementValues>,
    pub unit: Option<MeasurementUnit>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub taken_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementFilter {
    pub customer_id: Option<Uuid>,
    pub garment_type: Option<String>,
    pub search: Option<String>,
}

const MEASUREMENT_COLUMNS: &str = "id, code, customer_id, garment_type, measurement_values, unit, notes, \
     taken_by, taken_at, created_at, updated_at";

const ENTRY_SELECT: &str = "SELECT m.id, m.code, m.customer_id, m.garment_type, m.measurement_values, m.unit, \
     m.notes, m.taken_by, m.taken_at, m.created_at, m.updated_at, c.code AS customer_code, \
     c.name AS customer_name \
     FROM measurements m JOIN customers c ON c.id = m.customer_id WHERE TRUE";

impl MeasurementService {
    /// Create a new MeasurementService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        filter: &MeasurementFilter,
        page: Page,
    ) -> AppResult<Paginated<MeasurementEntry>> {
        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM measurements m JOIN customers c ON c.id = m.customer_id WHERE TRUE",
        );
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut query = QueryBuilder::<Postgres>::new(ENTRY_SELECT);
        push_filters(&mut query, filter);
        query
            .push(" ORDER BY m.taken_at DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let data = query
            .build_query_as::<MeasurementEntry>()
            .fetch_all(&self.db)
            .await?;

        Ok(Paginated {
            data,
            pagination: page.meta(total),
        })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<MeasurementEntry> {
        let mut query = QueryBuilder::<Postgres>::new(ENTRY_SELECT);
        query.push(" AND m.id = ").push_bind(id);
        query
            .build_query_as::<MeasurementEntry>()
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Measurement"))
    }

    #[tracing::instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create(&self, input: CreateMeasurementInput, user_id: Uuid) -> AppResult<Measurement> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        ensure_exists(&mut tx, "customers", input.customer_id, "Customer").await?;

        let code = code::next_code(&mut tx, CodeKind::Measurement).await?;
        let measurement = sqlx::query_as::<_, Measurement>(&format!(
            r#"
            INSERT INTO measurements
                (code, customer_id, garment_type, measurement_values, unit, notes, taken_by, taken_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, NOW()))
            RETURNING {}
            "#,
            MEASUREMENT_COLUMNS
        ))
        .bind(&code)
        .bind(input.customer_id)
        .bind(input.garment_type.trim())
        .bind(Json(&input.values))
        .bind(input.unit)
        .bind(&input.notes)
        .bind(user_id)
        .bind(input.taken_at)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(measurement_id = %measurement.id, %code, "Measurement recorded");
        Ok(measurement)
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdateMeasurementInput) -> AppResult<Measurement> {
        input.validate()?;

        sqlx::query_as::<_, Measurement>(&format!(
            r#"
            UPDATE measurements SET
                garment_type = COALESCE($2, garment_type),
                measurement_values = COALESCE($3, measurement_values),
                unit = COALESCE($4, unit),
                notes = COALESCE($5, notes),
                taken_at = COALESCE($6, taken_at),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            MEASUREMENT_COLUMNS
        ))
        .bind(id)
        .bind(input.garment_type.as_deref().map(str::trim))
        .bind(input.values.as_ref().map(Json))
        .bind(input.unit)
        .bind(&input.notes)
        .bind(input.taken_at)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Measurement"))
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM measurements WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Measurement"));
        }
        Ok(())
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &MeasurementFilter) {
    if let Some(customer_id) = filter.customer_id {
        query.push(" AND m.customer_id = ").push_bind(customer_id);
    }
    if let Some(garment_type) = search_term(&filter.garment_type) {
        query
            .push(" AND m.garment_type ILIKE ")
            .push_bind(like_pattern(garment_type));
    }
    if let Some(term) = search_term(&filter.search) {
        let pattern = like_pattern(term);
        query
            .push(" AND (m.code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR c.name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}
