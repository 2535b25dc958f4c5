//! Attendance tracking
//!
//! One row per employee and day. Hours worked are derived from the check-in
//! and check-out times whenever either changes.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{hours_worked, AttendanceStatus, Page, PaginationMeta};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::ensure_exists;

/// Attendance service
#[derive(Clone)]
pub struct AttendanceService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub hours_worked: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attendance row with the employee's name
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub attendance: Attendance,
    pub employee_code: String,
    pub employee_name: String,
    pub department: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttendanceInput {
    pub employee_id: Uuid,
    pub date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAttendanceInput {
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: Option<AttendanceStatus>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckInInput {
    pub employee_id: Uuid,
    pub status: Option<AttendanceStatus>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutInput {
    pub employee_id: Uuid,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceFilter {
    pub employee_id: Option<Uuid>,
    pub status: Option<AttendanceStatus>,
    pub department: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: AttendanceStatus,
    pub count: i64,
}

/// Totals over a date range
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_records: i64,
    pub employees: i64,
    pub total_hours: Decimal,
    pub by_status: Vec<StatusCount>,
}

const ATTENDANCE_COLUMNS: &str = "id, employee_id, date, check_in, check_out, status, \
     hours_worked, notes, created_at, updated_at";

const ENTRY_SELECT: &str = "SELECT a.id, a.employee_id, a.date, a.check_in, a.check_out, \
     a.status, a.hours_worked, a.notes, a.created_at, a.updated_at, e.employee_code, \
     e.first_name || ' ' || e.last_name AS employee_name, e.department \
     FROM attendance a JOIN employees e ON e.id = a.employee_id WHERE TRUE";

/// Check-out must not precede check-in
fn derive_hours(
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
) -> AppResult<Option<Decimal>> {
    if let (Some(start), Some(end)) = (check_in, check_out) {
        if end < start {
            return Err(AppError::validation(
                "checkOut",
                "Check-out cannot be earlier than check-in",
            ));
        }
    }
    Ok(hours_worked(check_in, check_out))
}

/// First and last day of the month containing `date`
fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let next_month = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    };
    let last = next_month.and_then(|d| d.pred_opt()).unwrap_or(date);
    (first, last)
}

impl AttendanceService {
    /// Create a new AttendanceService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Attendance rows, newest day first
    ///
    /// Without a page window the whole matching set is returned.
    pub async fn list(
        &self,
        filter: &AttendanceFilter,
        page: Option<Page>,
    ) -> AppResult<(Vec<AttendanceEntry>, Option<PaginationMeta>)> {
        let mut query = QueryBuilder::<Postgres>::new(ENTRY_SELECT);
        push_filters(&mut query, filter);
        query.push(" ORDER BY a.date DESC, e.last_name ASC");

        let Some(page) = page else {
            let data = query
                .build_query_as::<AttendanceEntry>()
                .fetch_all(&self.db)
                .await?;
            return Ok((data, None));
        };

        let mut count = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM attendance a JOIN employees e ON e.id = a.employee_id WHERE TRUE",
        );
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        query
            .push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let data = query
            .build_query_as::<AttendanceEntry>()
            .fetch_all(&self.db)
            .await?;

        Ok((data, Some(page.meta(total))))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<AttendanceEntry> {
        let mut query = QueryBuilder::<Postgres>::new(ENTRY_SELECT);
        query.push(" AND a.id = ").push_bind(id);
        query
            .build_query_as::<AttendanceEntry>()
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Attendance record"))
    }

    /// Record a full attendance entry; one per employee and day
    #[tracing::instrument(skip(self, input), fields(employee_id = %input.employee_id, date = %input.date))]
    pub async fn create(&self, input: CreateAttendanceInput) -> AppResult<Attendance> {
        input.validate()?;
        let hours = derive_hours(input.check_in, input.check_out)?;

        let mut conn = self.db.acquire().await?;
        ensure_exists(&mut conn, "employees", input.employee_id, "Employee").await?;

        let attendance = sqlx::query_as::<_, Attendance>(&format!(
            r#"
            INSERT INTO attendance (employee_id, date, check_in, check_out, status, hours_worked, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            ATTENDANCE_COLUMNS
        ))
        .bind(input.employee_id)
        .bind(input.date)
        .bind(input.check_in)
        .bind(input.check_out)
        .bind(input.status)
        .bind(hours)
        .bind(&input.notes)
        .fetch_one(&mut *conn)
        .await?;

        tracing::info!(attendance_id = %attendance.id, "Attendance recorded");
        Ok(attendance)
    }

    /// Stamp today's check-in for an employee
    #[tracing::instrument(skip(self, input), fields(employee_id = %input.employee_id))]
    pub async fn check_in(&self, input: CheckInInput) -> AppResult<Attendance> {
        input.validate()?;
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        ensure_exists(&mut tx, "employees", input.employee_id, "Employee").await?;

        let existing = sqlx::query_as::<_, Attendance>(&format!(
            "SELECT {} FROM attendance WHERE employee_id = $1 AND date = $2 FOR UPDATE",
            ATTENDANCE_COLUMNS
        ))
        .bind(input.employee_id)
        .bind(now.date_naive())
        .fetch_optional(&mut *tx)
        .await?;

        let status = input.status.unwrap_or(AttendanceStatus::Present);
        let attendance = match existing {
            Some(record) if record.check_in.is_some() => {
                return Err(AppError::DuplicateEntry(
                    "Employee has already checked in today".to_string(),
                ));
            }
            Some(record) => {
                sqlx::query_as::<_, Attendance>(&format!(
                    r#"
                    UPDATE attendance SET check_in = $2, status = $3,
                        notes = COALESCE($4, notes), updated_at = NOW()
                    WHERE id = $1
                    RETURNING {}
                    "#,
                    ATTENDANCE_COLUMNS
                ))
                .bind(record.id)
                .bind(now)
                .bind(status)
                .bind(&input.notes)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                sqlx::query_as::<_, Attendance>(&format!(
                    r#"
                    INSERT INTO attendance (employee_id, date, check_in, status, notes)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING {}
                    "#,
                    ATTENDANCE_COLUMNS
                ))
                .bind(input.employee_id)
                .bind(now.date_naive())
                .bind(now)
                .bind(status)
                .bind(&input.notes)
                .fetch_one(&mut *tx)
                .await?
            }
        };
        tx.commit().await?;

        tracing::info!(attendance_id = %attendance.id, "Checked in");
        Ok(attendance)
    }

    /// Stamp today's check-out and derive hours worked
    #[tracing::instrument(skip(self, input), fields(employee_id = %input.employee_id))]
    pub async fn check_out(&self, input: CheckOutInput) -> AppResult<Attendance> {
        input.validate()?;
        let now = Utc::now();

        let mut tx = self.db.begin().await?;
        let record = sqlx::query_as::<_, Attendance>(&format!(
            "SELECT {} FROM attendance WHERE employee_id = $1 AND date = $2 FOR UPDATE",
            ATTENDANCE_COLUMNS
        ))
        .bind(input.employee_id)
        .bind(now.date_naive())
        .fetch_optional(&mut *tx)
        .await?
        .filter(|record| record.check_in.is_some())
        .ok_or_else(|| AppError::ValidationError("No check-in recorded today".to_string()))?;

        if record.check_out.is_some() {
            return Err(AppError::InvalidStateTransition(
                "Employee has already checked out today".to_string(),
            ));
        }

        let hours = derive_hours(record.check_in, Some(now))?;
        let attendance = sqlx::query_as::<_, Attendance>(&format!(
            r#"
            UPDATE attendance SET check_out = $2, hours_worked = $3,
                notes = COALESCE($4, notes), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ATTENDANCE_COLUMNS
        ))
        .bind(record.id)
        .bind(now)
        .bind(hours)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(attendance_id = %attendance.id, hours = ?attendance.hours_worked, "Checked out");
        Ok(attendance)
    }

    #[tracing::instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdateAttendanceInput) -> AppResult<Attendance> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        let current = sqlx::query_as::<_, Attendance>(&format!(
            "SELECT {} FROM attendance WHERE id = $1 FOR UPDATE",
            ATTENDANCE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Attendance record"))?;

        let check_in = input.check_in.or(current.check_in);
        let check_out = input.check_out.or(current.check_out);
        let hours = derive_hours(check_in, check_out)?;

        let attendance = sqlx::query_as::<_, Attendance>(&format!(
            r#"
            UPDATE attendance SET
                check_in = $2,
                check_out = $3,
                hours_worked = $4,
                status = COALESCE($5, status),
                notes = COALESCE($6, notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ATTENDANCE_COLUMNS
        ))
        .bind(id)
        .bind(check_in)
        .bind(check_out)
        .bind(hours)
        .bind(input.status)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(attendance)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM attendance WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Attendance record"));
        }
        Ok(())
    }

    /// Status counts and hours over a range, defaulting to the current month
    pub async fn summary(&self, filter: &AttendanceFilter) -> AppResult<AttendanceSummary> {
        let (month_start, month_end) = month_bounds(Utc::now().date_naive());
        let start_date = filter.start_date.unwrap_or(month_start);
        let end_date = filter.end_date.unwrap_or(month_end);
        if start_date > end_date {
            return Err(AppError::validation(
                "startDate",
                "Start date must not be after end date",
            ));
        }
        let scope = AttendanceFilter {
            employee_id: filter.employee_id,
            status: None,
            department: filter.department.clone(),
            date: None,
            start_date: Some(start_date),
            end_date: Some(end_date),
        };

        let mut counts = QueryBuilder::<Postgres>::new(
            "SELECT a.status, COUNT(*) AS count \
             FROM attendance a JOIN employees e ON e.id = a.employee_id WHERE TRUE",
        );
        push_filters(&mut counts, &scope);
        counts.push(" GROUP BY a.status ORDER BY a.status");
        let by_status = counts
            .build_query_as::<StatusCount>()
            .fetch_all(&self.db)
            .await?;

        let mut totals = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(DISTINCT a.employee_id), COALESCE(SUM(a.hours_worked), 0) \
             FROM attendance a JOIN employees e ON e.id = a.employee_id WHERE TRUE",
        );
        push_filters(&mut totals, &scope);
        let (employees, total_hours): (i64, Decimal) =
            totals.build_query_as().fetch_one(&self.db).await?;

        Ok(AttendanceSummary {
            start_date,
            end_date,
            total_records: by_status.iter().map(|s| s.count).sum(),
            employees,
            total_hours,
            by_status,
        })
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filter: &AttendanceFilter) {
    if let Some(employee_id) = filter.employee_id {
        query.push(" AND a.employee_id = ").push_bind(employee_id);
    }
    if let Some(status) = filter.status {
        query.push(" AND a.status = ").push_bind(status);
    }
    if let Some(department) = filter.department.as_deref().map(str::trim) {
        if !department.is_empty() {
            query.push(" AND e.department = ").push_bind(department.to_string());
        }
    }
    if let Some(date) = filter.date {
        query.push(" AND a.date = ").push_bind(date);
    }
    if let Some(start) = filter.start_date {
        query.push(" AND a.date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        query.push(" AND a.date <= ").push_bind(end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_month_bounds() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 14).unwrap();
        assert_eq!(
            month_bounds(d),
            (
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
            )
        );
        let d = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert_eq!(month_bounds(d).1, d);
    }

    #[test]
    fn test_derive_hours_rejects_reversed_times() {
        let check_in = Utc.with_ymd_and_hms(2024, 3, 4, 17, 0, 0).unwrap();
        let check_out = Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap();
        assert!(derive_hours(Some(check_in), Some(check_out)).is_err());
        assert_eq!(
            derive_hours(Some(check_out), Some(check_in)).unwrap(),
            Some(Decimal::from(9))
        );
        assert_eq!(derive_hours(Some(check_in), None).unwrap(), None);
    }
}
