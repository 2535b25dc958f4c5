//! Employee and attendance models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Employment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmployeeStatus {
    Active,
    OnLeave,
    Terminated,
}

/// Daily attendance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    HalfDay,
    Leave,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 5] = [
        AttendanceStatus::Present,
        AttendanceStatus::Absent,
        AttendanceStatus::Late,
        AttendanceStatus::HalfDay,
        AttendanceStatus::Leave,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Absent => "ABSENT",
            AttendanceStatus::Late => "LATE",
            AttendanceStatus::HalfDay => "HALF_DAY",
            AttendanceStatus::Leave => "LEAVE",
        }
    }

    /// Whether the employee was on site
    pub fn is_on_site(&self) -> bool {
        matches!(
            self,
            AttendanceStatus::Present | AttendanceStatus::Late | AttendanceStatus::HalfDay
        )
    }
}

/// Hours between check-in and check-out, rounded to two decimals
///
/// Returns `None` when either end is missing or check-out precedes check-in.
pub fn hours_worked(
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
) -> Option<Decimal> {
    let (start, end) = (check_in?, check_out?);
    let minutes = (end - start).num_minutes();
    if minutes < 0 {
        return None;
    }
    Some((Decimal::from(minutes) / Decimal::from(60)).round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_hours_worked() {
        assert_eq!(
            hours_worked(Some(at(8, 0)), Some(at(17, 30))),
            Some(Decimal::new(950, 2))
        );
        assert_eq!(
            hours_worked(Some(at(8, 0)), Some(at(8, 20))),
            Some(Decimal::new(33, 2))
        );
    }

    #[test]
    fn test_hours_worked_incomplete() {
        assert_eq!(hours_worked(Some(at(8, 0)), None), None);
        assert_eq!(hours_worked(None, Some(at(8, 0))), None);
        assert_eq!(hours_worked(Some(at(9, 0)), Some(at(8, 0))), None);
    }
}
