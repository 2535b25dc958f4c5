//! Machine models

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Machine operating status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineStatus {
    Operational,
    Maintenance,
    Broken,
    Retired,
}

/// Whether maintenance scheduled on `next` falls within `within_days` of `today`
///
/// Overdue maintenance is always due. Retired machines never are.
pub fn maintenance_due(
    status: MachineStatus,
    next: Option<NaiveDate>,
    today: NaiveDate,
    within_days: i64,
) -> bool {
    if status == MachineStatus::Retired {
        return false;
    }
    match next {
        Some(date) => date <= today + Duration::days(within_days.max(0)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maintenance_due() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let soon = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let past = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        assert!(maintenance_due(MachineStatus::Operational, Some(soon), today, 7));
        assert!(!maintenance_due(MachineStatus::Operational, Some(soon), today, 3));
        assert!(maintenance_due(MachineStatus::Broken, Some(past), today, 0));
        assert!(!maintenance_due(MachineStatus::Retired, Some(past), today, 7));
        assert!(!maintenance_due(MachineStatus::Operational, None, today, 7));
    }
}
