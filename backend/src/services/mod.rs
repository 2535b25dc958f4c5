//! Business logic services for the Garment ERP platform

use serde::Serialize;
use shared::PaginationMeta;
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult, FieldError};

pub mod attendance;
pub mod auth;
pub mod code;
pub mod customer;
pub mod employee;
pub mod machine;
pub mod material;
pub mod measurement;
pub mod notification;
pub mod purchase_order;
pub mod setting;
pub mod supplier;
pub mod user;

pub use attendance::AttendanceService;
pub use auth::AuthService;
pub use customer::CustomerService;
pub use employee::EmployeeService;
pub use machine::MachineService;
pub use material::MaterialService;
pub use measurement::MeasurementService;
pub use notification::NotificationService;
pub use purchase_order::PurchaseOrderService;
pub use setting::SettingService;
pub use supplier::SupplierService;
pub use user::UserService;

/// One page of a list query
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// `%term%` for ILIKE with the pattern metacharacters escaped
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Non-empty search term, trimmed
pub(crate) fn search_term(search: &Option<String>) -> Option<&str> {
    search
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty())
}

/// Validate every element of a nested list
///
/// Field names are reported as `field[index].name`.
pub(crate) fn validate_list<T: Validate>(field: &str, list: &[T]) -> AppResult<()> {
    let mut errors = Vec::new();
    for (index, item) in list.iter().enumerate() {
        if let Err(err) = item.validate() {
            if let AppError::ValidationErrors(fields) = AppError::from(err) {
                errors.extend(fields.into_iter().map(|f| FieldError {
                    field: format!("{}[{}].{}", field, index, f.field),
                    message: f.message,
                }));
            }
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::ValidationErrors(errors))
    }
}

/// Fail with 404 unless a row with `id` exists in `table`
pub(crate) async fn ensure_exists(
    conn: &mut PgConnection,
    table: &str,
    id: Uuid,
    resource: &str,
) -> AppResult<()> {
    let exists = sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
        table
    ))
    .bind(id)
    .fetch_one(conn)
    .await?;
    if exists {
        Ok(())
    } else {
        Err(AppError::not_found(resource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Line {
        #[validate(length(min = 1, message = "Description is required"))]
        description: String,
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" cotton "), "%cotton%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_search_term() {
        assert_eq!(search_term(&Some("  ".to_string())), None);
        assert_eq!(search_term(&Some(" silk ".to_string())), Some("silk"));
        assert_eq!(search_term(&None), None);
    }

    #[test]
    fn test_validate_list_reports_index() {
        let lines = vec![
            Line {
                description: "Zipper".to_string(),
            },
            Line {
                description: String::new(),
            },
        ];
        match validate_list("items", &lines) {
            Err(AppError::ValidationErrors(fields)) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].field, "items[1].description");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
