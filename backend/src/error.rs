//! Error handling for the Garment ERP back end
//!
//! Every failure leaves the server as `{success: false, code, message,
//! errors?, detail?}` with a status matching its class.

use std::sync::OnceLock;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use shared::{CodeError, PurchaseOrderError, StockError};

static EXPOSE_DETAILS: OnceLock<bool> = OnceLock::new();

/// Include internal error details in 500 responses
///
/// Set once at startup; outside production the underlying error text is
/// returned to the caller.
pub fn expose_internal_details(enabled: bool) {
    let _ = EXPOSE_DETAILS.set(enabled);
}

fn details_exposed() -> bool {
    EXPOSE_DETAILS.get().copied().unwrap_or(false)
}

/// A single field-level validation message
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation failed")]
    ValidationErrors(Vec<FieldError>),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Resource in use: {0}")]
    InUse(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[source] sqlx::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        AppError::NotFound(resource.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials
            | AppError::TokenExpired
            | AppError::InvalidToken
            | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::InsufficientPermissions => StatusCode::FORBIDDEN,
            AppError::Validation { .. }
            | AppError::ValidationErrors(_)
            | AppError::ValidationError(_)
            | AppError::InvalidStateTransition(_)
            | AppError::InsufficientStock(_)
            | AppError::InUse(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateEntry(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_)
            | AppError::Configuration(_)
            | AppError::Internal(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::InsufficientPermissions => "FORBIDDEN",
            AppError::Validation { .. }
            | AppError::ValidationErrors(_)
            | AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::DuplicateEntry(_) => "DUPLICATE_ENTRY",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidStateTransition(_) => "INVALID_STATE",
            AppError::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            AppError::InUse(_) => "RESOURCE_IN_USE",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Internal(_) | AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::InvalidCredentials => "Invalid email or password".to_string(),
            AppError::TokenExpired => "Token has expired".to_string(),
            AppError::InvalidToken => "Invalid token".to_string(),
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::InsufficientPermissions => {
                "You do not have permission to perform this action".to_string()
            }
            AppError::Validation { message, .. } => message.clone(),
            AppError::ValidationErrors(_) => "Validation failed".to_string(),
            AppError::ValidationError(msg) => msg.clone(),
            AppError::DuplicateEntry(what) => format!("A record with this {} already exists", what),
            AppError::NotFound(resource) => format!("{} not found", resource),
            AppError::InvalidStateTransition(msg)
            | AppError::InsufficientStock(msg)
            | AppError::InUse(msg) => msg.clone(),
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
            AppError::Configuration(_)
            | AppError::Internal(_)
            | AppError::InternalError(_) => "An internal server error occurred".to_string(),
        }
    }

    fn field_errors(&self) -> Option<Vec<FieldError>> {
        match self {
            AppError::Validation { field, message } => Some(vec![FieldError {
                field: field.clone(),
                message: message.clone(),
            }]),
            AppError::ValidationErrors(errors) => Some(errors.clone()),
            _ => None,
        }
    }
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code: code.into(),
            message: message.into(),
            errors: None,
            detail: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let mut body = ErrorResponse::new(self.code(), self.public_message());
        body.errors = self.field_errors();

        if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
            if details_exposed() {
                body.detail = Some(self.to_string());
            }
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // unique_violation
            if db_err.code().as_deref() == Some("23505") {
                let what = db_err
                    .constraint()
                    .map(|c| constraint_field(db_err.table(), c))
                    .unwrap_or_else(|| "value".to_string());
                return AppError::DuplicateEntry(what);
            }
            // foreign_key_violation
            if db_err.code().as_deref() == Some("23503") {
                return AppError::InUse(
                    "The record is referenced by other records".to_string(),
                );
            }
        }
        AppError::DatabaseError(err)
    }
}

/// `customers_email_key` on table `customers` -> `email`
fn constraint_field(table: Option<&str>, constraint: &str) -> String {
    let trimmed = constraint.strip_suffix("_key").unwrap_or(constraint);
    table
        .and_then(|t| trimmed.strip_prefix(t))
        .and_then(|rest| rest.strip_prefix('_'))
        .filter(|field| !field.is_empty())
        .unwrap_or(trimmed)
        .to_string()
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| FieldError {
                    field: field.to_string(),
                    message: err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", err.code)),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::ValidationErrors(fields)
    }
}

impl From<PurchaseOrderError> for AppError {
    fn from(err: PurchaseOrderError) -> Self {
        match err {
            PurchaseOrderError::UnknownItem(id) => {
                AppError::NotFound(format!("Purchase order item {}", id))
            }
            PurchaseOrderError::NoItems | PurchaseOrderError::EmptyReceipt => {
                AppError::validation("items", err.to_string())
            }
            PurchaseOrderError::NonPositiveQuantity(_)
            | PurchaseOrderError::TooPrecise(_)
            | PurchaseOrderError::OverReceipt { .. }
            | PurchaseOrderError::AmountOutOfRange => AppError::ValidationError(err.to_string()),
            PurchaseOrderError::InvalidInitialStatus(_) => {
                AppError::validation("status", err.to_string())
            }
            PurchaseOrderError::InvalidTransition { .. }
            | PurchaseOrderError::NotEditable(_)
            | PurchaseOrderError::NotDeletable(_)
            | PurchaseOrderError::NotReceivable(_) => {
                AppError::InvalidStateTransition(err.to_string())
            }
        }
    }
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::NonPositiveQuantity | StockError::CapacityExceeded { .. } => {
                AppError::validation("quantity", err.to_string())
            }
            StockError::Insufficient { .. } => AppError::InsufficientStock(err.to_string()),
        }
    }
}

impl From<CodeError> for AppError {
    fn from(err: CodeError) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use shared::PurchaseOrderStatus;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InsufficientPermissions.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("Supplier").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::DuplicateEntry("email".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_lifecycle_errors_are_bad_requests() {
        let err: AppError = PurchaseOrderError::NotDeletable(PurchaseOrderStatus::Approved).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.public_message().contains("DRAFT"));

        let err: AppError = PurchaseOrderError::UnknownItem(uuid::Uuid::nil()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err: AppError = PurchaseOrderError::AmountOutOfRange.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_validation_errors_list_fields() {
        let sample = Sample {
            name: String::new(),
            email: "not-an-email".into(),
        };
        let err: AppError = sample.validate().unwrap_err().into();
        let fields = err.field_errors().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field, "email");
        assert_eq!(fields[1].message, "Name is required");
    }

    #[test]
    fn test_constraint_field() {
        assert_eq!(constraint_field(Some("customers"), "customers_email_key"), "email");
        assert_eq!(
            constraint_field(Some("purchase_orders"), "purchase_orders_po_number_key"),
            "po_number"
        );
        assert_eq!(constraint_field(None, "weird_key"), "weird");
    }
}
