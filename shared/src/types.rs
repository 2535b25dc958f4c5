//! Common types used across the platform

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default page size for list endpoints
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Upper bound on page size
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Pagination parameters as they arrive on the query string
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Resolved page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl PaginationQuery {
    /// True when the caller did not ask for any paging at all
    pub fn is_unbounded(&self) -> bool {
        self.page.is_none() && self.limit.is_none()
    }

    /// Apply defaults (`page = 1`, `limit = default_limit`) and clamp to
    /// `1..=max_limit`
    pub fn resolve(&self, default_limit: u32, max_limit: u32) -> Page {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(default_limit).clamp(1, max_limit.max(1));
        Page { page, limit }
    }
}

impl Page {
    /// Rows to skip: `(page - 1) * limit`
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }

    pub fn meta(&self, total: i64) -> PaginationMeta {
        PaginationMeta::new(self.page, self.limit, total)
    }
}

/// Pagination metadata returned next to a page of results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

impl PaginationMeta {
    /// `pages = ceil(total / limit)`
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let total = total.max(0);
        let per_page = i64::from(limit.max(1));
        Self {
            page,
            limit,
            total,
            pages: (total + per_page - 1) / per_page,
        }
    }
}

/// Uniform response envelope: `{success, data?, message?, pagination?}`
///
/// Errors use the same outer shape, see `ErrorResponse` in the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            pagination: None,
        }
    }

    pub fn paginated(data: T, pagination: PaginationMeta) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            pagination: Some(pagination),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// A successful response that carries only a message
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            pagination: None,
        }
    }
}

/// Inclusive date range filter
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DateRange {
    /// A range whose start lies after its end matches nothing
    pub fn is_inverted(&self) -> bool {
        matches!((self.start_date, self.end_date), (Some(s), Some(e)) if s > e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let page = PaginationQuery::default().resolve(DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
        assert_eq!(page, Page { page: 1, limit: 10 });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_offset() {
        let query = PaginationQuery {
            page: Some(3),
            limit: Some(25),
        };
        assert_eq!(query.resolve(10, 100).offset(), 50);
    }

    #[test]
    fn test_clamping() {
        let query = PaginationQuery {
            page: Some(0),
            limit: Some(1000),
        };
        assert_eq!(query.resolve(10, 100), Page { page: 1, limit: 100 });
    }

    #[test]
    fn test_pages_ceiling() {
        assert_eq!(PaginationMeta::new(1, 10, 0).pages, 0);
        assert_eq!(PaginationMeta::new(1, 10, 10).pages, 1);
        assert_eq!(PaginationMeta::new(1, 10, 11).pages, 2);
    }

    #[test]
    fn test_unbounded() {
        assert!(PaginationQuery::default().is_unbounded());
        assert!(!PaginationQuery {
            page: Some(1),
            limit: None
        }
        .is_unbounded());
    }

    #[test]
    fn test_envelope_skips_empty_fields() {
        let json = serde_json::to_value(ApiResponse::message("done")).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "message": "done"}));
    }
}
