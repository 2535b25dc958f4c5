//! HTTP handlers

pub mod attendance;
pub mod auth;
pub mod customer;
pub mod employee;
pub mod health;
pub mod machine;
pub mod material;
pub mod measurement;
pub mod notification;
pub mod purchase_order;
pub mod setting;
pub mod supplier;
pub mod user;

pub use attendance::*;
pub use auth::*;
pub use customer::*;
pub use employee::*;
pub use health::*;
pub use machine::*;
pub use material::*;
pub use measurement::*;
pub use notification::*;
pub use purchase_order::*;
pub use setting::*;
pub use supplier::*;
pub use user::*;

use shared::{Page, PaginationQuery};

use crate::AppState;

/// Resolve the query-string window against the configured page sizes
pub(crate) fn page_of(state: &AppState, query: &PaginationQuery) -> Page {
    let limits = &state.config.pagination;
    query.resolve(limits.default_limit, limits.max_limit)
}
