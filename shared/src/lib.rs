//! Shared types and domain rules for the Garment ERP platform
//!
//! This crate holds everything that does not need a database connection:
//! domain enums, the purchase-order lifecycle, code generation, pagination
//! and the response envelope used by the backend.

pub mod codes;
pub mod models;
pub mod types;
pub mod validation;

pub use codes::*;
pub use models::*;
pub use types::*;
pub use validation::*;
