//! Domain models for the Garment ERP platform

mod employee;
mod machine;
mod material;
mod measurement;
mod notification;
mod purchase_order;
mod user;

pub use employee::*;
pub use machine::*;
pub use material::*;
pub use measurement::*;
pub use notification::*;
pub use purchase_order::*;
pub use user::*;
