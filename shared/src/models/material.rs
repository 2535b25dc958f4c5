//! Material stock models

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::MAX_QUANTITY;

/// Stock level classification of a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaterialStatus {
    Available,
    LowStock,
    OutOfStock,
}

impl MaterialStatus {
    /// Classify `quantity` against the reorder threshold
    ///
    /// Zero or less is out of stock; at or below `min_quantity` is low.
    pub fn derive(quantity: Decimal, min_quantity: Decimal) -> Self {
        if quantity <= Decimal::ZERO {
            MaterialStatus::OutOfStock
        } else if quantity <= min_quantity {
            MaterialStatus::LowStock
        } else {
            MaterialStatus::Available
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialStatus::Available => "AVAILABLE",
            MaterialStatus::LowStock => "LOW_STOCK",
            MaterialStatus::OutOfStock => "OUT_OF_STOCK",
        }
    }

    pub fn needs_attention(&self) -> bool {
        !matches!(self, MaterialStatus::Available)
    }
}

impl fmt::Display for MaterialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaterialStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(MaterialStatus::Available),
            "LOW_STOCK" => Ok(MaterialStatus::LowStock),
            "OUT_OF_STOCK" => Ok(MaterialStatus::OutOfStock),
            _ => Err(format!("Unknown material status: {}", s)),
        }
    }
}

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "VARCHAR", rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    In,
    Out,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::In => "IN",
            TransactionType::Out => "OUT",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StockError {
    #[error("Quantity must be positive")]
    NonPositiveQuantity,

    #[error("Stock would exceed the storable maximum: {available} on hand, {requested} incoming")]
    CapacityExceeded {
        available: Decimal,
        requested: Decimal,
    },

    #[error("Insufficient stock: {available} available, {requested} requested")]
    Insufficient {
        available: Decimal,
        requested: Decimal,
    },
}

/// New stock level after moving `quantity` in direction `kind`
pub fn apply_movement(
    stock: Decimal,
    kind: TransactionType,
    quantity: Decimal,
) -> Result<Decimal, StockError> {
    if quantity <= Decimal::ZERO {
        return Err(StockError::NonPositiveQuantity);
    }
    match kind {
        TransactionType::In => stock
            .checked_add(quantity)
            .filter(|level| *level <= MAX_QUANTITY)
            .ok_or(StockError::CapacityExceeded {
                available: stock,
                requested: quantity,
            }),
        TransactionType::Out if quantity > stock => Err(StockError::Insufficient {
            available: stock,
            requested: quantity,
        }),
        TransactionType::Out => Ok(stock - quantity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_thresholds() {
        let min = Decimal::from(10);
        assert_eq!(MaterialStatus::derive(Decimal::ZERO, min), MaterialStatus::OutOfStock);
        assert_eq!(MaterialStatus::derive(Decimal::from(10), min), MaterialStatus::LowStock);
        assert_eq!(MaterialStatus::derive(Decimal::from(11), min), MaterialStatus::Available);
    }

    #[test]
    fn test_zero_threshold() {
        assert_eq!(
            MaterialStatus::derive(Decimal::ONE, Decimal::ZERO),
            MaterialStatus::Available
        );
    }

    #[test]
    fn test_movements() {
        let stock = Decimal::from(5);
        assert_eq!(apply_movement(stock, TransactionType::In, Decimal::from(3)), Ok(Decimal::from(8)));
        assert_eq!(apply_movement(stock, TransactionType::Out, Decimal::from(5)), Ok(Decimal::ZERO));
        assert!(matches!(
            apply_movement(stock, TransactionType::Out, Decimal::from(6)),
            Err(StockError::Insufficient { .. })
        ));
        assert_eq!(
            apply_movement(stock, TransactionType::In, Decimal::ZERO),
            Err(StockError::NonPositiveQuantity)
        );
    }

    #[test]
    fn test_incoming_stock_is_capped() {
        assert!(matches!(
            apply_movement(MAX_QUANTITY, TransactionType::In, Decimal::new(1, 3)),
            Err(StockError::CapacityExceeded { .. })
        ));
        assert!(matches!(
            apply_movement(Decimal::MAX, TransactionType::In, Decimal::MAX),
            Err(StockError::CapacityExceeded { .. })
        ));
    }
}
