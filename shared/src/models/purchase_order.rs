//! Purchase order lifecycle, totals and receiving reconciliation

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::validation::{exceeds_scale, MAX_AMOUNT, MONEY_SCALE, QUANTITY_SCALE};

/// Purchase order status
///
/// `DRAFT → PENDING_APPROVAL → APPROVED → (PARTIALLY_RECEIVED →)* RECEIVED`,
/// with `CANCELLED` reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    Draft,
    PendingApproval,
    Approved,
    PartiallyReceived,
    Received,
    Cancelled,
}

/// Lifecycle violations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PurchaseOrderError {
    #[error("Cannot change purchase order status from {from} to {to}")]
    InvalidTransition {
        from: PurchaseOrderStatus,
        to: PurchaseOrderStatus,
    },

    #[error("Purchase order can only be created as DRAFT or PENDING_APPROVAL, got {0}")]
    InvalidInitialStatus(PurchaseOrderStatus),

    #[error("Cannot edit a purchase order with status {0}")]
    NotEditable(PurchaseOrderStatus),

    #[error("Only DRAFT purchase orders can be deleted, current status is {0}")]
    NotDeletable(PurchaseOrderStatus),

    #[error("Purchase order must be APPROVED or PARTIALLY_RECEIVED to receive items, current status is {0}")]
    NotReceivable(PurchaseOrderStatus),

    #[error("Purchase order must contain at least one item")]
    NoItems,

    #[error("Receipt must contain at least one item")]
    EmptyReceipt,

    #[error("Item {0} does not belong to this purchase order")]
    UnknownItem(Uuid),

    #[error("Received quantity for item {0} must be positive")]
    NonPositiveQuantity(Uuid),

    #[error("Received quantity for item {0} has more than 3 decimal places")]
    TooPrecise(Uuid),

    #[error("Purchase order amounts exceed the supported range")]
    AmountOutOfRange,

    #[error("Item {item_id}: receiving {attempted} would exceed ordered quantity {ordered} (already received {received})")]
    OverReceipt {
        item_id: Uuid,
        ordered: Decimal,
        received: Decimal,
        attempted: Decimal,
    },
}

impl PurchaseOrderStatus {
    pub const ALL: [PurchaseOrderStatus; 6] = [
        PurchaseOrderStatus::Draft,
        PurchaseOrderStatus::PendingApproval,
        PurchaseOrderStatus::Approved,
        PurchaseOrderStatus::PartiallyReceived,
        PurchaseOrderStatus::Received,
        PurchaseOrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Draft => "DRAFT",
            PurchaseOrderStatus::PendingApproval => "PENDING_APPROVAL",
            PurchaseOrderStatus::Approved => "APPROVED",
            PurchaseOrderStatus::PartiallyReceived => "PARTIALLY_RECEIVED",
            PurchaseOrderStatus::Received => "RECEIVED",
            PurchaseOrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Received | PurchaseOrderStatus::Cancelled
        )
    }

    /// Statuses whose amounts count as money spent
    pub fn counts_as_spent(&self) -> bool {
        matches!(
            self,
            PurchaseOrderStatus::Received | PurchaseOrderStatus::PartiallyReceived
        )
    }

    /// Whether the state machine has an edge from `self` to `next`
    pub fn can_transition_to(&self, next: PurchaseOrderStatus) -> bool {
        use PurchaseOrderStatus::*;

        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Cancelled) => true,
            (Draft, PendingApproval) => true,
            (PendingApproval, Draft) => true,
            (PendingApproval, Approved) => true,
            (Approved, PartiallyReceived) | (Approved, Received) => true,
            (PartiallyReceived, PartiallyReceived) | (PartiallyReceived, Received) => true,
            _ => false,
        }
    }

    fn transition(self, next: PurchaseOrderStatus) -> Result<Self, PurchaseOrderError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(PurchaseOrderError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Status a new order starts in
    pub fn initial(requested: Option<PurchaseOrderStatus>) -> Result<Self, PurchaseOrderError> {
        match requested {
            None => Ok(PurchaseOrderStatus::Draft),
            Some(s @ (PurchaseOrderStatus::Draft | PurchaseOrderStatus::PendingApproval)) => Ok(s),
            Some(other) => Err(PurchaseOrderError::InvalidInitialStatus(other)),
        }
    }

    pub fn ensure_editable(&self) -> Result<(), PurchaseOrderError> {
        if self.is_terminal() {
            Err(PurchaseOrderError::NotEditable(*self))
        } else {
            Ok(())
        }
    }

    pub fn ensure_deletable(&self) -> Result<(), PurchaseOrderError> {
        if *self == PurchaseOrderStatus::Draft {
            Ok(())
        } else {
            Err(PurchaseOrderError::NotDeletable(*self))
        }
    }

    pub fn ensure_receivable(&self) -> Result<(), PurchaseOrderError> {
        match self {
            PurchaseOrderStatus::Approved | PurchaseOrderStatus::PartiallyReceived => Ok(()),
            other => Err(PurchaseOrderError::NotReceivable(*other)),
        }
    }

    /// Status change requested through the edit endpoint
    ///
    /// Only `DRAFT ↔ PENDING_APPROVAL` moves are allowed here; approval,
    /// receiving and cancellation go through their own operations.
    pub fn edit_to(self, requested: PurchaseOrderStatus) -> Result<Self, PurchaseOrderError> {
        self.ensure_editable()?;
        if requested == self {
            return Ok(self);
        }
        match requested {
            PurchaseOrderStatus::Draft | PurchaseOrderStatus::PendingApproval => {
                self.transition(requested)
            }
            _ => Err(PurchaseOrderError::InvalidTransition {
                from: self,
                to: requested,
            }),
        }
    }

    pub fn submit(self) -> Result<Self, PurchaseOrderError> {
        if self != PurchaseOrderStatus::Draft {
            return Err(PurchaseOrderError::InvalidTransition {
                from: self,
                to: PurchaseOrderStatus::PendingApproval,
            });
        }
        self.transition(PurchaseOrderStatus::PendingApproval)
    }

    pub fn approve(self) -> Result<Self, PurchaseOrderError> {
        self.transition(PurchaseOrderStatus::Approved)
    }

    pub fn cancel(self) -> Result<Self, PurchaseOrderError> {
        self.transition(PurchaseOrderStatus::Cancelled)
    }
}

impl fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseOrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown purchase order status: {}", s))
    }
}

/// Monetary totals of a purchase order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrderTotals {
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub shipping_cost: Decimal,
    pub total_amount: Decimal,
}

/// Round a money value to cents, halves away from zero
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

fn within_amount(value: Option<Decimal>) -> Result<Decimal, PurchaseOrderError> {
    value
        .filter(|v| v.abs() <= MAX_AMOUNT)
        .ok_or(PurchaseOrderError::AmountOutOfRange)
}

/// Amount of a single line: `quantity × unit_price`, rounded to cents
pub fn line_amount(quantity: Decimal, unit_price: Decimal) -> Result<Decimal, PurchaseOrderError> {
    within_amount(quantity.checked_mul(unit_price).map(round_money))
}

impl PurchaseOrderTotals {
    /// Totals for `(quantity, unit_price)` lines
    ///
    /// Line amounts and `tax_amount = subtotal × tax_rate / 100` are rounded
    /// to cents before summing, so the stored values satisfy
    /// `subtotal = Σ amount` and
    /// `total_amount = subtotal + tax_amount + shipping_cost` exactly.
    pub fn compute<I>(
        lines: I,
        tax_rate: Decimal,
        shipping_cost: Decimal,
    ) -> Result<Self, PurchaseOrderError>
    where
        I: IntoIterator<Item = (Decimal, Decimal)>,
    {
        let mut subtotal = Decimal::ZERO;
        for (quantity, unit_price) in lines {
            let amount = line_amount(quantity, unit_price)?;
            subtotal = within_amount(subtotal.checked_add(amount))?;
        }
        let shipping_cost = within_amount(Some(round_money(shipping_cost)))?;
        let tax_amount = within_amount(
            subtotal
                .checked_mul(tax_rate)
                .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
                .map(round_money),
        )?;
        let total_amount = within_amount(
            subtotal
                .checked_add(tax_amount)
                .and_then(|v| v.checked_add(shipping_cost)),
        )?;

        Ok(Self {
            subtotal,
            tax_rate,
            tax_amount,
            shipping_cost,
            total_amount,
        })
    }
}

/// Ordered and received quantity of one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemProgress {
    pub id: Uuid,
    pub quantity: Decimal,
    pub received_qty: Decimal,
}

impl ItemProgress {
    pub fn is_fulfilled(&self) -> bool {
        self.received_qty >= self.quantity
    }
}

/// One `(itemId, quantity)` pair of a receive request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub id: Uuid,
    pub quantity: Decimal,
}

/// Result of reconciling a receipt against the current item state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptOutcome {
    /// Quantity received per item in this call, in request order of first
    /// appearance
    pub increments: Vec<(Uuid, Decimal)>,
    /// Item state after the receipt, same order as the input items
    pub items: Vec<ItemProgress>,
    pub status: PurchaseOrderStatus,
}

impl ReceiptOutcome {
    pub fn is_complete(&self) -> bool {
        self.status == PurchaseOrderStatus::Received
    }
}

/// Apply a receipt to the items of an order in `status`
///
/// Quantities are additive across calls. Receiving more than was ordered is
/// rejected. Nothing is applied unless every line is valid. The resulting
/// status is `RECEIVED` when every item is fulfilled, otherwise
/// `PARTIALLY_RECEIVED`.
pub fn reconcile_receipt(
    status: PurchaseOrderStatus,
    items: &[ItemProgress],
    lines: &[ReceiptLine],
) -> Result<ReceiptOutcome, PurchaseOrderError> {
    status.ensure_receivable()?;
    if lines.is_empty() {
        return Err(PurchaseOrderError::EmptyReceipt);
    }

    let mut increments: Vec<(Uuid, Decimal)> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    for line in lines {
        if !items.iter().any(|item| item.id == line.id) {
            return Err(PurchaseOrderError::UnknownItem(line.id));
        }
        if line.quantity <= Decimal::ZERO {
            return Err(PurchaseOrderError::NonPositiveQuantity(line.id));
        }
        if exceeds_scale(&line.quantity, QUANTITY_SCALE) {
            return Err(PurchaseOrderError::TooPrecise(line.id));
        }
        match index.get(&line.id) {
            Some(&pos) => {
                // Anything past the storable maximum is over-received anyway
                increments[pos].1 = increments[pos]
                    .1
                    .checked_add(line.quantity)
                    .unwrap_or(Decimal::MAX);
            }
            None => {
                index.insert(line.id, increments.len());
                increments.push((line.id, line.quantity));
            }
        }
    }

    let mut updated = items.to_vec();
    for item in updated.iter_mut() {
        if let Some(&pos) = index.get(&item.id) {
            let attempted = increments[pos].1;
            let Some(received) = item
                .received_qty
                .checked_add(attempted)
                .filter(|total| *total <= item.quantity)
            else {
                return Err(PurchaseOrderError::OverReceipt {
                    item_id: item.id,
                    ordered: item.quantity,
                    received: item.received_qty,
                    attempted,
                });
            };
            item.received_qty = received;
        }
    }

    let next = if updated.iter().all(ItemProgress::is_fulfilled) {
        PurchaseOrderStatus::Received
    } else {
        PurchaseOrderStatus::PartiallyReceived
    };

    Ok(ReceiptOutcome {
        increments,
        items: updated,
        status: status.transition(next)?,
    })
}
