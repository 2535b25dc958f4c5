//! Sequential code tests
//!
//! Flat namespaces (`CUST0001`) and month-scoped purchase order numbers
//! (`PO202401-0001`).

use chrono::NaiveDate;
use proptest::prelude::*;
use shared::{CodeError, CodeKind, SEQUENCE_WIDTH};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn flat_kind_strategy() -> impl Strategy<Value = CodeKind> {
    prop_oneof![
        Just(CodeKind::Customer),
        Just(CodeKind::Supplier),
        Just(CodeKind::Machine),
        Just(CodeKind::Material),
        Just(CodeKind::Measurement),
    ]
}

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2100, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| date(y, m, d))
}

// ============================================================================
// Flat namespaces
// ============================================================================

#[test]
fn test_first_codes() {
    let today = date(2024, 1, 15);
    assert_eq!(CodeKind::Customer.next_code(today, None).unwrap(), "CUST0001");
    assert_eq!(CodeKind::Supplier.next_code(today, None).unwrap(), "SUP0001");
    assert_eq!(CodeKind::Material.next_code(today, None).unwrap(), "MAT0001");
}

#[test]
fn test_code_follows_greatest_existing() {
    let today = date(2024, 1, 15);
    assert_eq!(
        CodeKind::Customer.next_code(today, Some("CUST0041")).unwrap(),
        "CUST0042"
    );
}

#[test]
fn test_foreign_code_is_an_error() {
    let today = date(2024, 1, 15);
    assert!(matches!(
        CodeKind::Customer.next_code(today, Some("CUSTABCD")),
        Err(CodeError::InvalidSuffix(_))
    ));
    assert!(matches!(
        CodeKind::Customer.next_code(today, Some("SUP0001")),
        Err(CodeError::PrefixMismatch { .. })
    ));
}

#[test]
fn test_namespace_exhaustion() {
    let today = date(2024, 1, 15);
    assert!(matches!(
        CodeKind::Machine.next_code(today, Some("MCH9999")),
        Err(CodeError::Exhausted { .. })
    ));
}

// ============================================================================
// Monthly purchase order numbers
// ============================================================================

#[test]
fn test_po_number_format() {
    let today = date(2024, 1, 15);
    assert_eq!(
        CodeKind::PurchaseOrder.next_code(today, None).unwrap(),
        "PO202401-0001"
    );
    assert_eq!(
        CodeKind::PurchaseOrder
            .next_code(today, Some("PO202401-0007"))
            .unwrap(),
        "PO202401-0008"
    );
}

#[test]
fn test_po_sequence_restarts_each_month() {
    let february = date(2024, 2, 1);
    assert_eq!(CodeKind::PurchaseOrder.scope(february), "PO202402-");
    assert_eq!(
        CodeKind::PurchaseOrder.next_code(february, None).unwrap(),
        "PO202402-0001"
    );
    // A code from January is not part of February's namespace
    assert!(CodeKind::PurchaseOrder
        .next_code(february, Some("PO202401-0031"))
        .is_err());
}

#[test]
fn test_december_scope() {
    assert_eq!(CodeKind::PurchaseOrder.scope(date(2023, 12, 31)), "PO202312-");
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// The next code keeps the prefix and width and carries sequence + 1
    #[test]
    fn prop_next_code_increments(
        kind in flat_kind_strategy(),
        today in date_strategy(),
        current in 1u32..9999,
    ) {
        let last = kind.render(today, current).unwrap();
        let next = kind.next_code(today, Some(&last)).unwrap();

        prop_assert!(next.starts_with(kind.prefix()));
        prop_assert_eq!(next.len(), kind.prefix().len() + SEQUENCE_WIDTH);
        prop_assert_eq!(kind.sequence_of(today, &next).unwrap(), current + 1);
        prop_assert!(next > last);
    }

    /// Codes issued one after another within a month never collide
    #[test]
    fn prop_monthly_codes_unique(today in date_strategy(), count in 1usize..60) {
        let kind = CodeKind::PurchaseOrder;
        let mut issued: Vec<String> = Vec::with_capacity(count);
        for _ in 0..count {
            let next = kind.next_code(today, issued.last().map(String::as_str)).unwrap();
            prop_assert!(next.starts_with(&kind.scope(today)));
            prop_assert!(!issued.contains(&next));
            issued.push(next);
        }
        prop_assert_eq!(
            kind.sequence_of(today, issued.last().unwrap()).unwrap(),
            count as u32
        );
    }
}
