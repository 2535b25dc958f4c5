//! Stock, maintenance, attendance and paging rules

use chrono::{NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    apply_movement, hours_worked, maintenance_due, MachineStatus, MaterialStatus,
    PaginationMeta, PaginationQuery, StockError, TransactionType,
};

fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ============================================================================
// Material stock
// ============================================================================

#[test]
fn test_status_thresholds() {
    let min = dec(20);
    assert_eq!(MaterialStatus::derive(dec(0), min), MaterialStatus::OutOfStock);
    assert_eq!(MaterialStatus::derive(dec(-1), min), MaterialStatus::OutOfStock);
    assert_eq!(MaterialStatus::derive(dec(1), min), MaterialStatus::LowStock);
    assert_eq!(MaterialStatus::derive(dec(20), min), MaterialStatus::LowStock);
    assert_eq!(MaterialStatus::derive(dec(21), min), MaterialStatus::Available);
}

#[test]
fn test_zero_threshold() {
    assert_eq!(
        MaterialStatus::derive(Decimal::new(1, 3), Decimal::ZERO),
        MaterialStatus::Available
    );
}

#[test]
fn test_out_beyond_stock_rejected() {
    assert_eq!(
        apply_movement(dec(5), TransactionType::Out, dec(6)),
        Err(StockError::Insufficient {
            available: dec(5),
            requested: dec(6),
        })
    );
    assert_eq!(apply_movement(dec(5), TransactionType::Out, dec(5)), Ok(dec(0)));
}

#[test]
fn test_movement_quantity_must_be_positive() {
    assert_eq!(
        apply_movement(dec(5), TransactionType::In, Decimal::ZERO),
        Err(StockError::NonPositiveQuantity)
    );
}

proptest! {
    /// Stock never goes negative and IN followed by OUT of the same amount
    /// returns to the starting level
    #[test]
    fn prop_stock_never_negative(
        stock in 0i64..100_000,
        quantity in 1i64..100_000,
    ) {
        let stock = Decimal::new(stock, 2);
        let quantity = Decimal::new(quantity, 2);

        let raised = apply_movement(stock, TransactionType::In, quantity).unwrap();
        prop_assert_eq!(raised, stock + quantity);
        prop_assert_eq!(apply_movement(raised, TransactionType::Out, quantity).unwrap(), stock);

        match apply_movement(stock, TransactionType::Out, quantity) {
            Ok(level) => prop_assert!(level >= Decimal::ZERO),
            Err(StockError::Insufficient { .. }) => prop_assert!(quantity > stock),
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    #[test]
    fn prop_status_matches_thresholds(quantity in -100i64..1_000, min in 0i64..500) {
        let status = MaterialStatus::derive(dec(quantity), dec(min));
        prop_assert_eq!(status.needs_attention(), quantity <= min || quantity <= 0);
        prop_assert_eq!(status == MaterialStatus::OutOfStock, quantity <= 0);
    }
}

// ============================================================================
// Machine maintenance
// ============================================================================

#[test]
fn test_maintenance_window() {
    let today = date(2024, 3, 10);
    let due = |next| maintenance_due(MachineStatus::Operational, Some(next), today, 7);

    assert!(due(date(2024, 3, 1)), "overdue maintenance is due");
    assert!(due(date(2024, 3, 17)));
    assert!(!due(date(2024, 3, 18)));
    assert!(!maintenance_due(MachineStatus::Operational, None, today, 7));
    assert!(!maintenance_due(
        MachineStatus::Retired,
        Some(date(2024, 3, 1)),
        today,
        7
    ));
}

// ============================================================================
// Attendance hours
// ============================================================================

#[test]
fn test_hours_worked() {
    let at = |h, m| Utc.with_ymd_and_hms(2024, 3, 10, h, m, 0).unwrap();
    assert_eq!(
        hours_worked(Some(at(8, 0)), Some(at(17, 0))),
        Some(dec(9))
    );
    assert_eq!(
        hours_worked(Some(at(8, 0)), Some(at(12, 20))),
        Some(Decimal::new(433, 2))
    );
    assert_eq!(hours_worked(Some(at(8, 0)), None), None);
    assert_eq!(hours_worked(Some(at(17, 0)), Some(at(8, 0))), None);
}

// ============================================================================
// Pagination
// ============================================================================

#[test]
fn test_pagination_defaults() {
    let page = PaginationQuery::default().resolve(10, 100);
    assert_eq!((page.page, page.limit, page.offset()), (1, 10, 0));
    assert_eq!(page.meta(25), PaginationMeta { page: 1, limit: 10, total: 25, pages: 3 });
}

proptest! {
    #[test]
    fn prop_pagination_meta(
        page in 1u32..1_000,
        limit in 1u32..500,
        total in 0i64..1_000_000,
    ) {
        let query = PaginationQuery { page: Some(page), limit: Some(limit) };
        let resolved = query.resolve(10, 100);
        let limit = limit.min(100);

        prop_assert_eq!(resolved.limit, limit);
        prop_assert_eq!(resolved.offset(), (i64::from(page) - 1) * i64::from(limit));

        let meta = resolved.meta(total);
        let per_page = i64::from(limit);
        prop_assert_eq!(meta.pages, (total + per_page - 1) / per_page);
        prop_assert!(meta.pages * per_page >= total);
        prop_assert!((meta.pages - 1).max(0) * per_page <= total);
    }
}
