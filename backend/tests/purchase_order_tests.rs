//! Purchase order lifecycle tests
//!
//! Totals, status guards and receiving reconciliation. The service tests at
//! the end run against a fresh database per test, created from `DATABASE_URL`.

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    line_amount, reconcile_receipt, round_money, ItemProgress, PurchaseOrderError,
    PurchaseOrderStatus, PurchaseOrderTotals, ReceiptLine,
};
use uuid::Uuid;

use PurchaseOrderStatus::*;

fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

fn item(quantity: i64, received: i64) -> ItemProgress {
    ItemProgress {
        id: Uuid::new_v4(),
        quantity: dec(quantity),
        received_qty: dec(received),
    }
}

fn line(item: &ItemProgress, quantity: i64) -> ReceiptLine {
    ReceiptLine {
        id: item.id,
        quantity: dec(quantity),
    }
}

fn status_strategy() -> impl Strategy<Value = PurchaseOrderStatus> {
    prop::sample::select(PurchaseOrderStatus::ALL.to_vec())
}

/// Quantities with up to three and prices with up to two decimal places
fn line_strategy() -> impl Strategy<Value = (Decimal, Decimal)> {
    (1i64..1_000_000, 0i64..1_000_000).prop_map(|(q, p)| (Decimal::new(q, 3), Decimal::new(p, 2)))
}

// ============================================================================
// Totals
// ============================================================================

#[test]
fn test_single_line_totals() {
    let totals = PurchaseOrderTotals::compute([(dec(10), dec(5))], dec(10), dec(2)).unwrap();
    assert_eq!(totals.subtotal, dec(50));
    assert_eq!(totals.tax_amount, dec(5));
    assert_eq!(totals.total_amount, dec(57));
}

#[test]
fn test_zero_tax_and_shipping() {
    let totals = PurchaseOrderTotals::compute(
        [(dec(3), Decimal::new(1250, 2)), (dec(2), dec(4))],
        Decimal::ZERO,
        Decimal::ZERO,
    )
    .unwrap();
    assert_eq!(totals.subtotal, Decimal::new(4550, 2));
    assert_eq!(totals.total_amount, totals.subtotal);
}

#[test]
fn test_fractional_quantity_rounds_per_line() {
    // 0.125 m at 1.00 is 0.13, and 20% tax on 0.13 is 0.03
    let totals =
        PurchaseOrderTotals::compute([(Decimal::new(125, 3), dec(1))], dec(20), Decimal::ZERO)
            .unwrap();
    assert_eq!(totals.subtotal, Decimal::new(13, 2));
    assert_eq!(totals.tax_amount, Decimal::new(3, 2));
    assert_eq!(totals.total_amount, Decimal::new(16, 2));
}

#[test]
fn test_totals_beyond_storage_rejected() {
    let huge = Decimal::from(1_000_000_000_000_000_000i64);
    assert_eq!(
        PurchaseOrderTotals::compute([(huge, huge)], Decimal::ZERO, Decimal::ZERO),
        Err(PurchaseOrderError::AmountOutOfRange)
    );
    // Each line fits but the sum does not
    let big = Decimal::from(600_000_000_000i64);
    assert_eq!(
        PurchaseOrderTotals::compute([(dec(1), big), (dec(1), big)], Decimal::ZERO, Decimal::ZERO),
        Err(PurchaseOrderError::AmountOutOfRange)
    );
}

proptest! {
    /// Totals hold exactly on cent-rounded values:
    /// subtotal = Σ round(q × p), tax = round(subtotal × rate / 100),
    /// total = subtotal + tax + shipping
    #[test]
    fn prop_totals_invariant(
        lines in prop::collection::vec(line_strategy(), 1..20),
        rate in 0i64..=10_000,
        shipping in 0i64..1_000_000,
    ) {
        let tax_rate = Decimal::new(rate, 2);
        let shipping_cost = Decimal::new(shipping, 2);
        let totals =
            PurchaseOrderTotals::compute(lines.iter().copied(), tax_rate, shipping_cost).unwrap();

        let subtotal: Decimal = lines
            .iter()
            .map(|(q, p)| line_amount(*q, *p).unwrap())
            .sum();
        prop_assert_eq!(totals.subtotal, subtotal);
        prop_assert_eq!(totals.tax_amount, round_money(subtotal * tax_rate / Decimal::ONE_HUNDRED));
        prop_assert_eq!(
            totals.total_amount,
            totals.subtotal + totals.tax_amount + totals.shipping_cost
        );
        for value in [totals.subtotal, totals.tax_amount, totals.total_amount] {
            prop_assert!(value.normalize().scale() <= 2);
        }
        prop_assert!(totals.total_amount >= totals.subtotal);
    }
}

// ============================================================================
// Status guards
// ============================================================================

#[test]
fn test_initial_status() {
    assert_eq!(PurchaseOrderStatus::initial(None).unwrap(), Draft);
    assert_eq!(
        PurchaseOrderStatus::initial(Some(PendingApproval)).unwrap(),
        PendingApproval
    );
    assert!(matches!(
        PurchaseOrderStatus::initial(Some(Approved)),
        Err(PurchaseOrderError::InvalidInitialStatus(Approved))
    ));
}

#[test]
fn test_approval_path() {
    let status = Draft.submit().unwrap();
    assert_eq!(status, PendingApproval);
    assert_eq!(status.approve().unwrap(), Approved);
}

#[test]
fn test_approve_requires_pending_approval() {
    for status in [Draft, Approved, PartiallyReceived, Received, Cancelled] {
        assert!(status.approve().is_err(), "{} must not be approvable", status);
    }
}

#[test]
fn test_submit_only_from_draft() {
    for status in [PendingApproval, Approved, PartiallyReceived, Received, Cancelled] {
        assert!(status.submit().is_err(), "{} must not be submittable", status);
    }
}

#[test]
fn test_edit_transitions() {
    assert_eq!(Draft.edit_to(PendingApproval).unwrap(), PendingApproval);
    assert_eq!(PendingApproval.edit_to(Draft).unwrap(), Draft);
    assert_eq!(Approved.edit_to(Approved).unwrap(), Approved);
    assert!(PendingApproval.edit_to(Approved).is_err());
    assert!(Draft.edit_to(Received).is_err());
    assert!(matches!(
        Received.edit_to(Received),
        Err(PurchaseOrderError::NotEditable(Received))
    ));
}

#[test]
fn test_delete_only_in_draft() {
    assert!(Draft.ensure_deletable().is_ok());
    for status in [PendingApproval, Approved, PartiallyReceived, Received, Cancelled] {
        assert!(matches!(
            status.ensure_deletable(),
            Err(PurchaseOrderError::NotDeletable(_))
        ));
    }
}

proptest! {
    /// Terminal orders refuse every change
    #[test]
    fn prop_terminal_states_are_final(next in status_strategy()) {
        for terminal in [Received, Cancelled] {
            prop_assert!(!terminal.can_transition_to(next));
            prop_assert!(terminal.ensure_editable().is_err());
            prop_assert!(terminal.cancel().is_err());
        }
    }

    /// Every non-terminal order can be cancelled
    #[test]
    fn prop_cancel_from_open_states(status in status_strategy()) {
        prop_assume!(!status.is_terminal());
        prop_assert_eq!(status.cancel().unwrap(), Cancelled);
    }
}

// ============================================================================
// Receiving
// ============================================================================

#[test]
fn test_receive_in_two_steps() {
    let ordered = item(10, 0);

    let first = reconcile_receipt(Approved, &[ordered], &[line(&ordered, 4)]).unwrap();
    assert_eq!(first.status, PartiallyReceived);
    assert_eq!(first.items[0].received_qty, dec(4));
    assert_eq!(first.increments, vec![(ordered.id, dec(4))]);
    assert!(!first.is_complete());

    let second =
        reconcile_receipt(first.status, &first.items, &[line(&ordered, 6)]).unwrap();
    assert_eq!(second.status, Received);
    assert_eq!(second.items[0].received_qty, dec(10));
    assert!(second.is_complete());
}

#[test]
fn test_receive_requires_every_item() {
    let fabric = item(10, 0);
    let buttons = item(200, 0);
    let outcome = reconcile_receipt(Approved, &[fabric, buttons], &[line(&fabric, 10)]).unwrap();
    assert_eq!(outcome.status, PartiallyReceived);
    assert_eq!(outcome.items[1].received_qty, Decimal::ZERO);
}

#[test]
fn test_repeated_lines_are_summed() {
    let fabric = item(10, 0);
    let outcome = reconcile_receipt(
        Approved,
        &[fabric],
        &[line(&fabric, 3), line(&fabric, 7)],
    )
    .unwrap();
    assert_eq!(outcome.increments, vec![(fabric.id, dec(10))]);
    assert_eq!(outcome.status, Received);
}

#[test]
fn test_over_receipt_rejected() {
    let fabric = item(10, 8);
    let result = reconcile_receipt(PartiallyReceived, &[fabric], &[line(&fabric, 3)]);
    assert!(matches!(
        result,
        Err(PurchaseOrderError::OverReceipt { attempted, .. }) if attempted == dec(3)
    ));
}

#[test]
fn test_huge_receipt_is_an_over_receipt() {
    let fabric = item(10, 4);
    let huge = ReceiptLine {
        id: fabric.id,
        quantity: Decimal::MAX,
    };
    assert!(matches!(
        reconcile_receipt(PartiallyReceived, &[fabric], &[huge]),
        Err(PurchaseOrderError::OverReceipt { .. })
    ));
    assert!(matches!(
        reconcile_receipt(PartiallyReceived, &[fabric], &[huge, huge]),
        Err(PurchaseOrderError::OverReceipt { .. })
    ));
}

#[test]
fn test_unknown_item_rejected() {
    let fabric = item(10, 0);
    let stranger = item(1, 0);
    assert!(matches!(
        reconcile_receipt(Approved, &[fabric], &[line(&stranger, 1)]),
        Err(PurchaseOrderError::UnknownItem(id)) if id == stranger.id
    ));
}

#[test]
fn test_non_positive_quantity_rejected() {
    let fabric = item(10, 0);
    assert!(matches!(
        reconcile_receipt(Approved, &[fabric], &[line(&fabric, 0)]),
        Err(PurchaseOrderError::NonPositiveQuantity(_))
    ));
}

#[test]
fn test_empty_receipt_rejected() {
    let fabric = item(10, 0);
    assert!(matches!(
        reconcile_receipt(Approved, &[fabric], &[]),
        Err(PurchaseOrderError::EmptyReceipt)
    ));
}

#[test]
fn test_receive_requires_approval() {
    let fabric = item(10, 0);
    for status in [Draft, PendingApproval, Received, Cancelled] {
        assert!(matches!(
            reconcile_receipt(status, &[fabric], &[line(&fabric, 1)]),
            Err(PurchaseOrderError::NotReceivable(_))
        ));
    }
}

proptest! {
    /// Received quantity never exceeds the ordered quantity, and a failed
    /// receipt changes nothing
    #[test]
    fn prop_received_never_exceeds_ordered(
        ordered in 1i64..1_000,
        already in 0i64..1_000,
        attempt in 1i64..2_000,
    ) {
        let already = already.min(ordered);
        let fabric = item(ordered, already);
        let status = if already > 0 { PartiallyReceived } else { Approved };

        match reconcile_receipt(status, &[fabric], &[line(&fabric, attempt)]) {
            Ok(outcome) => {
                prop_assert!(already + attempt <= ordered);
                prop_assert!(outcome.items[0].received_qty <= outcome.items[0].quantity);
                prop_assert_eq!(outcome.is_complete(), already + attempt == ordered);
            }
            Err(PurchaseOrderError::OverReceipt { .. }) => {
                prop_assert!(already + attempt > ordered);
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}

// ============================================================================
// Service round trips against Postgres
// ============================================================================

mod services {
    use super::dec;

    use garment_erp::error::AppError;
    use garment_erp::services::material::{CreateMaterialInput, MaterialService};
    use garment_erp::services::purchase_order::{
        CreatePurchaseOrderInput, PurchaseOrderDetail, PurchaseOrderService, ReceiveItemsInput,
        UpdatePurchaseOrderInput,
    };
    use garment_erp::services::supplier::{CreateSupplierInput, SupplierService};
    use rust_decimal::Decimal;
    use serde_json::json;
    use shared::{MaterialStatus, PurchaseOrderStatus, ReceiptLine};
    use sqlx::PgPool;
    use uuid::Uuid;

    struct Fixture {
        orders: PurchaseOrderService,
        materials: MaterialService,
        user_id: Uuid,
        supplier_id: Uuid,
        material_id: Uuid,
    }

    async fn fixture(pool: &PgPool) -> Fixture {
        let user_id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (email, password_hash, name, role) \
             VALUES ('buyer@example.com', 'x', 'Buyer', 'MANAGER') RETURNING id",
        )
        .fetch_one(pool)
        .await
        .unwrap();

        let supplier: CreateSupplierInput =
            serde_json::from_value(json!({ "name": "Siam Textiles" })).unwrap();
        let supplier = SupplierService::new(pool.clone())
            .create(supplier)
            .await
            .unwrap();

        let materials = MaterialService::new(pool.clone());
        let material: CreateMaterialInput = serde_json::from_value(json!({
            "name": "Cotton twill",
            "category": "Fabric",
            "unit": "m",
            "minQuantity": "5",
            "unitPrice": "5.00"
        }))
        .unwrap();
        let material = materials.create(material, user_id).await.unwrap();

        Fixture {
            orders: PurchaseOrderService::new(pool.clone()),
            materials,
            user_id,
            supplier_id: supplier.id,
            material_id: material.id,
        }
    }

    impl Fixture {
        /// Ten metres at 5.00 with 10% tax and 2.00 shipping
        async fn order(&self) -> PurchaseOrderDetail {
            let input: CreatePurchaseOrderInput = serde_json::from_value(json!({
                "supplierId": self.supplier_id,
                "items": [{
                    "materialId": self.material_id,
                    "description": "Cotton twill",
                    "quantity": "10",
                    "unitPrice": "5"
                }],
                "taxRate": "10",
                "shippingCost": "2"
            }))
            .unwrap();
            self.orders.create(input, self.user_id).await.unwrap()
        }

        async fn approved_order(&self) -> PurchaseOrderDetail {
            let order = self.order().await;
            self.orders.submit(order.order.id).await.unwrap();
            self.orders
                .approve(order.order.id, self.user_id)
                .await
                .unwrap()
        }

        async fn receive(
            &self,
            order: &PurchaseOrderDetail,
            quantity: i64,
        ) -> Result<PurchaseOrderDetail, AppError> {
            let input = ReceiveItemsInput {
                items: vec![ReceiptLine {
                    id: order.items[0].id,
                    quantity: dec(quantity),
                }],
            };
            self.orders
                .receive(order.order.id, input, self.user_id)
                .await
        }

        async fn stock(&self) -> (Decimal, MaterialStatus) {
            let detail = self.materials.get(self.material_id).await.unwrap();
            (detail.material.quantity, detail.material.status)
        }
    }

    async fn receipts_booked(pool: &PgPool, material_id: Uuid, reference: &str) -> i64 {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM material_transactions \
             WHERE material_id = $1 AND type = 'IN' AND reference = $2",
        )
        .bind(material_id)
        .bind(reference)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_receive_in_two_steps_books_stock(pool: PgPool) {
        let f = fixture(&pool).await;
        let order = f.approved_order().await;
        let po_number = order.order.po_number.clone();

        assert_eq!(order.order.total_amount, dec(57));
        assert!(po_number.starts_with("PO"));
        assert_eq!(f.stock().await, (Decimal::ZERO, MaterialStatus::OutOfStock));

        let first = f.receive(&order, 4).await.unwrap();
        assert_eq!(first.order.status, PurchaseOrderStatus::PartiallyReceived);
        assert_eq!(first.items[0].received_qty, dec(4));
        assert_eq!(first.order.received_date, None);
        assert_eq!(f.stock().await, (dec(4), MaterialStatus::LowStock));
        assert_eq!(receipts_booked(&pool, f.material_id, &po_number).await, 1);

        let second = f.receive(&first, 6).await.unwrap();
        assert_eq!(second.order.status, PurchaseOrderStatus::Received);
        assert_eq!(second.items[0].received_qty, dec(10));
        assert!(second.order.received_date.is_some());
        assert_eq!(f.stock().await, (dec(10), MaterialStatus::Available));
        assert_eq!(receipts_booked(&pool, f.material_id, &po_number).await, 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_rejected_receipt_changes_nothing(pool: PgPool) {
        let f = fixture(&pool).await;
        let order = f.approved_order().await;

        let result = f.receive(&order, 11).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));

        let reloaded = f.orders.get(order.order.id).await.unwrap();
        assert_eq!(reloaded.order.status, PurchaseOrderStatus::Approved);
        assert_eq!(reloaded.items[0].received_qty, Decimal::ZERO);
        assert_eq!(f.stock().await.0, Decimal::ZERO);
        assert_eq!(
            receipts_booked(&pool, f.material_id, &order.order.po_number).await,
            0
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_update_replaces_items_and_totals(pool: PgPool) {
        let f = fixture(&pool).await;
        let order = f.order().await;
        let old_item = order.items[0].id;

        let input: UpdatePurchaseOrderInput = serde_json::from_value(json!({
            "items": [
                { "materialId": f.material_id, "description": "Cotton twill", "quantity": "20", "unitPrice": "2" },
                { "description": "Brass buttons", "quantity": "0.125", "unitPrice": "1" }
            ]
        }))
        .unwrap();
        let updated = f.orders.update(order.order.id, input).await.unwrap();

        assert_eq!(updated.items.len(), 2);
        assert!(updated.items.iter().all(|item| item.id != old_item));
        assert_eq!(updated.items[1].amount, Decimal::new(13, 2));
        // 40.13 + 10% tax (4.01) + 2.00 shipping
        assert_eq!(updated.order.subtotal, Decimal::new(4013, 2));
        assert_eq!(updated.order.tax_amount, Decimal::new(401, 2));
        assert_eq!(updated.order.total_amount, Decimal::new(4614, 2));
        assert_eq!(
            updated.order.total_amount,
            updated.order.subtotal + updated.order.tax_amount + updated.order.shipping_cost
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_refused_transitions_leave_order_unchanged(pool: PgPool) {
        let f = fixture(&pool).await;
        let order = f.order().await;
        let id = order.order.id;

        assert!(matches!(
            f.orders.approve(id, f.user_id).await,
            Err(AppError::InvalidStateTransition(_))
        ));

        f.orders.submit(id).await.unwrap();
        assert!(matches!(
            f.orders.delete(id).await,
            Err(AppError::InvalidStateTransition(_))
        ));

        let cancelled = f.orders.cancel(id).await.unwrap();
        assert_eq!(cancelled.order.status, PurchaseOrderStatus::Cancelled);

        let edit: UpdatePurchaseOrderInput =
            serde_json::from_value(json!({ "notes": "rush", "shippingCost": "9" })).unwrap();
        assert!(matches!(
            f.orders.update(id, edit).await,
            Err(AppError::InvalidStateTransition(_))
        ));

        let reloaded = f.orders.get(id).await.unwrap();
        assert_eq!(reloaded.order.status, PurchaseOrderStatus::Cancelled);
        assert_eq!(reloaded.order.notes, None);
        assert_eq!(reloaded.order.total_amount, dec(57));
        assert_eq!(reloaded.order.approved_by, None);
    }
}
