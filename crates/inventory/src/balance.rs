//! Balance-update procedure.
//!
//! Recording a movement produces two writes: the appended [`Movement`] and the
//! item with its new quantity. This module computes both without touching
//! storage; the store is responsible for persisting them as one unit.

use chrono::{DateTime, Utc};

use stockroom_core::{DomainError, DomainResult, MovementId};

use crate::item::Item;
use crate::movement::{Movement, MovementKind, MovementRequest};

/// Outcome of the balance-update procedure, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceUpdate {
    pub movement: Movement,
    pub item: Item,
    pub previous_quantity: u32,
}

impl BalanceUpdate {
    pub fn new_quantity(&self) -> u32 {
        self.item.quantity
    }
}

/// New balance after applying a movement of `quantity` to `current`.
///
/// Exits clamp at zero: any excess over the current balance is absorbed.
/// Entries saturate at `u32::MAX`.
pub fn next_quantity(kind: MovementKind, current: u32, quantity: u32) -> u32 {
    match kind {
        MovementKind::Entry => current.saturating_add(quantity),
        MovementKind::Exit => current.saturating_sub(quantity),
        MovementKind::Adjustment => quantity,
    }
}

/// Apply `request` to `item`.
///
/// The movement snapshots the item's current name. The returned item differs
/// from the input only in `quantity` and `updated_at`.
///
/// `at` may not precede `item.updated_at`. Every movement refreshes
/// `updated_at`, so accepted movements of one item are in timestamp order
/// and a chronological replay matches the order they were applied in.
pub fn record(
    item: &Item,
    request: &MovementRequest,
    movement_id: MovementId,
    at: DateTime<Utc>,
) -> DomainResult<BalanceUpdate> {
    if at < item.updated_at {
        return Err(DomainError::validation(format!(
            "movement time {at} is earlier than the item's last change at {}",
            item.updated_at
        )));
    }

    let previous_quantity = item.quantity;

    let movement = Movement {
        id: movement_id,
        item_id: item.id,
        item_name: item.name.clone(),
        kind: request.kind,
        quantity: request.quantity,
        reason: request.reason.clone(),
        user: request.user.clone(),
        timestamp: at,
    };

    let mut updated = item.clone();
    updated.quantity = next_quantity(request.kind, previous_quantity, request.quantity);
    updated.updated_at = at;

    Ok(BalanceUpdate {
        movement,
        item: updated,
        previous_quantity,
    })
}

/// Replay movements in the order given, starting from `initial`.
///
/// Returns the balance after each movement. Callers pass movements in
/// chronological order.
pub fn replay<'a>(initial: u32, movements: impl IntoIterator<Item = &'a Movement>) -> Vec<u32> {
    let mut current = initial;
    movements
        .into_iter()
        .map(|m| {
            current = next_quantity(m.kind, current, m.quantity);
            current
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use stockroom_core::ItemId;

    use crate::item::NewItem;
    use crate::stats::sort_recent_first;

    fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, minute, 0).unwrap()
    }

    fn item(code: &str, quantity: u32, min_stock: Option<u32>) -> Item {
        Item::create(
            ItemId::new(),
            NewItem {
                name: format!("Item {code}"),
                code: code.to_string(),
                quantity,
                price: Decimal::new(995, 2),
                location: "Aisle 1".to_string(),
                category: None,
                min_stock,
            },
            t(0),
        )
        .unwrap()
    }

    fn kind_strategy() -> impl Strategy<Value = MovementKind> {
        prop_oneof![
            Just(MovementKind::Entry),
            Just(MovementKind::Exit),
            Just(MovementKind::Adjustment),
        ]
    }

    #[test]
    fn record_changes_only_quantity_and_updated_at() {
        let before = item("A1", 5, Some(10));
        let request = MovementRequest::entry(20, "restock").by("ana");
        let update = record(&before, &request, MovementId::new(), t(1)).unwrap();

        assert_eq!(update.previous_quantity, 5);
        assert_eq!(update.new_quantity(), 25);
        assert_eq!(update.item.updated_at, t(1));

        let mut expected = before.clone();
        expected.quantity = 25;
        expected.updated_at = t(1);
        assert_eq!(update.item, expected);

        assert_eq!(update.movement.item_id, before.id);
        assert_eq!(update.movement.item_name, "Item A1");
        assert_eq!(update.movement.user, "ana");
        assert_eq!(update.movement.timestamp, t(1));
    }

    #[test]
    fn backdated_movement_is_rejected() {
        let count = MovementRequest::adjustment(100, "count");
        let current = record(&item("B1", 5, None), &count, MovementId::new(), t(10))
            .unwrap()
            .item;

        let sale = MovementRequest::exit(30, "sale");
        let err = record(&current, &sale, MovementId::new(), t(1)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        // Same instant as the last change is still in order.
        let same = record(&current, &sale, MovementId::new(), t(10)).unwrap();
        assert_eq!(same.new_quantity(), 70);
    }

    #[test]
    fn exit_larger_than_balance_clamps_to_zero() {
        assert_eq!(next_quantity(MovementKind::Exit, 4, 9), 0);
    }

    #[test]
    fn zero_quantity_is_tolerated_by_the_formula() {
        assert_eq!(next_quantity(MovementKind::Entry, 4, 0), 4);
        assert_eq!(next_quantity(MovementKind::Exit, 4, 0), 4);
        assert_eq!(next_quantity(MovementKind::Adjustment, 4, 0), 0);
    }

    #[test]
    fn entry_saturates_instead_of_overflowing() {
        assert_eq!(next_quantity(MovementKind::Entry, u32::MAX - 1, 5), u32::MAX);
    }

    #[test]
    fn worked_scenario_and_replay_agree() {
        let mut current = item("A1", 5, Some(10));
        assert!(current.is_low_stock());

        let steps = [
            (MovementRequest::entry(20, "purchase"), 25, false),
            (MovementRequest::exit(30, "sale"), 0, true),
            (MovementRequest::adjustment(3, "count"), 3, true),
        ];

        let mut ledger = Vec::new();
        for (minute, (request, expected_qty, expected_low)) in steps.into_iter().enumerate() {
            let at = t(minute as u32 + 1);
            let update = record(&current, &request, MovementId::new(), at).unwrap();
            assert_eq!(update.new_quantity(), expected_qty);
            assert_eq!(update.item.is_low_stock(), expected_low);
            ledger.push(update.movement);
            current = update.item;
        }

        // Display order is newest first; replay needs the reverse.
        sort_recent_first(&mut ledger);
        assert_eq!(ledger[0].kind, MovementKind::Adjustment);
        let chronological: Vec<_> = ledger.iter().rev().collect();
        assert_eq!(replay(5, chronological), vec![25, 0, 3]);
    }

    proptest! {
        #[test]
        fn exits_never_drive_quantity_negative(
            start in 0u32..10_000,
            exits in proptest::collection::vec(0u32..50_000, 0..20),
        ) {
            let mut q = start;
            for m in exits {
                let next = next_quantity(MovementKind::Exit, q, m);
                prop_assert!(next <= q);
                prop_assert_eq!(next, q.saturating_sub(m));
                q = next;
            }
        }

        #[test]
        fn adjustment_sets_exact_value(current in any::<u32>(), target in any::<u32>()) {
            prop_assert_eq!(next_quantity(MovementKind::Adjustment, current, target), target);
        }

        #[test]
        fn entry_then_equal_exit_round_trips(current in 0u32..1_000_000, m in 1u32..1_000_000) {
            let after_entry = next_quantity(MovementKind::Entry, current, m);
            prop_assert_eq!(next_quantity(MovementKind::Exit, after_entry, m), current);
        }

        #[test]
        fn replay_matches_step_by_step_recording(
            start in 0u32..1_000,
            steps in proptest::collection::vec((kind_strategy(), 1u32..500), 1..30),
        ) {
            let mut current = item("P1", start, None);
            let mut ledger = Vec::new();
            let mut balances = Vec::new();

            for (i, (kind, qty)) in steps.into_iter().enumerate() {
                let at = t(0) + chrono::Duration::seconds(i as i64 + 1);
                let request = MovementRequest::new(kind, qty, "prop");
                let update = record(&current, &request, MovementId::new(), at).unwrap();
                balances.push(update.new_quantity());
                ledger.push(update.movement);
                current = update.item;
            }

            prop_assert_eq!(replay(start, &ledger), balances);
        }
    }
}
