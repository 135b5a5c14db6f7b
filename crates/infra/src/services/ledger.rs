//! Recording and reading stock movements.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use stockroom_core::{ItemId, MovementId};
use stockroom_inventory::{BalanceUpdate, Movement, MovementRequest, balance, stats};

use crate::services::error::ServiceResult;
use crate::store::{ItemStore, MovementLedger, StoreError};

/// Stored balance of an item compared with a replay of its ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceCheck {
    pub item_id: ItemId,
    pub stored: u32,
    pub replayed: u32,
    pub movements: usize,
}

impl BalanceCheck {
    pub fn is_consistent(&self) -> bool {
        self.stored == self.replayed
    }
}

#[derive(Debug)]
pub struct Ledger<S> {
    store: Arc<S>,
    default_user: String,
}

impl<S> Ledger<S> {
    pub fn new(store: Arc<S>, default_user: impl Into<String>) -> Self {
        Self {
            store,
            default_user: default_user.into(),
        }
    }
}

impl<S> Ledger<S>
where
    S: MovementLedger + ItemStore,
{
    /// Record a movement now. See [`Ledger::record_movement_at`].
    pub async fn record_movement(
        &self,
        item_id: ItemId,
        request: MovementRequest,
    ) -> ServiceResult<BalanceUpdate> {
        self.record_movement_at(item_id, request, Utc::now()).await
    }

    /// Validate `request`, then append it and update the item's balance in
    /// one atomic store operation.
    ///
    /// A request without a user is attributed to the configured default user.
    /// `at` earlier than the item's last change is rejected as a validation
    /// error and nothing is written.
    #[instrument(
        skip(self, request),
        fields(item_id = %item_id, kind = %request.kind, quantity = request.quantity)
    )]
    pub async fn record_movement_at(
        &self,
        item_id: ItemId,
        mut request: MovementRequest,
        at: DateTime<Utc>,
    ) -> ServiceResult<BalanceUpdate> {
        request.validate()?;
        if request.user.trim().is_empty() {
            request.user = self.default_user.clone();
        }

        let update = self
            .store
            .record_movement(item_id, &request, MovementId::new(), at)
            .await?;

        info!(
            movement_id = %update.movement.id,
            from = update.previous_quantity,
            to = update.new_quantity(),
            "movement recorded"
        );
        Ok(update)
    }

    /// All movements, newest first.
    pub async fn list_movements(&self) -> ServiceResult<Vec<Movement>> {
        let mut movements = self.store.list_movements().await?;
        stats::sort_recent_first(&mut movements);
        Ok(movements)
    }

    /// Movements of one item, newest first. Works for deleted items too.
    pub async fn movements_for_item(&self, item_id: ItemId) -> ServiceResult<Vec<Movement>> {
        let mut movements = self.store.movements_for_item(item_id).await?;
        stats::sort_recent_first(&mut movements);
        Ok(movements)
    }

    /// Compare the item's stored quantity with a chronological replay of its
    /// movements starting from `initial`.
    ///
    /// Reports only. Direct quantity edits legitimately cause a mismatch.
    pub async fn check_balance(
        &self,
        item_id: ItemId,
        initial: u32,
    ) -> ServiceResult<BalanceCheck> {
        let item = self
            .store
            .get_item(item_id)
            .await?
            .ok_or_else(|| StoreError::item_not_found(item_id))?;

        let history = self.movements_for_item(item_id).await?;
        let replayed = balance::replay(initial, history.iter().rev())
            .last()
            .copied()
            .unwrap_or(initial);

        Ok(BalanceCheck {
            item_id,
            stored: item.quantity,
            replayed,
            movements: history.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use stockroom_inventory::{MovementKind, NewItem};

    use crate::services::{InventoryService, StockroomError};
    use crate::store::{InMemoryStore, OrphanPolicy};

    fn new_item(quantity: u32) -> NewItem {
        NewItem {
            name: "Pallet jack".to_string(),
            code: "PJ-1".to_string(),
            quantity,
            price: Decimal::new(45000, 2),
            location: "Dock".to_string(),
            category: None,
            min_stock: None,
        }
    }

    fn kind_strategy() -> impl Strategy<Value = MovementKind> {
        prop_oneof![
            Just(MovementKind::Entry),
            Just(MovementKind::Exit),
            Just(MovementKind::Adjustment),
        ]
    }

    /// Seconds between consecutive attempts; negative means back-dated.
    fn offset_strategy() -> impl Strategy<Value = i64> {
        prop_oneof![-3i64..0, 1i64..4]
    }

    proptest! {
        #[test]
        fn stored_balance_always_matches_ledger_replay(
            initial in 0u32..1_000,
            steps in proptest::collection::vec(
                (kind_strategy(), 1u32..500, offset_strategy()),
                1..25,
            ),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let store = Arc::new(InMemoryStore::new());
                let inventory = InventoryService::new(store.clone(), OrphanPolicy::Retain);
                let ledger = Ledger::new(store, "System");
                let item = inventory.create_item(new_item(initial)).await.unwrap();

                // Offsets may step backwards; those movements must be refused.
                let mut clock = item.updated_at;
                let mut accepted = 0;
                for (kind, qty, offset) in steps {
                    let at = clock + Duration::seconds(offset);
                    let request = MovementRequest::new(kind, qty, "cycle count");
                    match ledger.record_movement_at(item.id, request, at).await {
                        Ok(update) => {
                            assert!(at >= clock);
                            assert_eq!(update.item.updated_at, at);
                            clock = at;
                            accepted += 1;
                        }
                        Err(err) => {
                            assert!(at < clock);
                            assert!(matches!(err, StockroomError::Validation(_)));
                        }
                    }

                    let check = ledger.check_balance(item.id, initial).await.unwrap();
                    assert!(check.is_consistent(), "{check:?}");
                    assert_eq!(check.movements, accepted);
                }
            });
        }
    }
}
