//! Inventory ledger: the single source of truth for stock counts.
//!
//! All mutations are atomic read-modify-write operations scoped to one item,
//! executed under a single write section so that two concurrent `reserve`
//! calls for the last unit can never both observe pre-mutation counters.
//! Every mutation re-evaluates alerts for the touched item within the same
//! write section; evaluation never rolls the mutation back.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use toolhire_alerts::{AlertMonitor, AlertStore};
use toolhire_core::{DomainError, DomainResult};
use toolhire_inventory::{InventoryItem, ItemId, StockHealth, StockLevels};

/// Post-mutation view of one item's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockSnapshot {
    pub levels: StockLevels,
    pub health: StockHealth,
}

/// Stock accounting operations plus catalog-style lookup.
///
/// `item`/`upsert_item` stand in for the external catalog collaborator:
/// items are created by provider catalog management, never by this engine.
pub trait InventoryLedger: Send + Sync {
    fn item(&self, item_id: ItemId) -> DomainResult<InventoryItem>;

    fn upsert_item(&self, item: InventoryItem);

    /// Claim units from available stock; all-or-nothing.
    fn reserve(&self, item_id: ItemId, quantity: i64) -> DomainResult<StockSnapshot>;

    /// Convert a standing reservation into consumed stock at checkout.
    fn commit_reservation(&self, item_id: ItemId, quantity: i64) -> DomainResult<StockSnapshot>;

    /// Give a reservation back at cancellation before checkout.
    fn release_reservation(&self, item_id: ItemId, quantity: i64) -> DomainResult<StockSnapshot>;

    /// Return physical units after the rental's return step.
    fn restock(&self, item_id: ItemId, quantity: i64) -> DomainResult<StockSnapshot>;

    /// Current counters + health classification, no mutation.
    fn health(&self, item_id: ItemId) -> DomainResult<StockSnapshot>;
}

impl<L> InventoryLedger for Arc<L>
where
    L: InventoryLedger + ?Sized,
{
    fn item(&self, item_id: ItemId) -> DomainResult<InventoryItem> {
        (**self).item(item_id)
    }

    fn upsert_item(&self, item: InventoryItem) {
        (**self).upsert_item(item)
    }

    fn reserve(&self, item_id: ItemId, quantity: i64) -> DomainResult<StockSnapshot> {
        (**self).reserve(item_id, quantity)
    }

    fn commit_reservation(&self, item_id: ItemId, quantity: i64) -> DomainResult<StockSnapshot> {
        (**self).commit_reservation(item_id, quantity)
    }

    fn release_reservation(&self, item_id: ItemId, quantity: i64) -> DomainResult<StockSnapshot> {
        (**self).release_reservation(item_id, quantity)
    }

    fn restock(&self, item_id: ItemId, quantity: i64) -> DomainResult<StockSnapshot> {
        (**self).restock(item_id, quantity)
    }

    fn health(&self, item_id: ItemId) -> DomainResult<StockSnapshot> {
        (**self).health(item_id)
    }
}

/// In-memory ledger for tests/dev.
///
/// Linearizability comes from taking the map's write lock for the whole
/// read-modify-write; losers of the race re-read the updated counters and
/// fail with `InsufficientStock` when stock is genuinely gone.
#[derive(Debug)]
pub struct InMemoryInventoryLedger<S> {
    items: RwLock<HashMap<ItemId, InventoryItem>>,
    monitor: AlertMonitor<S>,
}

impl<S> InMemoryInventoryLedger<S>
where
    S: AlertStore,
{
    pub fn new(alert_store: S) -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            monitor: AlertMonitor::new(alert_store),
        }
    }

    pub fn monitor(&self) -> &AlertMonitor<S> {
        &self.monitor
    }

    fn mutate(
        &self,
        item_id: ItemId,
        operation: &'static str,
        f: impl FnOnce(StockLevels) -> DomainResult<StockLevels>,
    ) -> DomainResult<StockSnapshot> {
        let updated = {
            let mut items = self
                .items
                .write()
                .map_err(|_| DomainError::invariant("inventory ledger lock poisoned"))?;
            let item = items.get(&item_id).ok_or(DomainError::NotFound)?;
            let levels = f(item.levels())?;
            let updated = item.clone().with_levels(levels);
            items.insert(item_id, updated.clone());

            // Evaluated inside the same write section: a later mutation cannot
            // reorder raise/resolve, so alert state always tracks the counters
            // as they were committed. Best-effort: a neutral evaluation never
            // rolls the mutation back.
            self.monitor.evaluate(&updated, Utc::now());
            updated
        };

        tracing::debug!(
            item_id = %item_id,
            operation,
            on_hand = updated.levels().on_hand(),
            reserved = updated.levels().reserved(),
            "ledger mutation applied"
        );

        Ok(StockSnapshot {
            levels: updated.levels(),
            health: updated.health(),
        })
    }
}

impl<S> InventoryLedger for InMemoryInventoryLedger<S>
where
    S: AlertStore,
{
    fn item(&self, item_id: ItemId) -> DomainResult<InventoryItem> {
        let items = self
            .items
            .read()
            .map_err(|_| DomainError::invariant("inventory ledger lock poisoned"))?;
        items.get(&item_id).cloned().ok_or(DomainError::NotFound)
    }

    fn upsert_item(&self, item: InventoryItem) {
        if let Ok(mut items) = self.items.write() {
            items.insert(item.id_typed(), item);
        }
    }

    fn reserve(&self, item_id: ItemId, quantity: i64) -> DomainResult<StockSnapshot> {
        self.mutate(item_id, "reserve", |levels| levels.reserve(quantity))
    }

    fn commit_reservation(&self, item_id: ItemId, quantity: i64) -> DomainResult<StockSnapshot> {
        self.mutate(item_id, "commit_reservation", |levels| {
            levels.commit(quantity)
        })
    }

    fn release_reservation(&self, item_id: ItemId, quantity: i64) -> DomainResult<StockSnapshot> {
        self.mutate(item_id, "release_reservation", |levels| {
            levels.release(quantity)
        })
    }

    fn restock(&self, item_id: ItemId, quantity: i64) -> DomainResult<StockSnapshot> {
        self.mutate(item_id, "restock", |levels| levels.restock(quantity))
    }

    fn health(&self, item_id: ItemId) -> DomainResult<StockSnapshot> {
        let item = self.item(item_id)?;
        Ok(StockSnapshot {
            levels: item.levels(),
            health: item.health(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use toolhire_alerts::{AlertKind, InMemoryAlertStore};
    use toolhire_core::{AggregateId, CompanyId, Currency, Money};

    fn gbp(amount: i64) -> Money {
        Money::new(amount, Currency::new("GBP").unwrap()).unwrap()
    }

    fn seeded_ledger(
        on_hand: i64,
        safety_stock: i64,
    ) -> (Arc<InMemoryInventoryLedger<Arc<InMemoryAlertStore>>>, ItemId) {
        let ledger = Arc::new(InMemoryInventoryLedger::new(Arc::new(
            InMemoryAlertStore::new(),
        )));
        let item_id = ItemId::new(AggregateId::new());
        let item = InventoryItem::new(
            item_id,
            CompanyId::new(),
            "Plate compactor",
            StockLevels::new(on_hand, 0).unwrap(),
            safety_stock,
            gbp(3_000),
            gbp(12_000),
            false,
        )
        .unwrap();
        ledger.upsert_item(item);
        (ledger, item_id)
    }

    #[test]
    fn mutations_return_post_mutation_counters() {
        let (ledger, item_id) = seeded_ledger(5, 1);

        let snapshot = ledger.reserve(item_id, 3).unwrap();
        assert_eq!(snapshot.levels.reserved(), 3);
        assert_eq!(snapshot.health, StockHealth::Healthy);

        let snapshot = ledger.reserve(item_id, 2).unwrap();
        assert_eq!(snapshot.levels.available(), 0);
        assert_eq!(snapshot.health, StockHealth::OutOfStock);
    }

    #[test]
    fn failed_mutation_is_all_or_nothing() {
        let (ledger, item_id) = seeded_ledger(2, 0);

        let err = ledger.reserve(item_id, 3).unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
        assert_eq!(ledger.health(item_id).unwrap().levels.reserved(), 0);
    }

    /// Alert state must track the counters as committed, even when mutations
    /// interleave across threads: after the dust settles, a healthy item
    /// carries no active alert and an unhealthy one carries exactly one.
    #[test]
    fn alert_state_stays_consistent_under_interleaved_mutations() {
        for _ in 0..50 {
            let (ledger, item_id) = seeded_ledger(2, 1);

            let workers: Vec<_> = (0..2)
                .map(|_| {
                    let ledger = Arc::clone(&ledger);
                    thread::spawn(move || {
                        for _ in 0..50 {
                            ledger.reserve(item_id, 1).unwrap();
                            ledger.release_reservation(item_id, 1).unwrap();
                        }
                    })
                })
                .collect();
            for worker in workers {
                worker.join().unwrap();
            }

            // All reservations were given back: available 2 > safety 1.
            let snapshot = ledger.health(item_id).unwrap();
            assert_eq!(snapshot.health, StockHealth::Healthy);
            assert!(
                ledger
                    .monitor()
                    .store()
                    .active(item_id, AlertKind::LowStock)
                    .is_none(),
                "healthy item must not keep an active low stock alert"
            );
        }
    }
}
