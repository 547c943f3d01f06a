//! Alert evaluation against current ledger health.

use chrono::{DateTime, Utc};

use toolhire_inventory::{InventoryItem, StockHealth};

use crate::alert::{AlertKind, InventoryAlert};
use crate::store::AlertStore;

/// What an evaluation did, if anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertChange {
    Raised(InventoryAlert),
    Resolved(InventoryAlert),
}

/// Keeps alert rows consistent with current stock health.
///
/// Invoked after every ledger mutation for the touched item. Evaluation is
/// idempotent: with unchanged health it neither duplicates an active alert
/// nor re-resolves a resolved one.
#[derive(Debug)]
pub struct AlertMonitor<S> {
    store: S,
}

impl<S> AlertMonitor<S>
where
    S: AlertStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Re-evaluate one item's health and raise/resolve accordingly.
    pub fn evaluate(&self, item: &InventoryItem, now: DateTime<Utc>) -> Option<AlertChange> {
        let health = item.health();
        let item_id = item.id_typed();
        let active = self.store.active(item_id, AlertKind::LowStock);

        match (health, active) {
            (StockHealth::LowStock | StockHealth::OutOfStock, None) => {
                let alert =
                    InventoryAlert::raise(item_id, item.company_id(), AlertKind::LowStock, now);
                self.store.insert(alert.clone());
                tracing::info!(
                    item_id = %item_id,
                    available = item.levels().available(),
                    safety_stock = item.safety_stock(),
                    "low stock alert raised"
                );
                Some(AlertChange::Raised(alert))
            }
            (StockHealth::Healthy, Some(_)) => {
                let resolved = self.store.resolve_active(item_id, AlertKind::LowStock, now)?;
                tracing::info!(
                    item_id = %item_id,
                    available = item.levels().available(),
                    "low stock alert resolved"
                );
                Some(AlertChange::Resolved(resolved))
            }
            // Unchanged health is a no-op.
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertStatus;
    use crate::store::InMemoryAlertStore;
    use std::sync::Arc;
    use toolhire_core::{AggregateId, CompanyId, Currency, Money};
    use toolhire_inventory::{ItemId, StockLevels};

    fn gbp(amount: i64) -> Money {
        Money::new(amount, Currency::new("GBP").unwrap()).unwrap()
    }

    fn item(on_hand: i64, reserved: i64, safety_stock: i64) -> InventoryItem {
        InventoryItem::new(
            ItemId::new(AggregateId::new()),
            CompanyId::new(),
            "Tile cutter",
            StockLevels::new(on_hand, reserved).unwrap(),
            safety_stock,
            gbp(1_800),
            gbp(9_000),
            false,
        )
        .unwrap()
    }

    fn monitor() -> AlertMonitor<Arc<InMemoryAlertStore>> {
        AlertMonitor::new(Arc::new(InMemoryAlertStore::new()))
    }

    #[test]
    fn raises_once_when_stock_drops_below_safety() {
        let monitor = monitor();
        let low = item(5, 4, 1);

        let change = monitor.evaluate(&low, chrono::Utc::now());
        assert!(matches!(change, Some(AlertChange::Raised(_))));

        // Re-evaluating with unchanged health is a no-op (deduplication).
        assert_eq!(monitor.evaluate(&low, chrono::Utc::now()), None);

        let rows = monitor.store().list_for_company(low.company_id());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, AlertStatus::Active);
    }

    #[test]
    fn out_of_stock_raises_the_same_low_stock_alert_kind() {
        let monitor = monitor();
        let out = item(2, 2, 1);

        match monitor.evaluate(&out, chrono::Utc::now()) {
            Some(AlertChange::Raised(alert)) => assert_eq!(alert.kind, AlertKind::LowStock),
            other => panic!("expected raise, got {other:?}"),
        }
    }

    #[test]
    fn resolves_when_health_recovers_and_only_once() {
        let monitor = monitor();
        let low = item(5, 5, 1);
        monitor.evaluate(&low, chrono::Utc::now()).unwrap();

        let recovered = low.clone().with_levels(StockLevels::new(5, 0).unwrap());
        let change = monitor.evaluate(&recovered, chrono::Utc::now());
        assert!(matches!(change, Some(AlertChange::Resolved(_))));

        // Second healthy evaluation must not touch the resolved row.
        assert_eq!(monitor.evaluate(&recovered, chrono::Utc::now()), None);

        let rows = monitor.store().list_for_company(low.company_id());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, AlertStatus::Resolved);
        assert!(rows[0].resolved_at.is_some());
    }

    #[test]
    fn available_equal_to_safety_stock_keeps_the_alert_active() {
        let monitor = monitor();
        // available 0 with safety 1 → raise.
        let out = item(1, 1, 1);
        monitor.evaluate(&out, chrono::Utc::now()).unwrap();

        // Restocked to available 1 == safety 1: still low, alert stays.
        let still_low = out.clone().with_levels(StockLevels::new(1, 0).unwrap());
        assert_eq!(monitor.evaluate(&still_low, chrono::Utc::now()), None);
        assert!(
            monitor
                .store()
                .active(out.id_typed(), AlertKind::LowStock)
                .is_some()
        );
    }

    #[test]
    fn healthy_item_with_no_alert_is_untouched() {
        let monitor = monitor();
        let healthy = item(5, 0, 1);
        assert_eq!(monitor.evaluate(&healthy, chrono::Utc::now()), None);
        assert!(
            monitor
                .store()
                .list_for_company(healthy.company_id())
                .is_empty()
        );
    }
}
