//! Alert row storage abstraction + in-memory implementation.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use toolhire_core::CompanyId;
use toolhire_inventory::ItemId;

use crate::alert::{AlertKind, AlertStatus, InventoryAlert};

/// Storage for alert rows.
///
/// The monitor is the only writer; dashboards read through `list_for_company`.
pub trait AlertStore: Send + Sync {
    /// The currently active alert for this item/kind, if any.
    fn active(&self, item_id: ItemId, kind: AlertKind) -> Option<InventoryAlert>;

    /// Persist a freshly raised alert.
    fn insert(&self, alert: InventoryAlert);

    /// Resolve the active alert for this item/kind; returns the resolved row,
    /// or `None` when nothing was active (idempotent).
    fn resolve_active(
        &self,
        item_id: ItemId,
        kind: AlertKind,
        resolved_at: DateTime<Utc>,
    ) -> Option<InventoryAlert>;

    /// All alert rows (active and resolved) for one provider company.
    fn list_for_company(&self, company_id: CompanyId) -> Vec<InventoryAlert>;
}

impl<S> AlertStore for Arc<S>
where
    S: AlertStore + ?Sized,
{
    fn active(&self, item_id: ItemId, kind: AlertKind) -> Option<InventoryAlert> {
        (**self).active(item_id, kind)
    }

    fn insert(&self, alert: InventoryAlert) {
        (**self).insert(alert)
    }

    fn resolve_active(
        &self,
        item_id: ItemId,
        kind: AlertKind,
        resolved_at: DateTime<Utc>,
    ) -> Option<InventoryAlert> {
        (**self).resolve_active(item_id, kind, resolved_at)
    }

    fn list_for_company(&self, company_id: CompanyId) -> Vec<InventoryAlert> {
        (**self).list_for_company(company_id)
    }
}

/// In-memory alert store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAlertStore {
    rows: RwLock<Vec<InventoryAlert>>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AlertStore for InMemoryAlertStore {
    fn active(&self, item_id: ItemId, kind: AlertKind) -> Option<InventoryAlert> {
        let rows = self.rows.read().ok()?;
        rows.iter()
            .find(|a| a.item_id == item_id && a.kind == kind && a.is_active())
            .cloned()
    }

    fn insert(&self, alert: InventoryAlert) {
        if let Ok(mut rows) = self.rows.write() {
            rows.push(alert);
        }
    }

    fn resolve_active(
        &self,
        item_id: ItemId,
        kind: AlertKind,
        resolved_at: DateTime<Utc>,
    ) -> Option<InventoryAlert> {
        let mut rows = self.rows.write().ok()?;
        let row = rows
            .iter_mut()
            .find(|a| a.item_id == item_id && a.kind == kind && a.is_active())?;
        row.status = AlertStatus::Resolved;
        row.resolved_at = Some(resolved_at);
        Some(row.clone())
    }

    fn list_for_company(&self, company_id: CompanyId) -> Vec<InventoryAlert> {
        let rows = match self.rows.read() {
            Ok(r) => r,
            Err(_) => return vec![],
        };
        rows.iter()
            .filter(|a| a.company_id == company_id)
            .cloned()
            .collect()
    }
}
