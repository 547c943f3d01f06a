use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use toolhire_core::{AggregateId, CompanyId};
use toolhire_inventory::ItemId;

/// Alert identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub AggregateId);

impl AlertId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for AlertId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowStock,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::LowStock => "low_stock",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Resolved,
}

/// One alert row consumed by downstream dashboards.
///
/// At most one `Active` alert may exist per `(item_id, kind)` pair; the
/// monitor deduplicates on re-evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAlert {
    pub id: AlertId,
    pub item_id: ItemId,
    pub company_id: CompanyId,
    pub kind: AlertKind,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl InventoryAlert {
    pub fn raise(
        item_id: ItemId,
        company_id: CompanyId,
        kind: AlertKind,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AlertId::new(AggregateId::new()),
            item_id,
            company_id,
            kind,
            status: AlertStatus::Active,
            created_at,
            resolved_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }
}
