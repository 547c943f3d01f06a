use serde::{Deserialize, Serialize};

use toolhire_core::{AggregateId, CompanyId, DomainError, DomainResult, Entity, Money};

use crate::stock::{StockHealth, StockLevels};

/// Inventory item identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub AggregateId);

impl ItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// A reservable catalog item owned by a provider company.
///
/// Created by provider catalog management (an external collaborator); the
/// counters are mutated exclusively through the inventory ledger. The item is
/// never deleted while open rentals reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    id: ItemId,
    company_id: CompanyId,
    name: String,
    levels: StockLevels,
    safety_stock: i64,
    rental_rate: Money,
    deposit: Money,
    insurance_required: bool,
}

impl InventoryItem {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ItemId,
        company_id: CompanyId,
        name: impl Into<String>,
        levels: StockLevels,
        safety_stock: i64,
        rental_rate: Money,
        deposit: Money,
        insurance_required: bool,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        if safety_stock < 0 {
            return Err(DomainError::validation(format!(
                "safety stock cannot be negative, got {safety_stock}"
            )));
        }
        Ok(Self {
            id,
            company_id,
            name,
            levels,
            safety_stock,
            rental_rate,
            deposit,
            insurance_required,
        })
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn levels(&self) -> StockLevels {
        self.levels
    }

    pub fn safety_stock(&self) -> i64 {
        self.safety_stock
    }

    /// Daily rate charged while the rental is in use.
    pub fn rental_rate(&self) -> &Money {
        &self.rental_rate
    }

    /// Deposit held at request time and reconciled at inspection.
    pub fn deposit(&self) -> &Money {
        &self.deposit
    }

    pub fn insurance_required(&self) -> bool {
        self.insurance_required
    }

    pub fn health(&self) -> StockHealth {
        self.levels.health(self.safety_stock)
    }

    /// Replace the counters with the result of a ledger operation.
    pub fn with_levels(mut self, levels: StockLevels) -> Self {
        self.levels = levels;
        self
    }
}

impl Entity for InventoryItem {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
