//! `toolhire-inventory` — reservable stock: items, counters, health.

pub mod item;
pub mod stock;

pub use item::{InventoryItem, ItemId};
pub use stock::{StockHealth, StockLevels};
