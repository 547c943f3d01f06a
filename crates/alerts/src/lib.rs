//! `toolhire-alerts` — low-stock alerting derived from ledger health.

pub mod alert;
pub mod monitor;
pub mod store;

pub use alert::{AlertId, AlertKind, AlertStatus, InventoryAlert};
pub use monitor::{AlertChange, AlertMonitor};
pub use store::{AlertStore, InMemoryAlertStore};
