//! Infrastructure + the rental service façade.
//!
//! This crate composes the pure domain crates into the one entry point
//! external callers use: ledger and rental stores, identity lookup, alert
//! wiring, analytics emission, and the `RentalService` orchestration.

pub mod directory;
pub mod ledger;
pub mod rental_service;
pub mod rental_store;


pub use directory::{Directory, InMemoryDirectory, UserProfile};
pub use ledger::{InMemoryInventoryLedger, InventoryLedger, StockSnapshot};
pub use rental_service::RentalService;
pub use rental_store::{InMemoryRentalStore, RentalStore};
