//! `toolhire-settlement` — deposit settlement arithmetic.
//!
//! Pure reconciliation of a held deposit against inspection-time damage
//! charges. No IO, no state: `settle` is deterministic and auditable.

pub mod settle;

pub use settle::{Charge, DepositStatus, InspectionOutcome, SettlementSummary, settle};
