//! `toolhire-rentals` — the rental agreement lifecycle.
//!
//! One aggregate drives each rental through the strict state machine
//! request → approval → pickup → in-use → return → inspection → settlement,
//! recording an append-only timeline of checkpoints as it goes. Decision
//! logic is pure; the service layer executes the ledger effects the
//! committed events imply.

pub mod agreement;
pub mod timeline;

pub use agreement::{
    AddNote, ApproveRental, CancelRental, CheckoutRental, InspectRental, LedgerEffect,
    RentalAgreement, RentalCommand, RentalEvent, RentalId, RentalMeta, RentalStatus,
    RequestRental, ReturnRental, SchedulePickup,
};
pub use timeline::{CheckpointKind, CheckpointPayload, TimelineCheckpoint};
