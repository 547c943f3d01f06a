//! Rental lifecycle orchestration.
//!
//! `RentalService` is the single entry point external callers use. Every
//! operation follows the same shape: serialize on the rental, load, let the
//! aggregate decide, execute the ledger effect the decision demands, persist,
//! then emit analytics. Ledger and rental record are the source of truth;
//! alert evaluation and analytics are best-effort side channels.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde_json::json;

use toolhire_core::{
    Actor, Aggregate, AggregateId, AggregateRoot, DomainResult, ExpectedVersion, UserId,
};
use toolhire_events::{AnalyticsEvent, EventBus};
use toolhire_inventory::ItemId;
use toolhire_rentals::{
    AddNote, ApproveRental, CancelRental, CheckoutRental, InspectRental, LedgerEffect,
    RentalAgreement, RentalCommand, RentalEvent, RentalId, RentalStatus, RequestRental,
    ReturnRental, SchedulePickup,
};
use toolhire_settlement::{Charge, InspectionOutcome};

use crate::directory::Directory;
use crate::ledger::InventoryLedger;
use crate::rental_store::RentalStore;

/// Service façade over ledger, rental store, directory and analytics bus.
pub struct RentalService<L, R, D, B> {
    ledger: L,
    rentals: R,
    directory: D,
    analytics: B,
    // Per-rental serialization; entries are created on first touch and kept
    // for the rental's lifetime.
    locks: Mutex<HashMap<RentalId, Arc<Mutex<()>>>>,
}

impl<L, R, D, B> RentalService<L, R, D, B>
where
    L: InventoryLedger,
    R: RentalStore,
    D: Directory,
    B: EventBus<AnalyticsEvent>,
{
    pub fn new(ledger: L, rentals: R, directory: D, analytics: B) -> Self {
        Self {
            ledger,
            rentals,
            directory,
            analytics,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Create a new rental request, reserving stock atomically.
    ///
    /// Rate and deposit are captured from the item at request time so later
    /// catalog edits cannot reprice an open agreement.
    #[allow(clippy::too_many_arguments)]
    pub fn request(
        &self,
        item_id: ItemId,
        renter_id: UserId,
        quantity: i64,
        rental_start: DateTime<Utc>,
        rental_end: DateTime<Utc>,
        actor: Actor,
        notes: Option<String>,
    ) -> DomainResult<RentalAgreement> {
        self.directory.user(renter_id)?;
        self.directory.user(actor.user_id)?;
        let item = self.ledger.item(item_id)?;

        let rental_id = RentalId::new(AggregateId::new());
        let command = RentalCommand::Request(RequestRental {
            rental_id,
            item_id,
            renter_id,
            quantity,
            daily_rate: item.rental_rate().clone(),
            deposit: item.deposit().clone(),
            rental_start,
            rental_end,
            notes,
            actor,
            occurred_at: Utc::now(),
        });

        let mut rental = RentalAgreement::empty(rental_id);
        let events = rental.handle(&command)?;

        // Reserve before persisting: a failed reservation must leave no record.
        let effects: Vec<LedgerEffect> = events
            .iter()
            .filter_map(|event| rental.ledger_effect(event))
            .collect();
        let applied = self.apply_effects(&effects)?;

        for event in &events {
            rental.apply(event);
        }
        if let Err(err) = self.rentals.save(&rental, ExpectedVersion::Exact(0)) {
            self.compensate(&applied);
            return Err(err);
        }

        for event in &events {
            self.emit_for_event(&rental, None, event);
        }
        Ok(rental)
    }

    pub fn approve(
        &self,
        rental_id: RentalId,
        actor: Actor,
        notes: Option<String>,
    ) -> DomainResult<RentalAgreement> {
        self.execute(
            rental_id,
            RentalCommand::Approve(ApproveRental {
                rental_id,
                notes,
                actor,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn cancel(
        &self,
        rental_id: RentalId,
        actor: Actor,
        reason: Option<String>,
    ) -> DomainResult<RentalAgreement> {
        self.execute(
            rental_id,
            RentalCommand::Cancel(CancelRental {
                rental_id,
                reason,
                actor,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn schedule_pickup(
        &self,
        rental_id: RentalId,
        pickup_at: DateTime<Utc>,
        return_due_at: DateTime<Utc>,
        actor: Actor,
        logistics_notes: Option<String>,
    ) -> DomainResult<RentalAgreement> {
        self.execute(
            rental_id,
            RentalCommand::SchedulePickup(SchedulePickup {
                rental_id,
                pickup_at,
                return_due_at,
                logistics_notes,
                actor,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn checkout(
        &self,
        rental_id: RentalId,
        rental_start_at: Option<DateTime<Utc>>,
        condition_out: Option<String>,
        handover_notes: Option<String>,
        actor: Actor,
    ) -> DomainResult<RentalAgreement> {
        self.execute(
            rental_id,
            RentalCommand::Checkout(CheckoutRental {
                rental_id,
                rental_start_at,
                condition_out,
                handover_notes,
                actor,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn return_item(
        &self,
        rental_id: RentalId,
        returned_at: Option<DateTime<Utc>>,
        condition_in: Option<String>,
        notes: Option<String>,
        actor: Actor,
    ) -> DomainResult<RentalAgreement> {
        self.execute(
            rental_id,
            RentalCommand::Return(ReturnRental {
                rental_id,
                returned_at,
                condition_in,
                notes,
                actor,
                occurred_at: Utc::now(),
            }),
        )
    }

    /// Terminal step: settle the deposit and restock the returned units.
    pub fn inspect(
        &self,
        rental_id: RentalId,
        outcome: InspectionOutcome,
        charges: Vec<Charge>,
        notes: Option<String>,
        actor: Actor,
    ) -> DomainResult<RentalAgreement> {
        self.execute(
            rental_id,
            RentalCommand::Inspect(InspectRental {
                rental_id,
                outcome,
                charges,
                notes,
                actor,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn add_note(
        &self,
        rental_id: RentalId,
        text: impl Into<String>,
        actor: Actor,
    ) -> DomainResult<RentalAgreement> {
        self.execute(
            rental_id,
            RentalCommand::AddNote(AddNote {
                rental_id,
                text: text.into(),
                actor,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn get_by_id(&self, rental_id: RentalId) -> DomainResult<RentalAgreement> {
        self.rentals.load(rental_id)
    }

    /// Shared transition pipeline: lock, load, decide, effect, apply, save.
    fn execute(
        &self,
        rental_id: RentalId,
        command: RentalCommand,
    ) -> DomainResult<RentalAgreement> {
        let lock = self.rental_lock(rental_id);
        let _held = lock_or_recover(&lock);

        let mut rental = match self.rentals.load(rental_id) {
            Ok(rental) => rental,
            Err(err) => {
                self.discard_lock(rental_id);
                return Err(err);
            }
        };
        let expected = ExpectedVersion::Exact(rental.version());
        let before = rental.status();

        let events = match rental.handle(&command) {
            Ok(events) => events,
            Err(err) => {
                if rental.is_terminal() {
                    self.discard_lock(rental_id);
                }
                return Err(err);
            }
        };

        // Ledger effects resolve against pre-apply state.
        let effects: Vec<LedgerEffect> = events
            .iter()
            .filter_map(|event| rental.ledger_effect(event))
            .collect();
        let applied = self.apply_effects(&effects)?;

        for event in &events {
            rental.apply(event);
        }
        if let Err(err) = self.rentals.save(&rental, expected) {
            self.compensate(&applied);
            return Err(err);
        }

        // Terminal rentals take no further transitions; drop the lock entry
        // so the map does not grow with the rental count.
        if rental.is_terminal() {
            self.discard_lock(rental_id);
        }

        for event in &events {
            self.emit_for_event(&rental, Some(before), event);
        }
        Ok(rental)
    }

    fn rental_lock(&self, rental_id: RentalId) -> Arc<Mutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.entry(rental_id).or_default().clone()
    }

    fn discard_lock(&self, rental_id: RentalId) {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks.remove(&rental_id);
    }

    #[cfg(test)]
    pub(crate) fn tracked_rental_locks(&self) -> usize {
        match self.locks.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Execute effects in order; on failure undo the ones already applied.
    fn apply_effects(&self, effects: &[LedgerEffect]) -> DomainResult<Vec<LedgerEffect>> {
        let mut applied = Vec::with_capacity(effects.len());
        for effect in effects {
            if let Err(err) = self.apply_effect(effect) {
                self.compensate(&applied);
                return Err(err);
            }
            applied.push(*effect);
        }
        Ok(applied)
    }

    fn apply_effect(&self, effect: &LedgerEffect) -> DomainResult<()> {
        match *effect {
            LedgerEffect::Reserve { item_id, quantity } => {
                self.ledger.reserve(item_id, quantity)?;
            }
            LedgerEffect::Release { item_id, quantity } => {
                self.ledger.release_reservation(item_id, quantity)?;
            }
            LedgerEffect::Commit { item_id, quantity } => {
                self.ledger.commit_reservation(item_id, quantity)?;
            }
            LedgerEffect::Restock { item_id, quantity } => {
                self.ledger.restock(item_id, quantity)?;
            }
        }
        Ok(())
    }

    fn compensate(&self, applied: &[LedgerEffect]) {
        for effect in applied.iter().rev() {
            let undo = match *effect {
                LedgerEffect::Reserve { item_id, quantity } => self
                    .ledger
                    .release_reservation(item_id, quantity)
                    .map(|_| ()),
                LedgerEffect::Release { item_id, quantity } => {
                    self.ledger.reserve(item_id, quantity).map(|_| ())
                }
                // Committed/restocked units cannot be walked back; with the
                // per-rental lock held this branch is unreachable in practice.
                LedgerEffect::Commit { item_id, quantity }
                | LedgerEffect::Restock { item_id, quantity } => {
                    tracing::error!(
                        item_id = %item_id,
                        quantity,
                        "non-reversible ledger effect left applied after failed save"
                    );
                    Ok(())
                }
            };
            if let Err(err) = undo {
                tracing::error!(error = %err, "ledger compensation failed");
            }
        }
    }

    fn emit_for_event(
        &self,
        rental: &RentalAgreement,
        before: Option<RentalStatus>,
        event: &RentalEvent,
    ) {
        match event {
            RentalEvent::Requested(e) => {
                self.emit(
                    "rental.requested",
                    json!({
                        "rental_id": e.rental_id,
                        "item_id": e.item_id,
                        "renter_id": e.renter_id,
                        "quantity": e.quantity,
                        "actor_role": e.actor.role.as_str(),
                    }),
                    e.occurred_at,
                );
            }
            RentalEvent::NoteAdded(_) => {}
            RentalEvent::Inspected(e) => {
                self.emit_transition(rental, before, e.actor, e.occurred_at);
                self.emit(
                    "rental.inspection.completed",
                    json!({
                        "rental_id": e.rental_id,
                        "outcome": e.summary.outcome.as_str(),
                        "total_charges": e.summary.total_charges.amount(),
                        "release_amount": e.summary.release_amount.amount(),
                        "additional_amount_owed": e
                            .summary
                            .additional_amount_owed
                            .as_ref()
                            .map(|m| m.amount()),
                    }),
                    e.occurred_at,
                );
            }
            RentalEvent::Approved(e) => {
                self.emit_transition(rental, before, e.actor, e.occurred_at)
            }
            RentalEvent::Cancelled(e) => {
                self.emit_transition(rental, before, e.actor, e.occurred_at)
            }
            RentalEvent::PickupScheduled(e) => {
                self.emit_transition(rental, before, e.actor, e.occurred_at)
            }
            RentalEvent::CheckedOut(e) => {
                self.emit_transition(rental, before, e.actor, e.occurred_at)
            }
            RentalEvent::Returned(e) => {
                self.emit_transition(rental, before, e.actor, e.occurred_at)
            }
        }
    }

    fn emit_transition(
        &self,
        rental: &RentalAgreement,
        before: Option<RentalStatus>,
        actor: Actor,
        occurred_at: DateTime<Utc>,
    ) {
        self.emit(
            "rental.status_transition",
            json!({
                "rental_id": rental.id_typed(),
                "from": before.map(|s| s.as_str()),
                "to": rental.status().as_str(),
                "actor_role": actor.role.as_str(),
            }),
            occurred_at,
        );
    }

    // Fire-and-forget: a dropped emission is logged, never propagated.
    fn emit(&self, name: &str, metadata: serde_json::Value, occurred_at: DateTime<Utc>) {
        let event = AnalyticsEvent::new(name, metadata, occurred_at);
        if let Err(err) = self.analytics.publish(event) {
            tracing::warn!(event = name, error = ?err, "analytics emission dropped");
        }
    }
}

fn lock_or_recover(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
