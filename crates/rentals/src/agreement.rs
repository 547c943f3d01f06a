use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use toolhire_core::{
    Actor, Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult, Money, UserId,
};
use toolhire_events::Event;
use toolhire_inventory::ItemId;
use toolhire_settlement::{Charge, DepositStatus, InspectionOutcome, SettlementSummary, settle};

use crate::timeline::{CheckpointPayload, TimelineCheckpoint};

/// Rental agreement identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RentalId(pub AggregateId);

impl RentalId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RentalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Rental lifecycle status.
///
/// Transitions only along the fixed graph; `Settled` and `Cancelled` are
/// terminal and freeze the agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalStatus {
    Requested,
    Approved,
    PickupScheduled,
    InUse,
    InspectionPending,
    Settled,
    Cancelled,
}

impl RentalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RentalStatus::Requested => "requested",
            RentalStatus::Approved => "approved",
            RentalStatus::PickupScheduled => "pickup_scheduled",
            RentalStatus::InUse => "in_use",
            RentalStatus::InspectionPending => "inspection_pending",
            RentalStatus::Settled => "settled",
            RentalStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RentalStatus::Settled | RentalStatus::Cancelled)
    }
}

impl core::fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed free-form metadata collected across the lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalMeta {
    pub request_notes: Option<String>,
    pub approval_notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub logistics_notes: Option<String>,
    pub condition_out: Option<String>,
    pub handover_notes: Option<String>,
    pub condition_in: Option<String>,
    pub return_notes: Option<String>,
    pub inspection_notes: Option<String>,
    /// Charge summary computed at inspection.
    pub settlement: Option<SettlementSummary>,
}

/// The stock mutation a committed rental event requires from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEffect {
    Reserve { item_id: ItemId, quantity: i64 },
    Release { item_id: ItemId, quantity: i64 },
    Commit { item_id: ItemId, quantity: i64 },
    Restock { item_id: ItemId, quantity: i64 },
}

/// Aggregate root: RentalAgreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalAgreement {
    id: RentalId,
    item_id: Option<ItemId>,
    renter_id: Option<UserId>,
    quantity: i64,
    daily_rate: Option<Money>,
    deposit: Option<Money>,
    deposit_status: DepositStatus,
    rental_start: Option<DateTime<Utc>>,
    rental_end: Option<DateTime<Utc>>,
    pickup_at: Option<DateTime<Utc>>,
    return_due_at: Option<DateTime<Utc>>,
    returned_at: Option<DateTime<Utc>>,
    status: RentalStatus,
    meta: RentalMeta,
    timeline: Vec<TimelineCheckpoint>,
    version: u64,
    created: bool,
}

impl RentalAgreement {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: RentalId) -> Self {
        Self {
            id,
            item_id: None,
            renter_id: None,
            quantity: 0,
            daily_rate: None,
            deposit: None,
            deposit_status: DepositStatus::Held,
            rental_start: None,
            rental_end: None,
            pickup_at: None,
            return_due_at: None,
            returned_at: None,
            status: RentalStatus::Requested,
            meta: RentalMeta::default(),
            timeline: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> RentalId {
        self.id
    }

    pub fn item_id(&self) -> Option<ItemId> {
        self.item_id
    }

    pub fn renter_id(&self) -> Option<UserId> {
        self.renter_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn daily_rate(&self) -> Option<&Money> {
        self.daily_rate.as_ref()
    }

    pub fn deposit(&self) -> Option<&Money> {
        self.deposit.as_ref()
    }

    pub fn deposit_status(&self) -> DepositStatus {
        self.deposit_status
    }

    pub fn rental_start(&self) -> Option<DateTime<Utc>> {
        self.rental_start
    }

    pub fn rental_end(&self) -> Option<DateTime<Utc>> {
        self.rental_end
    }

    pub fn pickup_at(&self) -> Option<DateTime<Utc>> {
        self.pickup_at
    }

    pub fn return_due_at(&self) -> Option<DateTime<Utc>> {
        self.return_due_at
    }

    pub fn returned_at(&self) -> Option<DateTime<Utc>> {
        self.returned_at
    }

    pub fn status(&self) -> RentalStatus {
        self.status
    }

    pub fn meta(&self) -> &RentalMeta {
        &self.meta
    }

    pub fn timeline(&self) -> &[TimelineCheckpoint] {
        &self.timeline
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Command: RequestRental.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRental {
    pub rental_id: RentalId,
    pub item_id: ItemId,
    pub renter_id: UserId,
    pub quantity: i64,
    pub daily_rate: Money,
    pub deposit: Money,
    pub rental_start: DateTime<Utc>,
    pub rental_end: DateTime<Utc>,
    pub notes: Option<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveRental.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveRental {
    pub rental_id: RentalId,
    pub notes: Option<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelRental.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRental {
    pub rental_id: RentalId,
    pub reason: Option<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SchedulePickup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulePickup {
    pub rental_id: RentalId,
    pub pickup_at: DateTime<Utc>,
    pub return_due_at: DateTime<Utc>,
    pub logistics_notes: Option<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CheckoutRental (physical handover to the renter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRental {
    pub rental_id: RentalId,
    /// Actual start; defaults to the operation time when absent.
    pub rental_start_at: Option<DateTime<Utc>>,
    pub condition_out: Option<String>,
    pub handover_notes: Option<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReturnRental (physical handover back to the provider).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRental {
    pub rental_id: RentalId,
    /// Defaults to the operation time when absent.
    pub returned_at: Option<DateTime<Utc>>,
    pub condition_in: Option<String>,
    pub notes: Option<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: InspectRental (terminal settlement step).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectRental {
    pub rental_id: RentalId,
    pub outcome: InspectionOutcome,
    pub charges: Vec<Charge>,
    pub notes: Option<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddNote (ad-hoc timeline entry, no status change).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddNote {
    pub rental_id: RentalId,
    pub text: String,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RentalCommand {
    Request(RequestRental),
    Approve(ApproveRental),
    Cancel(CancelRental),
    SchedulePickup(SchedulePickup),
    Checkout(CheckoutRental),
    Return(ReturnRental),
    Inspect(InspectRental),
    AddNote(AddNote),
}

/// Event: RentalRequested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalRequested {
    pub rental_id: RentalId,
    pub item_id: ItemId,
    pub renter_id: UserId,
    pub quantity: i64,
    pub daily_rate: Money,
    pub deposit: Money,
    pub rental_start: DateTime<Utc>,
    pub rental_end: DateTime<Utc>,
    pub notes: Option<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RentalApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalApproved {
    pub rental_id: RentalId,
    pub notes: Option<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RentalCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalCancelled {
    pub rental_id: RentalId,
    pub reason: Option<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PickupScheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupScheduled {
    pub rental_id: RentalId,
    pub pickup_at: DateTime<Utc>,
    pub return_due_at: DateTime<Utc>,
    pub logistics_notes: Option<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RentalCheckedOut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalCheckedOut {
    pub rental_id: RentalId,
    pub rental_start_at: DateTime<Utc>,
    pub condition_out: Option<String>,
    pub notes: Option<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RentalReturned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalReturned {
    pub rental_id: RentalId,
    pub returned_at: DateTime<Utc>,
    pub condition_in: Option<String>,
    pub notes: Option<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RentalInspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalInspected {
    pub rental_id: RentalId,
    pub summary: SettlementSummary,
    pub notes: Option<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RentalNoteAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalNoteAdded {
    pub rental_id: RentalId,
    pub text: String,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RentalEvent {
    Requested(RentalRequested),
    Approved(RentalApproved),
    Cancelled(RentalCancelled),
    PickupScheduled(PickupScheduled),
    CheckedOut(RentalCheckedOut),
    Returned(RentalReturned),
    Inspected(RentalInspected),
    NoteAdded(RentalNoteAdded),
}

impl Event for RentalEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RentalEvent::Requested(_) => "rental.requested",
            RentalEvent::Approved(_) => "rental.approved",
            RentalEvent::Cancelled(_) => "rental.cancelled",
            RentalEvent::PickupScheduled(_) => "rental.pickup_scheduled",
            RentalEvent::CheckedOut(_) => "rental.checked_out",
            RentalEvent::Returned(_) => "rental.returned",
            RentalEvent::Inspected(_) => "rental.inspected",
            RentalEvent::NoteAdded(_) => "rental.note_added",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RentalEvent::Requested(e) => e.occurred_at,
            RentalEvent::Approved(e) => e.occurred_at,
            RentalEvent::Cancelled(e) => e.occurred_at,
            RentalEvent::PickupScheduled(e) => e.occurred_at,
            RentalEvent::CheckedOut(e) => e.occurred_at,
            RentalEvent::Returned(e) => e.occurred_at,
            RentalEvent::Inspected(e) => e.occurred_at,
            RentalEvent::NoteAdded(e) => e.occurred_at,
        }
    }
}

impl AggregateRoot for RentalAgreement {
    type Id = RentalId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for RentalAgreement {
    type Command = RentalCommand;
    type Event = RentalEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RentalEvent::Requested(e) => {
                self.id = e.rental_id;
                self.item_id = Some(e.item_id);
                self.renter_id = Some(e.renter_id);
                self.quantity = e.quantity;
                self.daily_rate = Some(e.daily_rate.clone());
                self.deposit = Some(e.deposit.clone());
                self.deposit_status = DepositStatus::Held;
                self.rental_start = Some(e.rental_start);
                self.rental_end = Some(e.rental_end);
                self.status = RentalStatus::Requested;
                self.meta.request_notes = e.notes.clone();
                self.created = true;

                self.record_status_change(None, RentalStatus::Requested, e.actor, e.occurred_at);
                if let Some(text) = &e.notes {
                    self.record(
                        CheckpointPayload::Note { text: text.clone() },
                        e.actor,
                        e.occurred_at,
                    );
                }
            }
            RentalEvent::Approved(e) => {
                let from = self.status;
                self.status = RentalStatus::Approved;
                self.meta.approval_notes = e.notes.clone();

                self.record_status_change(Some(from), RentalStatus::Approved, e.actor, e.occurred_at);
                if let Some(text) = &e.notes {
                    self.record(
                        CheckpointPayload::Note { text: text.clone() },
                        e.actor,
                        e.occurred_at,
                    );
                }
            }
            RentalEvent::Cancelled(e) => {
                let from = self.status;
                self.status = RentalStatus::Cancelled;
                self.meta.cancellation_reason = e.reason.clone();

                self.record_status_change(Some(from), RentalStatus::Cancelled, e.actor, e.occurred_at);
                if let Some(text) = &e.reason {
                    self.record(
                        CheckpointPayload::Note { text: text.clone() },
                        e.actor,
                        e.occurred_at,
                    );
                }
            }
            RentalEvent::PickupScheduled(e) => {
                let from = self.status;
                self.status = RentalStatus::PickupScheduled;
                self.pickup_at = Some(e.pickup_at);
                self.return_due_at = Some(e.return_due_at);
                self.meta.logistics_notes = e.logistics_notes.clone();

                self.record_status_change(
                    Some(from),
                    RentalStatus::PickupScheduled,
                    e.actor,
                    e.occurred_at,
                );
                if let Some(text) = &e.logistics_notes {
                    self.record(
                        CheckpointPayload::Note { text: text.clone() },
                        e.actor,
                        e.occurred_at,
                    );
                }
            }
            RentalEvent::CheckedOut(e) => {
                let from = self.status;
                self.status = RentalStatus::InUse;
                self.rental_start = Some(e.rental_start_at);
                self.meta.condition_out = e.condition_out.clone();
                self.meta.handover_notes = e.notes.clone();

                self.record_status_change(Some(from), RentalStatus::InUse, e.actor, e.occurred_at);
                self.record(
                    CheckpointPayload::Handover {
                        condition: e.condition_out.clone(),
                        notes: e.notes.clone(),
                    },
                    e.actor,
                    e.occurred_at,
                );
            }
            RentalEvent::Returned(e) => {
                let from = self.status;
                self.status = RentalStatus::InspectionPending;
                self.returned_at = Some(e.returned_at);
                self.meta.condition_in = e.condition_in.clone();
                self.meta.return_notes = e.notes.clone();

                self.record_status_change(
                    Some(from),
                    RentalStatus::InspectionPending,
                    e.actor,
                    e.occurred_at,
                );
                self.record(
                    CheckpointPayload::Handover {
                        condition: e.condition_in.clone(),
                        notes: e.notes.clone(),
                    },
                    e.actor,
                    e.occurred_at,
                );
            }
            RentalEvent::Inspected(e) => {
                let from = self.status;
                self.status = RentalStatus::Settled;
                self.deposit_status = e.summary.deposit_status;
                self.meta.inspection_notes = e.notes.clone();
                self.meta.settlement = Some(e.summary.clone());

                self.record_status_change(Some(from), RentalStatus::Settled, e.actor, e.occurred_at);
                self.record(
                    CheckpointPayload::Inspection {
                        summary: e.summary.clone(),
                    },
                    e.actor,
                    e.occurred_at,
                );
            }
            RentalEvent::NoteAdded(e) => {
                self.record(
                    CheckpointPayload::Note {
                        text: e.text.clone(),
                    },
                    e.actor,
                    e.occurred_at,
                );
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RentalCommand::Request(cmd) => self.handle_request(cmd),
            RentalCommand::Approve(cmd) => self.handle_approve(cmd),
            RentalCommand::Cancel(cmd) => self.handle_cancel(cmd),
            RentalCommand::SchedulePickup(cmd) => self.handle_schedule_pickup(cmd),
            RentalCommand::Checkout(cmd) => self.handle_checkout(cmd),
            RentalCommand::Return(cmd) => self.handle_return(cmd),
            RentalCommand::Inspect(cmd) => self.handle_inspect(cmd),
            RentalCommand::AddNote(cmd) => self.handle_add_note(cmd),
        }
    }
}

impl RentalAgreement {
    fn ensure_created(&self) -> DomainResult<()> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn ensure_rental_id(&self, rental_id: RentalId) -> DomainResult<()> {
        if self.id != rental_id {
            return Err(DomainError::invariant("rental_id mismatch"));
        }
        Ok(())
    }

    /// Transition guard: the operation must be listed for the current status.
    fn guard(&self, operation: &str, allowed: &[RentalStatus]) -> DomainResult<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(DomainError::invalid_transition(
                operation,
                self.status.as_str(),
            ))
        }
    }

    fn handle_request(&self, cmd: &RequestRental) -> DomainResult<Vec<RentalEvent>> {
        if self.created {
            return Err(DomainError::conflict("rental already exists"));
        }
        if cmd.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "quantity must be positive, got {}",
                cmd.quantity
            )));
        }
        if cmd.rental_end <= cmd.rental_start {
            return Err(DomainError::validation(
                "rental_end must be after rental_start",
            ));
        }

        Ok(vec![RentalEvent::Requested(RentalRequested {
            rental_id: cmd.rental_id,
            item_id: cmd.item_id,
            renter_id: cmd.renter_id,
            quantity: cmd.quantity,
            daily_rate: cmd.daily_rate.clone(),
            deposit: cmd.deposit.clone(),
            rental_start: cmd.rental_start,
            rental_end: cmd.rental_end,
            notes: cmd.notes.clone(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveRental) -> DomainResult<Vec<RentalEvent>> {
        self.ensure_created()?;
        self.ensure_rental_id(cmd.rental_id)?;
        self.guard("approve", &[RentalStatus::Requested])?;

        Ok(vec![RentalEvent::Approved(RentalApproved {
            rental_id: cmd.rental_id,
            notes: cmd.notes.clone(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelRental) -> DomainResult<Vec<RentalEvent>> {
        self.ensure_created()?;
        self.ensure_rental_id(cmd.rental_id)?;
        // Once stock is committed there is no cancellation path; the rental
        // must travel the return/inspection route instead.
        self.guard("cancel", &[RentalStatus::Requested, RentalStatus::Approved])?;

        Ok(vec![RentalEvent::Cancelled(RentalCancelled {
            rental_id: cmd.rental_id,
            reason: cmd.reason.clone(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_schedule_pickup(&self, cmd: &SchedulePickup) -> DomainResult<Vec<RentalEvent>> {
        self.ensure_created()?;
        self.ensure_rental_id(cmd.rental_id)?;
        self.guard("schedule_pickup", &[RentalStatus::Approved])?;

        if cmd.return_due_at <= cmd.pickup_at {
            return Err(DomainError::validation(
                "return_due_at must be after pickup_at",
            ));
        }

        Ok(vec![RentalEvent::PickupScheduled(PickupScheduled {
            rental_id: cmd.rental_id,
            pickup_at: cmd.pickup_at,
            return_due_at: cmd.return_due_at,
            logistics_notes: cmd.logistics_notes.clone(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_checkout(&self, cmd: &CheckoutRental) -> DomainResult<Vec<RentalEvent>> {
        self.ensure_created()?;
        self.ensure_rental_id(cmd.rental_id)?;
        self.guard("checkout", &[RentalStatus::PickupScheduled])?;

        Ok(vec![RentalEvent::CheckedOut(RentalCheckedOut {
            rental_id: cmd.rental_id,
            rental_start_at: cmd.rental_start_at.unwrap_or(cmd.occurred_at),
            condition_out: cmd.condition_out.clone(),
            notes: cmd.handover_notes.clone(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_return(&self, cmd: &ReturnRental) -> DomainResult<Vec<RentalEvent>> {
        self.ensure_created()?;
        self.ensure_rental_id(cmd.rental_id)?;
        self.guard("return", &[RentalStatus::InUse])?;

        Ok(vec![RentalEvent::Returned(RentalReturned {
            rental_id: cmd.rental_id,
            returned_at: cmd.returned_at.unwrap_or(cmd.occurred_at),
            condition_in: cmd.condition_in.clone(),
            notes: cmd.notes.clone(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_inspect(&self, cmd: &InspectRental) -> DomainResult<Vec<RentalEvent>> {
        self.ensure_created()?;
        self.ensure_rental_id(cmd.rental_id)?;
        self.guard("inspect", &[RentalStatus::InspectionPending])?;

        let deposit = self
            .deposit
            .as_ref()
            .ok_or_else(|| DomainError::invariant("rental has no deposit recorded"))?;
        let summary = settle(deposit, cmd.outcome, cmd.charges.clone())?;

        Ok(vec![RentalEvent::Inspected(RentalInspected {
            rental_id: cmd.rental_id,
            summary,
            notes: cmd.notes.clone(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_note(&self, cmd: &AddNote) -> DomainResult<Vec<RentalEvent>> {
        self.ensure_created()?;
        self.ensure_rental_id(cmd.rental_id)?;
        if self.is_terminal() {
            return Err(DomainError::invalid_transition(
                "add_note",
                self.status.as_str(),
            ));
        }
        if cmd.text.trim().is_empty() {
            return Err(DomainError::validation("note text cannot be empty"));
        }

        Ok(vec![RentalEvent::NoteAdded(RentalNoteAdded {
            rental_id: cmd.rental_id,
            text: cmd.text.clone(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    /// The ledger mutation an event requires, resolved against pre-apply state.
    pub fn ledger_effect(&self, event: &RentalEvent) -> Option<LedgerEffect> {
        match event {
            RentalEvent::Requested(e) => Some(LedgerEffect::Reserve {
                item_id: e.item_id,
                quantity: e.quantity,
            }),
            RentalEvent::Cancelled(_) => Some(LedgerEffect::Release {
                item_id: self.item_id?,
                quantity: self.quantity,
            }),
            RentalEvent::CheckedOut(_) => Some(LedgerEffect::Commit {
                item_id: self.item_id?,
                quantity: self.quantity,
            }),
            RentalEvent::Inspected(_) => Some(LedgerEffect::Restock {
                item_id: self.item_id?,
                quantity: self.quantity,
            }),
            _ => None,
        }
    }

    fn record_status_change(
        &mut self,
        from: Option<RentalStatus>,
        to: RentalStatus,
        actor: Actor,
        occurred_at: DateTime<Utc>,
    ) {
        self.record(CheckpointPayload::StatusChange { from, to }, actor, occurred_at);
    }

    fn record(&mut self, payload: CheckpointPayload, actor: Actor, occurred_at: DateTime<Utc>) {
        // Clock-skew guard: checkpoint timestamps never go backwards.
        let occurred_at = match self.timeline.last() {
            Some(last) if last.occurred_at > occurred_at => last.occurred_at,
            _ => occurred_at,
        };
        self.timeline
            .push(TimelineCheckpoint::new(payload, actor, occurred_at));
    }
}
