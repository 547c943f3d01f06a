//! Append-only audit trail attached to a rental agreement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use toolhire_core::Actor;
use toolhire_settlement::SettlementSummary;

use crate::agreement::RentalStatus;

/// Checkpoint classification, mirrored from the payload variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    StatusChange,
    Note,
    Handover,
    Inspection,
}

/// Transition-specific checkpoint payload.
///
/// Free-form in the upstream system; modelled here as a typed enum so each
/// checkpoint kind carries exactly the fields it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CheckpointPayload {
    StatusChange {
        /// `None` for the very first checkpoint (nothing preceded `requested`).
        from: Option<RentalStatus>,
        to: RentalStatus,
    },
    Note {
        text: String,
    },
    Handover {
        /// Condition snapshot at the handover (out at checkout, in at return).
        condition: Option<String>,
        notes: Option<String>,
    },
    Inspection {
        summary: SettlementSummary,
    },
}

impl CheckpointPayload {
    pub fn kind(&self) -> CheckpointKind {
        match self {
            CheckpointPayload::StatusChange { .. } => CheckpointKind::StatusChange,
            CheckpointPayload::Note { .. } => CheckpointKind::Note,
            CheckpointPayload::Handover { .. } => CheckpointKind::Handover,
            CheckpointPayload::Inspection { .. } => CheckpointKind::Inspection,
        }
    }
}

/// One immutable, ordered audit entry.
///
/// Checkpoints are never edited or removed, and `occurred_at` is
/// monotonically non-decreasing within a rental's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineCheckpoint {
    pub payload: CheckpointPayload,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

impl TimelineCheckpoint {
    pub fn new(payload: CheckpointPayload, actor: Actor, occurred_at: DateTime<Utc>) -> Self {
        Self {
            payload,
            actor,
            occurred_at,
        }
    }

    pub fn kind(&self) -> CheckpointKind {
        self.payload.kind()
    }
}
