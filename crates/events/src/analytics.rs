//! Envelope published to the external analytics collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// A fire-and-forget analytics emission.
///
/// `name` is the stable event name (e.g. "rental.status_transition");
/// `metadata` is a free-form JSON document whose shape is owned by the
/// downstream warehouse, not by this engine. Emissions are never load-bearing:
/// losing one must not affect ledger or rental state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    event_id: Uuid,
    name: String,
    metadata: JsonValue,
    occurred_at: DateTime<Utc>,
}

impl AnalyticsEvent {
    pub fn new(name: impl Into<String>, metadata: JsonValue, occurred_at: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            name: name.into(),
            metadata,
            occurred_at,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &JsonValue {
        &self.metadata
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
