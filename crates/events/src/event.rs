use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use fleetops_core::EventId;

/// Opaque side-channel map carried alongside the event payload.
///
/// Used for cross-cutting context the payload itself does not describe,
/// most notably the acting user under [`METADATA_USER_ID`].
pub type EventMetadata = serde_json::Map<String, JsonValue>;

/// Metadata key carrying the identifier of the user who triggered the change.
pub const METADATA_USER_ID: &str = "userId";

/// An immutable record of a business fact.
///
/// Notes:
/// - **Append-only**: once persisted, an event is never mutated or deleted.
///   Fields are private; consumers read through accessors.
/// - `event_id` is unique across the whole store and assigned at
///   construction.
/// - `data` is the domain payload, schema is per `event_type` and not
///   validated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEvent {
    event_id: EventId,
    event_type: String,

    aggregate_type: String,
    aggregate_id: String,

    /// When the fact occurred (business time, assigned at construction).
    occurred_at: DateTime<Utc>,

    data: JsonValue,

    #[serde(default)]
    metadata: EventMetadata,
}

impl DomainEvent {
    /// Record a new business fact: fresh identity, stamped with the current
    /// time.
    pub fn new(
        event_type: impl Into<String>,
        aggregate_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        data: JsonValue,
        metadata: EventMetadata,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            event_type: event_type.into(),
            aggregate_type: aggregate_type.into(),
            aggregate_id: aggregate_id.into(),
            occurred_at: Utc::now(),
            data,
            metadata,
        }
    }

    /// Reconstruct a previously persisted event (replay path).
    ///
    /// Identity and occurrence time come from storage, not from the clock.
    pub fn from_parts(
        event_id: EventId,
        event_type: impl Into<String>,
        aggregate_type: impl Into<String>,
        aggregate_id: impl Into<String>,
        occurred_at: DateTime<Utc>,
        data: JsonValue,
        metadata: EventMetadata,
    ) -> Self {
        Self {
            event_id,
            event_type: event_type.into(),
            aggregate_type: aggregate_type.into(),
            aggregate_id: aggregate_id.into(),
            occurred_at,
            data,
            metadata,
        }
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn data(&self) -> &JsonValue {
        &self.data
    }

    pub fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    /// String-valued metadata entry, if present.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(JsonValue::as_str)
    }
}

/// Lifecycle verb for the conventional `<AggregateType><Verb>` event types.
///
/// The set of verbs is closed; the set of aggregate types is open (callers
/// name them freely), which is why the verb is typed and the payload is not.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::Created, EventKind::Updated, EventKind::Deleted];

    pub fn suffix(self) -> &'static str {
        match self {
            EventKind::Created => "Created",
            EventKind::Updated => "Updated",
            EventKind::Deleted => "Deleted",
        }
    }

    /// Conventional event type for a lifecycle change of the given aggregate,
    /// e.g. `"VehicleCreated"`.
    pub fn event_type_for(self, aggregate_type: &str) -> String {
        format!("{aggregate_type}{}", self.suffix())
    }
}

impl core::fmt::Display for EventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.suffix())
    }
}
