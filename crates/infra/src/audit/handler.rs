use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use fleetops_core::ActorId;
use fleetops_events::{
    DomainEvent, EventDispatcher, EventHandler, EventKind, HandlerError, METADATA_USER_ID,
};

use super::{AuditRecord, AuditSink};

/// Aggregates whose lifecycle changes are written to the audit trail.
///
/// A curated allow-list, not a catch-all: events for aggregates outside this
/// set receive no audit entry.
pub const AUDITED_AGGREGATES: &[&str] = &["Company", "Vehicle", "Driver", "Route", "Cost"];

/// Consumes lifecycle events and writes one audit record per event.
///
/// Fully self-isolating: a sink failure is caught and logged here and the
/// dispatch proceeds as if the handler succeeded. Audit gaps are observable
/// only through logs.
#[derive(Debug)]
pub struct AuditHandler<S> {
    sink: S,
}

impl<S> AuditHandler<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }
}

/// Normalize one event into its audit row.
///
/// The acting user comes from `metadata.userId`; changes without one are
/// attributed to the `"system"` actor. The remaining metadata travels in
/// `details` so nothing recorded about the change is lost.
fn record_for(event: &DomainEvent) -> AuditRecord {
    let actor_id = event
        .metadata_str(METADATA_USER_ID)
        .map(ActorId::from)
        .unwrap_or_else(ActorId::system);

    let mut remaining = event.metadata().clone();
    remaining.remove(METADATA_USER_ID);

    AuditRecord {
        actor_id,
        action_type: event.event_type().to_string(),
        resource_type: event.aggregate_type().to_string(),
        resource_id: event.aggregate_id().to_string(),
        details: json!({
            "eventId": event.event_id(),
            "eventData": event.data(),
            "occurredAt": event.occurred_at(),
            "metadata": remaining,
        }),
    }
}

#[async_trait]
impl<S> EventHandler for AuditHandler<S>
where
    S: AuditSink,
{
    fn name(&self) -> &'static str {
        "audit-trail"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        if let Err(error) = self.sink.record(record_for(event)).await {
            warn!(
                event_id = %event.event_id(),
                event_type = event.event_type(),
                resource_type = event.aggregate_type(),
                resource_id = event.aggregate_id(),
                %error,
                "audit record write failed; audit trail has a gap"
            );
        }
        Ok(())
    }
}

/// Subscribe the audit handler to every audited lifecycle event type.
///
/// Called once during process bootstrap.
pub fn register_audit_handler<S>(dispatcher: &EventDispatcher, handler: Arc<AuditHandler<S>>)
where
    S: AuditSink + 'static,
{
    for aggregate in AUDITED_AGGREGATES {
        for kind in EventKind::ALL {
            dispatcher.subscribe(kind.event_type_for(aggregate), handler.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetops_events::EventMetadata;
    use serde_json::json;

    #[test]
    fn record_carries_actor_resource_and_payload() {
        let mut metadata = EventMetadata::new();
        metadata.insert(METADATA_USER_ID.to_string(), json!("user-42"));
        metadata.insert("requestId".to_string(), json!("req-9"));
        let event = DomainEvent::new(
            "VehicleCreated",
            "Vehicle",
            "v1",
            json!({"plate": "ABC1234"}),
            metadata,
        );

        let record = record_for(&event);

        assert_eq!(record.actor_id, ActorId::from("user-42"));
        assert_eq!(record.action_type, "VehicleCreated");
        assert_eq!(record.resource_type, "Vehicle");
        assert_eq!(record.resource_id, "v1");
        assert_eq!(record.details["eventData"]["plate"], "ABC1234");
        assert_eq!(
            record.details["eventId"],
            json!(event.event_id()),
        );
        // userId moved into actor_id; the rest of the metadata stays.
        assert_eq!(record.details["metadata"]["requestId"], "req-9");
        assert!(record.details["metadata"].get(METADATA_USER_ID).is_none());
    }

    #[test]
    fn missing_actor_defaults_to_system() {
        let event = DomainEvent::new(
            "RouteDeleted",
            "Route",
            "r-3",
            json!({}),
            EventMetadata::new(),
        );

        let record = record_for(&event);
        assert!(record.actor_id.is_system());
    }
}
