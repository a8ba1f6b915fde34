//! Best-effort event recording façade for business callers.
//!
//! Business services call this after completing their own primary write.
//! Event capture is advisory: whatever goes wrong downstream (persistence,
//! dispatch, a consumer) is logged and swallowed so the triggering business
//! operation never fails or rolls back because of it. Callers get no
//! success signal, by design.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::warn;

use fleetops_events::{DomainEvent, EventKind, EventMetadata, METADATA_USER_ID};

use crate::event_store::{EventLog, EventStore};

/// Constructs well-formed domain events and hands them to the store.
#[derive(Debug)]
pub struct EventRecorder<L> {
    store: Arc<EventStore<L>>,
}

impl<L> EventRecorder<L> {
    pub fn new(store: Arc<EventStore<L>>) -> Self {
        Self { store }
    }
}

impl<L> EventRecorder<L>
where
    L: EventLog,
{
    /// Record an arbitrary domain event.
    ///
    /// Builds the event with a fresh identity and the current time, saves
    /// it, and swallows any failure after logging it.
    pub async fn publish_domain_event(
        &self,
        event_type: &str,
        aggregate_type: &str,
        aggregate_id: &str,
        data: JsonValue,
        metadata: EventMetadata,
    ) {
        let event = DomainEvent::new(event_type, aggregate_type, aggregate_id, data, metadata);

        if let Err(error) = self.store.save(&event).await {
            warn!(
                event_type,
                aggregate_type,
                aggregate_id,
                %error,
                "domain event publication failed; primary operation unaffected"
            );
        }
    }

    /// Record a `<AggregateType>Created` event.
    pub async fn publish_created_event(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
        payload: JsonValue,
        actor: Option<&str>,
    ) {
        self.publish_lifecycle(EventKind::Created, aggregate_type, aggregate_id, payload, actor)
            .await;
    }

    /// Record a `<AggregateType>Updated` event.
    pub async fn publish_updated_event(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
        payload: JsonValue,
        actor: Option<&str>,
    ) {
        self.publish_lifecycle(EventKind::Updated, aggregate_type, aggregate_id, payload, actor)
            .await;
    }

    /// Record a `<AggregateType>Deleted` event.
    pub async fn publish_deleted_event(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
        payload: JsonValue,
        actor: Option<&str>,
    ) {
        self.publish_lifecycle(EventKind::Deleted, aggregate_type, aggregate_id, payload, actor)
            .await;
    }

    async fn publish_lifecycle(
        &self,
        kind: EventKind,
        aggregate_type: &str,
        aggregate_id: &str,
        payload: JsonValue,
        actor: Option<&str>,
    ) {
        let mut metadata = EventMetadata::new();
        if let Some(actor) = actor {
            metadata.insert(
                METADATA_USER_ID.to_string(),
                JsonValue::String(actor.to_string()),
            );
        }

        let event_type = kind.event_type_for(aggregate_type);
        self.publish_domain_event(&event_type, aggregate_type, aggregate_id, payload, metadata)
            .await;
    }
}
