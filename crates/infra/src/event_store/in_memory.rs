use std::sync::RwLock;

use async_trait::async_trait;

use fleetops_events::DomainEvent;

use super::log::{EventLog, EventStoreError};

/// In-memory append-only event log.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: RwLock<Vec<DomainEvent>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events stored so far (across all aggregates).
    pub fn len(&self) -> usize {
        self.events.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, event: &DomainEvent) -> Result<(), EventStoreError> {
        let mut events = self
            .events
            .write()
            .map_err(|_| EventStoreError::Persistence("lock poisoned".to_string()))?;

        if events.iter().any(|e| e.event_id() == event.event_id()) {
            return Err(EventStoreError::Persistence(format!(
                "duplicate event_id {}",
                event.event_id()
            )));
        }

        events.push(event.clone());
        Ok(())
    }

    async fn load_by_aggregate(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> Result<Vec<DomainEvent>, EventStoreError> {
        let events = self
            .events
            .read()
            .map_err(|_| EventStoreError::Persistence("lock poisoned".to_string()))?;

        let mut matching: Vec<DomainEvent> = events
            .iter()
            .filter(|e| e.aggregate_type() == aggregate_type && e.aggregate_id() == aggregate_id)
            .cloned()
            .collect();

        // Stable sort: equal timestamps keep insertion order.
        matching.sort_by_key(|e| e.occurred_at());
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use fleetops_core::EventId;
    use fleetops_events::EventMetadata;
    use proptest::prelude::*;
    use serde_json::json;

    fn event_at(aggregate_id: &str, offset_secs: i64) -> DomainEvent {
        DomainEvent::from_parts(
            EventId::new(),
            "VehicleUpdated",
            "Vehicle",
            aggregate_id,
            Utc::now() + Duration::seconds(offset_secs),
            json!({"offset": offset_secs}),
            EventMetadata::new(),
        )
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread().build().unwrap()
    }

    #[tokio::test]
    async fn append_then_load_round_trips() {
        let log = InMemoryEventLog::new();
        let event = event_at("v1", 0);

        log.append(&event).await.unwrap();
        let loaded = log.load_by_aggregate("Vehicle", "v1").await.unwrap();

        assert_eq!(loaded, vec![event]);
    }

    #[tokio::test]
    async fn duplicate_event_id_is_rejected() {
        let log = InMemoryEventLog::new();
        let event = event_at("v1", 0);

        log.append(&event).await.unwrap();
        let err = log.append(&event).await.unwrap_err();

        assert!(matches!(err, EventStoreError::Persistence(_)));
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn load_sorts_out_of_order_inserts() {
        let log = InMemoryEventLog::new();
        let t2 = event_at("v1", 20);
        let t1 = event_at("v1", 10);
        let t3 = event_at("v1", 30);

        for e in [&t2, &t1, &t3] {
            log.append(e).await.unwrap();
        }

        let loaded = log.load_by_aggregate("Vehicle", "v1").await.unwrap();
        assert_eq!(loaded, vec![t1, t2, t3]);
    }

    #[tokio::test]
    async fn load_is_scoped_to_one_aggregate() {
        let log = InMemoryEventLog::new();
        log.append(&event_at("v1", 0)).await.unwrap();
        log.append(&event_at("v2", 0)).await.unwrap();

        let loaded = log.load_by_aggregate("Vehicle", "v1").await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].aggregate_id(), "v1");

        assert!(log.load_by_aggregate("Driver", "v1").await.unwrap().is_empty());
    }

    proptest! {
        /// Property: whatever order events are appended in, replay for the
        /// aggregate comes back ascending by occurrence time.
        #[test]
        fn replay_is_sorted_for_any_insertion_order(
            offsets in prop::collection::vec(0i64..86_400, 1..20)
        ) {
            let rt = runtime();
            rt.block_on(async {
                let log = InMemoryEventLog::new();
                for offset in &offsets {
                    log.append(&event_at("v1", *offset)).await.unwrap();
                }

                let loaded = log.load_by_aggregate("Vehicle", "v1").await.unwrap();
                prop_assert_eq!(loaded.len(), offsets.len());
                for pair in loaded.windows(2) {
                    prop_assert!(pair[0].occurred_at() <= pair[1].occurred_at());
                }
                Ok(())
            })?;
        }
    }
}
