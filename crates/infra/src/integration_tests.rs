//! Integration tests for the full event pipeline.
//!
//! Recorder → EventStore → EventDispatcher → consumers (audit trail, cache
//! invalidation), all on the in-memory backends.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use serde_json::json;

    use fleetops_core::{ActorId, EventId};
    use fleetops_events::{DomainEvent, EventDispatcher, EventMetadata};

    use crate::audit::{
        AuditError, AuditHandler, AuditRecord, AuditSink, InMemoryAuditSink,
        register_audit_handler,
    };
    use crate::cache::{CacheInvalidationHandler, ReadCache, register_cache_invalidation};
    use crate::event_store::{EventLog, EventStore, EventStoreError, InMemoryEventLog};
    use crate::recorder::EventRecorder;

    struct Pipeline {
        recorder: EventRecorder<Arc<InMemoryEventLog>>,
        store: Arc<EventStore<Arc<InMemoryEventLog>>>,
        audit: Arc<InMemoryAuditSink>,
        cache: Arc<ReadCache>,
    }

    fn setup() -> Pipeline {
        let dispatcher = Arc::new(EventDispatcher::new());
        let log = Arc::new(InMemoryEventLog::new());
        let store = Arc::new(EventStore::new(log, dispatcher.clone()));

        let audit = Arc::new(InMemoryAuditSink::new());
        register_audit_handler(&dispatcher, Arc::new(AuditHandler::new(audit.clone())));

        let cache = Arc::new(ReadCache::new());
        register_cache_invalidation(
            &dispatcher,
            Arc::new(CacheInvalidationHandler::new(cache.clone())),
        );

        Pipeline {
            recorder: EventRecorder::new(store.clone()),
            store,
            audit,
            cache,
        }
    }

    /// Event log that refuses every write.
    struct FailingEventLog;

    #[async_trait]
    impl EventLog for FailingEventLog {
        async fn append(&self, _event: &DomainEvent) -> Result<(), EventStoreError> {
            Err(EventStoreError::Persistence("connection refused".to_string()))
        }

        async fn load_by_aggregate(
            &self,
            _aggregate_type: &str,
            _aggregate_id: &str,
        ) -> Result<Vec<DomainEvent>, EventStoreError> {
            Err(EventStoreError::Persistence("connection refused".to_string()))
        }
    }

    /// Audit sink that refuses every write.
    struct FailingAuditSink;

    #[async_trait]
    impl AuditSink for FailingAuditSink {
        async fn record(&self, _record: AuditRecord) -> Result<(), AuditError> {
            Err(AuditError::Write("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn created_event_produces_full_audit_row() {
        let pipeline = setup();

        pipeline
            .recorder
            .publish_created_event("Vehicle", "v1", json!({"plate": "ABC1234"}), Some("user-42"))
            .await;

        let records = pipeline.audit.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.actor_id, ActorId::from("user-42"));
        assert_eq!(record.action_type, "VehicleCreated");
        assert_eq!(record.resource_type, "Vehicle");
        assert_eq!(record.resource_id, "v1");
        assert_eq!(record.details["eventData"]["plate"], "ABC1234");
    }

    #[tokio::test]
    async fn missing_actor_is_attributed_to_system() {
        let pipeline = setup();

        pipeline
            .recorder
            .publish_updated_event("Driver", "d-7", json!({"licence": "B"}), None)
            .await;

        let records = pipeline.audit.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].actor_id.is_system());
        assert_eq!(records[0].action_type, "DriverUpdated");
    }

    #[tokio::test]
    async fn unaudited_aggregate_is_persisted_but_not_audited() {
        let pipeline = setup();

        pipeline
            .recorder
            .publish_created_event("Invoice", "i-1", json!({"total": 120}), Some("user-1"))
            .await;

        // Persisted and replayable...
        let history = pipeline
            .store
            .events_for_aggregate("Invoice", "i-1")
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        // ...but outside the audit allow-list.
        assert!(pipeline.audit.is_empty());
    }

    #[tokio::test]
    async fn saved_event_round_trips_through_replay() {
        let pipeline = setup();
        let mut metadata = EventMetadata::new();
        metadata.insert("requestId".to_string(), json!("req-1"));
        let event = DomainEvent::new(
            "CostCreated",
            "Cost",
            "c-5",
            json!({"amount": 42, "currency": "BRL"}),
            metadata,
        );

        pipeline.store.save(&event).await.unwrap();

        let history = pipeline
            .store
            .events_for_aggregate("Cost", "c-5")
            .await
            .unwrap();
        assert_eq!(history, vec![event]);
    }

    #[tokio::test]
    async fn replay_is_sorted_by_occurrence_time() {
        let pipeline = setup();
        let base = Utc::now();
        let at = |offset: i64| base + Duration::seconds(offset);

        let mut events = Vec::new();
        for offset in [20, 10, 30] {
            let event = DomainEvent::from_parts(
                EventId::new(),
                "VehicleUpdated",
                "Vehicle",
                "v-9",
                at(offset),
                json!({"offset": offset}),
                EventMetadata::new(),
            );
            pipeline.store.save(&event).await.unwrap();
            events.push(event);
        }

        let history = pipeline
            .store
            .events_for_aggregate("Vehicle", "v-9")
            .await
            .unwrap();

        // Inserted as t2, t1, t3; replayed as t1, t2, t3.
        assert_eq!(history, vec![events[1].clone(), events[0].clone(), events[2].clone()]);
    }

    #[tokio::test]
    async fn persistence_failure_never_reaches_the_caller() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let store = Arc::new(EventStore::new(Arc::new(FailingEventLog), dispatcher.clone()));
        let audit = Arc::new(InMemoryAuditSink::new());
        register_audit_handler(&dispatcher, Arc::new(AuditHandler::new(audit.clone())));
        let recorder = EventRecorder::new(store);

        // Returns normally despite the storage failure.
        recorder
            .publish_created_event("Vehicle", "v1", json!({"plate": "XYZ0001"}), Some("user-42"))
            .await;

        // Nothing was dispatched: a failed persist publishes nothing.
        assert!(audit.is_empty());
    }

    #[tokio::test]
    async fn failing_audit_sink_does_not_block_other_consumers() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let log = Arc::new(InMemoryEventLog::new());
        let store = Arc::new(EventStore::new(log, dispatcher.clone()));
        register_audit_handler(&dispatcher, Arc::new(AuditHandler::new(FailingAuditSink)));
        let cache = Arc::new(ReadCache::new());
        register_cache_invalidation(
            &dispatcher,
            Arc::new(CacheInvalidationHandler::new(cache.clone())),
        );
        cache.put("vehicles:list:page-1", json!([1, 2, 3]));

        let recorder = EventRecorder::new(store.clone());
        recorder
            .publish_created_event("Vehicle", "v1", json!({"plate": "DEF5678"}), None)
            .await;

        // The sibling consumer's side effect is still committed.
        assert!(cache.get("vehicles:list:page-1").is_none());
        // And the event itself is durable.
        let history = store.events_for_aggregate("Vehicle", "v1").await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn lifecycle_events_evict_only_matching_lists() {
        let pipeline = setup();
        pipeline.cache.put("vehicles:list:page-1", json!([1]));
        pipeline.cache.put("vehicles:list:page-2", json!([2]));
        pipeline.cache.put("drivers:list:page-1", json!([3]));

        pipeline
            .recorder
            .publish_deleted_event("Vehicle", "v1", json!({}), Some("user-9"))
            .await;

        assert!(pipeline.cache.get("vehicles:list:page-1").is_none());
        assert!(pipeline.cache.get("vehicles:list:page-2").is_none());
        assert_eq!(pipeline.cache.get("drivers:list:page-1"), Some(json!([3])));
    }

    #[tokio::test]
    async fn lifecycle_wrappers_derive_conventional_action_types() {
        let pipeline = setup();

        pipeline
            .recorder
            .publish_created_event("Company", "co-1", json!({"name": "Acme"}), Some("user-1"))
            .await;
        pipeline
            .recorder
            .publish_updated_event("Company", "co-1", json!({"name": "Acme Ltda"}), Some("user-1"))
            .await;
        pipeline
            .recorder
            .publish_deleted_event("Company", "co-1", json!({}), Some("user-1"))
            .await;

        let actions: Vec<String> = pipeline
            .audit
            .records()
            .into_iter()
            .map(|r| r.action_type)
            .collect();
        assert_eq!(actions, vec!["CompanyCreated", "CompanyUpdated", "CompanyDeleted"]);
    }

    #[tokio::test]
    async fn sequential_saves_keep_audit_order() {
        let pipeline = setup();

        for plate in ["AAA1111", "BBB2222", "CCC3333"] {
            pipeline
                .recorder
                .publish_created_event("Vehicle", plate, json!({"plate": plate}), None)
                .await;
        }

        let resources: Vec<String> = pipeline
            .audit
            .records()
            .into_iter()
            .map(|r| r.resource_id)
            .collect();
        assert_eq!(resources, vec!["AAA1111", "BBB2222", "CCC3333"]);
    }
}
