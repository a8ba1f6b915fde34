//! Event capture: append-only persistence plus the persist-then-dispatch
//! sequence.
//!
//! The [`EventStore`] owns the ordering between durability and delivery:
//! an event is appended to the log first, and only a successful append is
//! dispatched. A failed append propagates to the caller (the recording
//! façade) and nothing is delivered; dispatch itself never fails, so
//! `save`'s failure mode is persistence-only.

mod in_memory;
mod log;
mod postgres;

pub use in_memory::InMemoryEventLog;
pub use log::{EventLog, EventStoreError};
pub use postgres::PostgresEventLog;

use std::sync::Arc;

use tracing::error;

use fleetops_events::{DomainEvent, EventDispatcher};

/// Durable event capture with replay-by-aggregate.
///
/// Generic over the persistence backend so tests run against
/// [`InMemoryEventLog`] and production against [`PostgresEventLog`]; both
/// are injected at startup together with the shared dispatcher.
#[derive(Debug)]
pub struct EventStore<L> {
    log: L,
    dispatcher: Arc<EventDispatcher>,
}

impl<L> EventStore<L> {
    pub fn new(log: L, dispatcher: Arc<EventDispatcher>) -> Self {
        Self { log, dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }
}

impl<L> EventStore<L>
where
    L: EventLog,
{
    /// Persist the event, then fan it out to subscribed handlers.
    ///
    /// A persistence failure is logged with the full event context and
    /// returned; the event is not dispatched. Handler failures during the
    /// fan-out are isolated inside the dispatcher and never surface here.
    pub async fn save(&self, event: &DomainEvent) -> Result<(), EventStoreError> {
        if let Err(e) = self.log.append(event).await {
            error!(
                event_id = %event.event_id(),
                event_type = event.event_type(),
                aggregate_type = event.aggregate_type(),
                aggregate_id = event.aggregate_id(),
                error = %e,
                "failed to persist domain event"
            );
            return Err(e);
        }

        self.dispatcher.publish(event).await;
        Ok(())
    }

    /// Full event history of one aggregate, ascending by `occurred_at`.
    pub async fn events_for_aggregate(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> Result<Vec<DomainEvent>, EventStoreError> {
        self.log.load_by_aggregate(aggregate_type, aggregate_id).await
    }
}
