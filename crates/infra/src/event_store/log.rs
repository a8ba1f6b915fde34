use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use fleetops_events::DomainEvent;

/// Event storage error.
///
/// These are infrastructure failures; nothing here is allowed to reach the
/// business operation that triggered event capture (the recording façade
/// swallows them after logging).
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// The storage client cannot be constructed (missing credentials or
    /// endpoint). Surfaces synchronously at startup; not retried.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// The durable write or read of an event failed (connectivity,
    /// constraint violation).
    #[error("event persistence failed: {0}")]
    Persistence(String),
}

/// Append-only persistence for domain events.
///
/// Implementations must:
/// - reject a second append with an already-stored `event_id`
/// - never mutate or delete stored events
/// - return replays for a single aggregate in ascending `occurred_at` order
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Persist one event, keyed by its `event_id`.
    async fn append(&self, event: &DomainEvent) -> Result<(), EventStoreError>;

    /// Load every event recorded for one aggregate, ascending by
    /// `occurred_at`. Every call re-reads the full history.
    async fn load_by_aggregate(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> Result<Vec<DomainEvent>, EventStoreError>;
}

#[async_trait]
impl<L> EventLog for Arc<L>
where
    L: EventLog + ?Sized,
{
    async fn append(&self, event: &DomainEvent) -> Result<(), EventStoreError> {
        (**self).append(event).await
    }

    async fn load_by_aggregate(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> Result<Vec<DomainEvent>, EventStoreError> {
        (**self).load_by_aggregate(aggregate_type, aggregate_id).await
    }
}
