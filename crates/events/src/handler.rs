use async_trait::async_trait;
use thiserror::Error;

use crate::event::DomainEvent;

/// Failure inside a single handler's execution.
///
/// Wraps whatever the handler ran into; the dispatcher logs it together with
/// the event identity and discards it. Handler errors are never retried and
/// never reach the publishing caller.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct HandlerError(#[from] anyhow::Error);

impl HandlerError {
    pub fn msg(msg: impl Into<String>) -> Self {
        Self(anyhow::anyhow!(msg.into()))
    }
}

/// An independent consumer reacting to events for side effects.
///
/// Handlers are registered once at process start and invoked for every
/// published event whose type they subscribed to. A handler must tolerate
/// running concurrently with other handlers of the same event; no ordering
/// exists between handlers within one fan-out.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Stable name used in logs to attribute failures.
    fn name(&self) -> &'static str;

    /// Consume one event.
    ///
    /// Errors are reported to the dispatcher's isolation boundary; they do
    /// not affect sibling handlers or the publisher.
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError>;
}
