//! In-process publish/subscribe dispatch.
//!
//! The dispatcher owns the subscription registry and fans published events
//! out to every handler registered for the event's type. Fan-out is
//! concurrent within one event and isolated: a failing or slow handler is
//! logged and discarded without affecting its siblings or the caller.
//!
//! The registry is written during process bootstrap and read-only afterwards.
//! There is no unsubscribe; subscriptions live for the process lifetime.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::event::DomainEvent;
use crate::handler::EventHandler;

/// Budget applied to each handler invocation unless overridden.
const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

/// Routes published events to the handlers subscribed to their type.
///
/// Constructed once at process startup and shared by reference (`Arc`) with
/// both producers and the bootstrap code that registers handlers. Publishing
/// never fails: handler errors and timeouts are logged with the event
/// identity and swallowed here.
pub struct EventDispatcher {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
    handler_timeout: Duration,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::with_handler_timeout(DEFAULT_HANDLER_TIMEOUT)
    }

    /// Create a dispatcher with a custom per-handler timeout budget.
    ///
    /// A handler still running when its budget elapses is abandoned and the
    /// timeout is logged as an isolated handler failure.
    pub fn with_handler_timeout(handler_timeout: Duration) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            handler_timeout,
        }
    }

    /// Register `handler` for events of `event_type`.
    ///
    /// Registering the same handler twice means it runs twice per event;
    /// callers register each handler once, at process start.
    pub fn subscribe(&self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) {
        let event_type = event_type.into();
        match self.handlers.write() {
            Ok(mut map) => map.entry(event_type).or_default().push(handler),
            Err(_) => warn!(%event_type, "subscription registry lock poisoned; handler not registered"),
        }
    }

    /// Deliver one event to every handler subscribed to its type.
    ///
    /// All handlers run concurrently against the same event; the call
    /// returns once every one of them has settled. An event type with no
    /// subscribers is expected and harmless.
    pub async fn publish(&self, event: &DomainEvent) {
        let handlers = self.handlers_for(event.event_type());
        if handlers.is_empty() {
            return;
        }

        debug!(
            event_type = event.event_type(),
            event_id = %event.event_id(),
            handler_count = handlers.len(),
            "dispatching event"
        );

        join_all(handlers.iter().map(|handler| self.run_handler(handler.as_ref(), event))).await;
    }

    /// Publish a sequence of events strictly one after another.
    ///
    /// Each event's fan-out fully completes before the next event starts, so
    /// any order-sensitive handler observes the events in sequence.
    pub async fn publish_all(&self, events: &[DomainEvent]) {
        for event in events {
            self.publish(event).await;
        }
    }

    async fn run_handler(&self, handler: &dyn EventHandler, event: &DomainEvent) {
        match tokio::time::timeout(self.handler_timeout, handler.handle(event)).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => warn!(
                handler = handler.name(),
                event_type = event.event_type(),
                event_id = %event.event_id(),
                %error,
                "event handler failed"
            ),
            Err(_) => warn!(
                handler = handler.name(),
                event_type = event.event_type(),
                event_id = %event.event_id(),
                timeout_ms = self.handler_timeout.as_millis() as u64,
                "event handler exceeded its timeout budget"
            ),
        }
    }

    fn handlers_for(&self, event_type: &str) -> Vec<Arc<dyn EventHandler>> {
        // Clone the handler list so the registry lock is never held across
        // an await point.
        match self.handlers.read() {
            Ok(map) => map.get(event_type).cloned().unwrap_or_default(),
            Err(_) => {
                warn!(event_type, "subscription registry lock poisoned; dropping dispatch");
                Vec::new()
            }
        }
    }
}

impl core::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let subscriptions = self.handlers.read().map(|m| m.len()).unwrap_or(0);
        f.debug_struct("EventDispatcher")
            .field("event_types", &subscriptions)
            .field("handler_timeout", &self.handler_timeout)
            .finish()
    }
}
