//! `fleetops-events` — domain events and in-process dispatch.
//!
//! A [`DomainEvent`] is an immutable record of a business fact that already
//! happened. The [`EventDispatcher`] fans persisted events out to every
//! [`EventHandler`] subscribed to their type; handler failures are isolated
//! and never reach the publishing caller.

pub mod dispatcher;
pub mod event;
pub mod handler;

pub use dispatcher::EventDispatcher;
pub use event::{DomainEvent, EventKind, EventMetadata, METADATA_USER_ID};
pub use handler::{EventHandler, HandlerError};
