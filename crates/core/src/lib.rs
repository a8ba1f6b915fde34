//! `fleetops-core` — identity building blocks shared by the event pipeline.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{CoreError, CoreResult};
pub use id::{ActorId, EventId};
