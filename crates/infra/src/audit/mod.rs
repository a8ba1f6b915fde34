//! Audit trail: "who did what to which resource and when".
//!
//! Populated as a side effect of event dispatch by the [`AuditHandler`],
//! which consumes lifecycle events for a curated set of aggregates and
//! writes one normalized record per event through an [`AuditSink`].

mod handler;
mod in_memory;
mod postgres;

pub use handler::{AUDITED_AGGREGATES, AuditHandler, register_audit_handler};
pub use in_memory::InMemoryAuditSink;
pub use postgres::PostgresAuditSink;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use fleetops_core::ActorId;

/// Audit storage error.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit write failed: {0}")]
    Write(String),
}

/// One row in the audit trail.
///
/// `details` carries the event identity, the full event payload, the
/// occurrence time and any remaining metadata, so the audit trail alone is
/// enough to reconstruct what was recorded about the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub actor_id: ActorId,
    pub action_type: String,
    pub resource_type: String,
    pub resource_id: String,
    pub details: JsonValue,
}

/// Durable destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord) -> Result<(), AuditError>;
}

#[async_trait]
impl<S> AuditSink for Arc<S>
where
    S: AuditSink + ?Sized,
{
    async fn record(&self, record: AuditRecord) -> Result<(), AuditError> {
        (**self).record(record).await
    }
}
