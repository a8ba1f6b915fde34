//! Infrastructure layer: event persistence, consumers, configuration.

pub mod audit;
pub mod cache;
pub mod config;
pub mod event_store;
pub mod recorder;

mod integration_tests;

pub use audit::{
    AuditError, AuditHandler, AuditRecord, AuditSink, InMemoryAuditSink, PostgresAuditSink,
    register_audit_handler,
};
pub use cache::{CacheInvalidationHandler, ReadCache, register_cache_invalidation};
pub use config::StoreConfig;
pub use event_store::{EventLog, EventStore, EventStoreError, InMemoryEventLog, PostgresEventLog};
pub use recorder::EventRecorder;
