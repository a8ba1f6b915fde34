//! Postgres-backed event log.
//!
//! Persists domain events in an append-only table keyed by `event_id`.
//! Append-only semantics are enforced at the database level: the primary key
//! on `event_id` rejects duplicates, and nothing here issues UPDATE or
//! DELETE statements.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `EventStoreError::Persistence`. Unique-key
//! violations (code `23505`) get a dedicated duplicate-event message since
//! they indicate a caller bug rather than a connectivity problem.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use async_trait::async_trait;
use fleetops_core::EventId;
use fleetops_events::{DomainEvent, EventMetadata};

use super::log::{EventLog, EventStoreError};

/// Postgres-backed append-only event log.
///
/// The pool is built once at process start (see `StoreConfig`) and injected;
/// the log is `Send + Sync` and can be shared across tasks.
#[derive(Debug, Clone)]
pub struct PostgresEventLog {
    pool: PgPool,
}

impl PostgresEventLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventLog for PostgresEventLog {
    #[instrument(
        skip(self, event),
        fields(
            event_id = %event.event_id(),
            event_type = event.event_type(),
            aggregate_type = event.aggregate_type(),
            aggregate_id = event.aggregate_id()
        ),
        err
    )]
    async fn append(&self, event: &DomainEvent) -> Result<(), EventStoreError> {
        sqlx::query(
            r#"
            INSERT INTO events (
                event_id,
                event_type,
                aggregate_type,
                aggregate_id,
                occurred_at,
                event_data,
                metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.event_id().as_uuid())
        .bind(event.event_type())
        .bind(event.aggregate_type())
        .bind(event.aggregate_id())
        .bind(event.occurred_at())
        .bind(event.data())
        .bind(JsonValue::Object(event.metadata().clone()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                EventStoreError::Persistence(format!(
                    "duplicate event_id {}",
                    event.event_id()
                ))
            } else {
                map_sqlx_error("append", e)
            }
        })?;

        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn load_by_aggregate(
        &self,
        aggregate_type: &str,
        aggregate_id: &str,
    ) -> Result<Vec<DomainEvent>, EventStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                event_id,
                event_type,
                aggregate_type,
                aggregate_id,
                occurred_at,
                event_data,
                metadata
            FROM events
            WHERE aggregate_type = $1 AND aggregate_id = $2
            ORDER BY occurred_at ASC, created_at ASC
            "#,
        )
        .bind(aggregate_type)
        .bind(aggregate_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_by_aggregate", e))?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let event_row = EventRow::from_row(&row).map_err(|e| {
                EventStoreError::Persistence(format!("failed to deserialize event row: {e}"))
            })?;
            events.push(event_row.into());
        }

        Ok(events)
    }
}

/// Map SQLx errors to the storage error model.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> EventStoreError {
    match err {
        sqlx::Error::Database(db_err) => EventStoreError::Persistence(format!(
            "database error in {operation}: {}",
            db_err.message()
        )),
        sqlx::Error::PoolClosed => {
            EventStoreError::Persistence(format!("connection pool closed in {operation}"))
        }
        _ => EventStoreError::Persistence(format!("sqlx error in {operation}: {err}")),
    }
}

/// Check if an error is a unique constraint violation (Postgres 23505).
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

#[derive(Debug)]
struct EventRow {
    event_id: uuid::Uuid,
    event_type: String,
    aggregate_type: String,
    aggregate_id: String,
    occurred_at: DateTime<Utc>,
    event_data: JsonValue,
    metadata: JsonValue,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for EventRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(EventRow {
            event_id: row.try_get("event_id")?,
            event_type: row.try_get("event_type")?,
            aggregate_type: row.try_get("aggregate_type")?,
            aggregate_id: row.try_get("aggregate_id")?,
            occurred_at: row.try_get("occurred_at")?,
            event_data: row.try_get("event_data")?,
            metadata: row.try_get("metadata")?,
        })
    }
}

impl From<EventRow> for DomainEvent {
    fn from(row: EventRow) -> Self {
        // Stored metadata is always a JSON object; anything else is treated
        // as empty rather than failing the whole replay.
        let metadata = match row.metadata {
            JsonValue::Object(map) => map,
            _ => EventMetadata::new(),
        };

        DomainEvent::from_parts(
            EventId::from_uuid(row.event_id),
            row.event_type,
            row.aggregate_type,
            row.aggregate_id,
            row.occurred_at,
            row.event_data,
            metadata,
        )
    }
}
