use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use super::{AuditError, AuditRecord, AuditSink};

/// Postgres-backed audit sink.
///
/// Shares the pool built from `StoreConfig` with the event log.
#[derive(Debug, Clone)]
pub struct PostgresAuditSink {
    pool: PgPool,
}

impl PostgresAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    #[instrument(
        skip(self, record),
        fields(
            action_type = %record.action_type,
            resource_type = %record.resource_type,
            resource_id = %record.resource_id
        ),
        err
    )]
    async fn record(&self, record: AuditRecord) -> Result<(), AuditError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                actor_id,
                action_type,
                resource_type,
                resource_id,
                details
            )
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.actor_id.as_str())
        .bind(&record.action_type)
        .bind(&record.resource_type)
        .bind(&record.resource_id)
        .bind(&record.details)
        .execute(&self.pool)
        .await
        .map_err(|e| AuditError::Write(format!("database error: {e}")))?;

        Ok(())
    }
}
