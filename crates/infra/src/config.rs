//! Storage configuration.
//!
//! Configuration is read from the environment once at process start and the
//! resulting pool is injected into the stores that need it. There is no
//! lazily-initialized global client: a process with missing configuration
//! fails fast during bootstrap instead of on the first business operation.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::event_store::EventStoreError;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Connection settings for the event and audit storage.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl StoreConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Read configuration from `DATABASE_URL` and
    /// `DATABASE_MAX_CONNECTIONS`.
    pub fn from_env() -> Result<Self, EventStoreError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| EventStoreError::Configuration("DATABASE_URL is not set".to_string()))?;

        let max_connections =
            parse_max_connections(std::env::var("DATABASE_MAX_CONNECTIONS").ok())?;

        Ok(Self {
            database_url,
            max_connections,
        })
    }

    /// Build the connection pool.
    ///
    /// Called once during bootstrap; connection failure is a configuration
    /// error (bad endpoint or credentials) and is not retried here.
    pub async fn connect(&self) -> Result<PgPool, EventStoreError> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.database_url)
            .await
            .map_err(|e| {
                EventStoreError::Configuration(format!(
                    "failed to connect to event storage: {e}"
                ))
            })
    }
}

fn parse_max_connections(raw: Option<String>) -> Result<u32, EventStoreError> {
    match raw {
        Some(value) => value.parse().map_err(|e| {
            EventStoreError::Configuration(format!("DATABASE_MAX_CONNECTIONS: {e}"))
        }),
        None => Ok(DEFAULT_MAX_CONNECTIONS),
    }
}
