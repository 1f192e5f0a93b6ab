//! Storage engine selection.

use std::sync::Arc;

use event_store::{
    EventStore, InMemoryEventStore, InMemoryStateStore, PostgresEventStore, PostgresStateStore,
    StateStore,
};
use sqlx::postgres::PgPoolOptions;

use crate::config::Config;
use crate::error::AppError;

/// The event store and record store every repository is built on.
#[derive(Clone)]
pub struct Stores {
    pub events: Arc<dyn EventStore>,
    pub records: Arc<dyn StateStore>,
}

impl Stores {
    pub fn new(events: Arc<dyn EventStore>, records: Arc<dyn StateStore>) -> Self {
        Self { events, records }
    }

    /// Process-local stores; contents are lost on exit.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(InMemoryStateStore::new()),
        )
    }

    /// PostgreSQL when `DATABASE_URL` is set, in-memory otherwise.
    pub async fn from_config(config: &Config) -> Result<Self, AppError> {
        let Some(url) = config.database_url.as_deref() else {
            tracing::info!("no DATABASE_URL, using in-memory stores");
            return Ok(Self::in_memory());
        };

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await?;

        let events = PostgresEventStore::new(pool.clone());
        events.run_migrations().await?;
        tracing::info!(max_connections = config.max_connections, "connected to PostgreSQL");

        Ok(Self::new(
            Arc::new(events),
            Arc::new(PostgresStateStore::new(pool)),
        ))
    }
}
