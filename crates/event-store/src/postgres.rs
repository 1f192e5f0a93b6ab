use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    EntityId, EventEnvelope, EventId, NewEvent, Result, StoreError, Version,
    store::{EventStore, EventStream, conflict, validate_events_for_append},
};

const UNIQUE_STREAM_VERSION: &str = "unique_stream_version";

/// PostgreSQL-backed event store implementation.
///
/// The `UNIQUE (stream_id, version)` constraint is the serialization point
/// for concurrent writers: whichever transaction inserts a sequence number
/// first wins, the other sees a unique violation reported as a conflict.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL event store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations for both the event and state stores.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<EventEnvelope> {
        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: HashMap<String, serde_json::Value> = serde_json::from_value(metadata_json)?;

        Ok(EventEnvelope {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            stream_id: EntityId::from(row.try_get::<String, _>("stream_id")?),
            aggregate_type: row.try_get("aggregate_type")?,
            event_type: row.try_get("event_type")?,
            version: Version::new(row.try_get("version")?),
            recorded_at: row.try_get("recorded_at")?,
            payload: row.try_get("payload")?,
            metadata,
        })
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[tracing::instrument(skip(self, events), fields(count = events.len()))]
    async fn append(
        &self,
        stream_id: &EntityId,
        expected_version: Version,
        events: Vec<NewEvent>,
    ) -> Result<Version> {
        validate_events_for_append(&events)?;

        let mut tx = self.pool.begin().await?;

        // Serialize writers of this stream until commit
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(stream_id.as_str())
            .execute(&mut *tx)
            .await?;

        let current: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE stream_id = $1")
                .bind(stream_id.as_str())
                .fetch_one(&mut *tx)
                .await?;
        let current_version = Version::new(current.unwrap_or(0));

        if current_version != expected_version {
            return Err(conflict(stream_id, expected_version, current_version));
        }

        let appended = events.len();
        let recorded_at = Utc::now();
        let mut version = current_version;
        for event in events {
            version = version.next();
            let metadata_json = serde_json::to_value(&event.metadata)?;

            let inserted = sqlx::query(
                r#"
                INSERT INTO events (id, stream_id, aggregate_type, event_type, version, recorded_at, payload, metadata)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(event.event_id.as_uuid())
            .bind(stream_id.as_str())
            .bind(&event.aggregate_type)
            .bind(&event.event_type)
            .bind(version.as_i64())
            .bind(recorded_at)
            .bind(&event.payload)
            .bind(metadata_json)
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(_) => {}
                Err(sqlx::Error::Database(db_err))
                    if db_err.constraint() == Some(UNIQUE_STREAM_VERSION) =>
                {
                    // Only reachable by a writer that bypasses the stream lock
                    drop(tx);
                    let actual = self
                        .stream_version(stream_id)
                        .await
                        .unwrap_or(version);
                    return Err(conflict(stream_id, expected_version, actual));
                }
                Err(e) => return Err(StoreError::Database(e)),
            }
        }

        tx.commit().await?;
        metrics::counter!("event_store_events_appended_total").increment(appended as u64);
        Ok(version)
    }

    async fn read_stream(
        &self,
        stream_id: &EntityId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(
            r#"
            SELECT id, stream_id, aggregate_type, event_type, version, recorded_at, payload, metadata
            FROM events
            WHERE stream_id = $1 AND version >= $2
            ORDER BY version ASC
            "#,
        )
        .bind(stream_id.as_str())
        .bind(from_version.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn stream_version(&self, stream_id: &EntityId) -> Result<Version> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE stream_id = $1")
                .bind(stream_id.as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(Version::new(version.unwrap_or(0)))
    }

    async fn read_all(&self) -> Result<EventStream> {
        use futures_util::StreamExt;

        let stream = sqlx::query(
            r#"
            SELECT id, stream_id, aggregate_type, event_type, version, recorded_at, payload, metadata
            FROM events
            ORDER BY global_position ASC
            "#,
        )
        .fetch(&self.pool)
        .map(|result| match result {
            Ok(row) => Self::row_to_event(row),
            Err(e) => Err(StoreError::Database(e)),
        });

        Ok(Box::pin(stream))
    }
}
