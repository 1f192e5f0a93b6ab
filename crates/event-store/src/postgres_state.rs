use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    EntityId, Result, Version,
    state::{StateRecord, StateStore},
    store::conflict,
};

/// PostgreSQL-backed state store.
///
/// Shares the pool and migrations with [`crate::PostgresEventStore`]. Writes
/// lock the row with `SELECT ... FOR UPDATE` before comparing versions.
#[derive(Clone)]
pub struct PostgresStateStore {
    pool: PgPool,
}

impl PostgresStateStore {
    /// Creates a new PostgreSQL state store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: PgRow) -> Result<StateRecord> {
        Ok(StateRecord {
            id: EntityId::from(row.try_get::<String, _>("id")?),
            entity_type: row.try_get("entity_type")?,
            version: Version::new(row.try_get("version")?),
            state: row.try_get("state")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl StateStore for PostgresStateStore {
    async fn load(&self, entity_type: &str, id: &EntityId) -> Result<Option<StateRecord>> {
        let row = sqlx::query(
            r#"
            SELECT entity_type, id, version, state, updated_at
            FROM records
            WHERE entity_type = $1 AND id = $2
            "#,
        )
        .bind(entity_type)
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    #[tracing::instrument(skip(self, state))]
    async fn save(
        &self,
        entity_type: &str,
        id: &EntityId,
        expected_version: Version,
        state: serde_json::Value,
    ) -> Result<Version> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query(
            "SELECT version, state FROM records WHERE entity_type = $1 AND id = $2 FOR UPDATE",
        )
        .bind(entity_type)
        .bind(id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let version = match existing {
            None => {
                if expected_version != Version::initial() {
                    return Err(conflict(id, expected_version, Version::initial()));
                }

                let inserted = sqlx::query(
                    r#"
                    INSERT INTO records (entity_type, id, version, state, updated_at)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (entity_type, id) DO NOTHING
                    "#,
                )
                .bind(entity_type)
                .bind(id.as_str())
                .bind(Version::first().as_i64())
                .bind(&state)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;

                // A concurrent insert won the race
                if inserted.rows_affected() == 0 {
                    return Err(conflict(id, expected_version, Version::first()));
                }
                Version::first()
            }
            Some(row) => {
                let current_version = Version::new(row.try_get("version")?);
                if current_version != expected_version {
                    return Err(conflict(id, expected_version, current_version));
                }

                let current_state: serde_json::Value = row.try_get("state")?;
                if current_state == state {
                    return Ok(current_version);
                }

                let version = current_version.next();
                sqlx::query(
                    r#"
                    UPDATE records
                    SET version = $3, state = $4, updated_at = $5
                    WHERE entity_type = $1 AND id = $2
                    "#,
                )
                .bind(entity_type)
                .bind(id.as_str())
                .bind(version.as_i64())
                .bind(&state)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
                version
            }
        };

        tx.commit().await?;
        Ok(version)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(
        &self,
        entity_type: &str,
        id: &EntityId,
        expected_version: Version,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let current: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM records WHERE entity_type = $1 AND id = $2 FOR UPDATE",
        )
        .bind(entity_type)
        .bind(id.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        let current_version = Version::new(current.unwrap_or(0));

        if current_version != expected_version {
            return Err(conflict(id, expected_version, current_version));
        }

        sqlx::query("DELETE FROM records WHERE entity_type = $1 AND id = $2")
            .bind(entity_type)
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
