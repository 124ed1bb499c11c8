//! PostgreSQL implementation of EventStore

use std::time::Duration;

use async_trait::async_trait;
use phoenix_core::{Event, EventStore, NewEvent, StoreError};
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};

use crate::models::EventRow;

/// Embedded schema migrations
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const EVENT_COLUMNS: &str =
    "event_id, stream_id, version, event_type, payload, producer, causation_id, occurred_at";

/// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL event store
///
/// ```ignore
/// let store = PostgresEventStore::connect("postgres://localhost/phoenix", 10).await?;
/// store.migrate().await?;
/// ```
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with a bounded pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply embedded migrations
    pub async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("migration failed: {e}")))?;
        info!("Event store migrations applied");
        Ok(())
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::unavailable(err.to_string()),
        other => StoreError::Database(other.to_string()),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION))
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[instrument(skip(self, event), fields(stream_id = %event.stream_id, event_id = %event.event_id))]
    async fn append(&self, event: NewEvent) -> Result<Event, StoreError> {
        event.validate()?;
        let payload = serde_json::Value::Object(event.payload.clone());

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Serialize appends per stream for the rest of the transaction
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&event.stream_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let existing: Option<EventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM phoenix_events WHERE event_id = $1"
        ))
        .bind(event.event_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if let Some(row) = existing {
            tx.commit().await.map_err(map_sqlx_error)?;
            debug!(version = row.version, "Event already stored");
            return row.try_into();
        }

        let next_version: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM phoenix_events WHERE stream_id = $1",
        )
        .bind(&event.stream_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let inserted: Result<EventRow, sqlx::Error> = sqlx::query_as(&format!(
            r#"
            INSERT INTO phoenix_events
                (event_id, stream_id, version, event_type, payload, producer, causation_id, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event.event_id)
        .bind(&event.stream_id)
        .bind(next_version)
        .bind(&event.event_type)
        .bind(&payload)
        .bind(&event.producer)
        .bind(event.causation_id)
        .bind(event.timestamp)
        .fetch_one(&mut *tx)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(err) if is_unique_violation(&err) => {
                return Err(StoreError::VersionConflict {
                    stream_id: event.stream_id,
                    version: next_version,
                });
            }
            Err(err) => {
                error!(error = %err, "Failed to append event");
                return Err(map_sqlx_error(err));
            }
        };

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(version = row.version, "Event appended");
        row.try_into()
    }

    #[instrument(skip(self))]
    async fn read_stream(
        &self,
        stream_id: &str,
        since_version: i64,
        limit: usize,
    ) -> Result<Vec<Event>, StoreError> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM phoenix_events
            WHERE stream_id = $1 AND version > $2
            ORDER BY version ASC
            LIMIT $3
            "#
        ))
        .bind(stream_id)
        .bind(since_version)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(Event::try_from).collect()
    }

    async fn list_streams(&self) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar("SELECT DISTINCT stream_id FROM phoenix_events ORDER BY stream_id")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn head_version(&self, stream_id: &str) -> Result<i64, StoreError> {
        sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM phoenix_events WHERE stream_id = $1")
            .bind(stream_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            StoreError::Database(_)
        ));
    }

    #[test]
    fn test_row_not_found_is_not_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
