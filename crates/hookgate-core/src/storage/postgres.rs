//! PostgreSQL event store.
//!
//! Events land in `webhook_events`. The provider event id carries a unique
//! constraint, and inserts use `ON CONFLICT DO NOTHING` so a redelivered
//! event is reported as a duplicate rather than an error.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::{debug, instrument};

use super::{EventStore, StoreFuture, WriteOutcome};
use crate::{error::StoreError, models::ValidatedEvent};

/// Event store backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: Arc<PgPool>,
}

impl PostgresEventStore {
    /// Creates a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Returns a reference to the database pool.
    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    /// Creates the events table and indexes if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if any DDL statement fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS webhook_events (
                id UUID PRIMARY KEY,
                source_event_id TEXT UNIQUE,
                event_type TEXT,
                payload JSONB NOT NULL,
                received_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&*self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_webhook_events_type
            ON webhook_events(event_type, received_at DESC)
            ",
        )
        .execute(&*self.pool)
        .await?;

        Ok(())
    }

    #[instrument(
        name = "persist_event",
        skip(self, event),
        fields(event_id = %event.id, event_type = event.event_type.as_deref().unwrap_or("unknown"))
    )]
    async fn insert(&self, event: ValidatedEvent) -> Result<WriteOutcome, StoreError> {
        let result = sqlx::query(
            r"
            INSERT INTO webhook_events (id, source_event_id, event_type, payload, received_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (source_event_id) DO NOTHING
            ",
        )
        .bind(event.id.0)
        .bind(event.source_event_id)
        .bind(event.event_type)
        .bind(event.payload)
        .bind(event.received_at)
        .execute(&*self.pool)
        .await?;

        if result.rows_affected() == 0 {
            debug!("Provider event already stored");
            return Ok(WriteOutcome::Duplicate);
        }

        Ok(WriteOutcome::Inserted)
    }
}

impl EventStore for PostgresEventStore {
    fn write(&self, event: ValidatedEvent) -> StoreFuture<'_, WriteOutcome> {
        Box::pin(self.insert(event))
    }

    fn health_check(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let _: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&*self.pool).await?;
            Ok(())
        })
    }
}
