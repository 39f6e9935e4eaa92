//! Integration tests for the Postgres event store.
//!
//! Runs against the database named by `DATABASE_URL`. When the variable is
//! unset each test returns early, so the suite stays green on machines
//! without Postgres. Source ids are unique per run so tests can share one
//! database.

use std::sync::Arc;

use hookgate_core::{EventStore, PostgresEventStore, ValidatedEvent, WriteOutcome};
use serde_json::json;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::sync::OnceCell;
use uuid::Uuid;

static SCHEMA: OnceCell<()> = OnceCell::const_new();

async fn test_store() -> Option<(PostgresEventStore, PgPool)> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres store test");
        return None;
    };

    let pool = PgPoolOptions::new().max_connections(4).connect(&url).await.unwrap();
    let store = PostgresEventStore::new(pool.clone());

    // DDL runs once per test binary; parallel CREATE TABLE IF NOT EXISTS can race.
    SCHEMA.get_or_init(|| async { store.migrate().await.unwrap() }).await;

    Some((store, pool))
}

fn event(source_id: Option<&str>) -> ValidatedEvent {
    let payload = match source_id {
        Some(id) => json!({ "id": id, "type": "payment_captured" }),
        None => json!({ "type": "payment_captured" }),
    };
    ValidatedEvent::parse(payload.to_string().as_bytes()).unwrap()
}

async fn count_by_source(pool: &PgPool, source_id: &str) -> i64 {
    sqlx::query_scalar("SELECT count(*) FROM webhook_events WHERE source_event_id = $1")
        .bind(source_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn store_health_check() {
    let Some((store, _pool)) = test_store().await else { return };

    assert!(store.health_check().await.is_ok());
}

#[tokio::test]
async fn migrate_is_idempotent() {
    let Some((store, _pool)) = test_store().await else { return };

    store.migrate().await.unwrap();
    store.migrate().await.unwrap();
}

#[tokio::test]
async fn new_event_is_inserted_with_payload() {
    let Some((store, pool)) = test_store().await else { return };
    let source_id = format!("evt_{}", Uuid::new_v4());
    let event = event(Some(&source_id));
    let id = event.id.0;

    assert_eq!(store.write(event).await.unwrap(), WriteOutcome::Inserted);

    let (stored_source, event_type, payload): (Option<String>, Option<String>, serde_json::Value) =
        sqlx::query_as(
            "SELECT source_event_id, event_type, payload FROM webhook_events WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(stored_source.as_deref(), Some(source_id.as_str()));
    assert_eq!(event_type.as_deref(), Some("payment_captured"));
    assert_eq!(payload["id"], source_id.as_str());
}

#[tokio::test]
async fn redelivered_event_is_stored_once() {
    let Some((store, pool)) = test_store().await else { return };
    let source_id = format!("evt_{}", Uuid::new_v4());

    assert_eq!(store.write(event(Some(&source_id))).await.unwrap(), WriteOutcome::Inserted);
    assert_eq!(store.write(event(Some(&source_id))).await.unwrap(), WriteOutcome::Duplicate);
    assert_eq!(store.write(event(Some(&source_id))).await.unwrap(), WriteOutcome::Duplicate);

    assert_eq!(count_by_source(&pool, &source_id).await, 1);
}

#[tokio::test]
async fn events_without_source_id_are_never_deduplicated() {
    let Some((store, pool)) = test_store().await else { return };

    let mut ids = Vec::new();
    for _ in 0..3 {
        let event = event(None);
        ids.push(event.id.0);
        assert_eq!(store.write(event).await.unwrap(), WriteOutcome::Inserted);
    }

    let stored: i64 = sqlx::query_scalar("SELECT count(*) FROM webhook_events WHERE id = ANY($1)")
        .bind(&ids)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(stored, 3);
}

#[tokio::test]
async fn concurrent_redeliveries_store_one_row() {
    let Some((store, pool)) = test_store().await else { return };
    let store = Arc::new(store);
    let source_id = format!("evt_{}", Uuid::new_v4());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            let event = event(Some(&source_id));
            tokio::spawn(async move { store.write(event).await })
        })
        .collect();

    let mut inserted = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() == WriteOutcome::Inserted {
            inserted += 1;
        }
    }

    assert_eq!(inserted, 1);
    assert_eq!(count_by_source(&pool, &source_id).await, 1);
}
