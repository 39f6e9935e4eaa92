//! In-process event store for local development and tests.

use tokio::sync::RwLock;
use tracing::debug;

use super::{EventStore, StoreFuture, WriteOutcome};
use crate::models::ValidatedEvent;

/// Keeps events in memory, deduplicating on the provider event id.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: RwLock<Vec<ValidatedEvent>>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every stored event in insertion order.
    pub async fn events(&self) -> Vec<ValidatedEvent> {
        self.events.read().await.clone()
    }

    /// Number of stored events.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    /// Whether nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

impl EventStore for InMemoryEventStore {
    fn write(&self, event: ValidatedEvent) -> StoreFuture<'_, WriteOutcome> {
        Box::pin(async move {
            let mut events = self.events.write().await;

            let duplicate = event.source_event_id.is_some()
                && events.iter().any(|e| e.source_event_id == event.source_event_id);
            if duplicate {
                debug!(event_id = %event.id, "Duplicate provider event ignored");
                return Ok(WriteOutcome::Duplicate);
            }

            events.push(event);
            Ok(WriteOutcome::Inserted)
        })
    }

    fn health_check(&self) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}
