//! Event store abstraction for verified webhook events.
//!
//! The pipeline only ever hands a [`ValidatedEvent`] to an [`EventStore`].
//! Durability and idempotency are the store's concern: delivery is
//! at-least-once, so both implementations absorb a redelivered provider
//! event id instead of failing it.

use std::{future::Future, pin::Pin};

use crate::{error::StoreError, models::ValidatedEvent};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;

/// Boxed future returned by event store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Result of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The event was stored.
    Inserted,
    /// An event with the same provider id was already stored.
    Duplicate,
}

/// Persistence operations required by the ingestion pipeline.
pub trait EventStore: Send + Sync + 'static {
    /// Persists a verified event.
    ///
    /// Takes the event by value; it does not outlive the call.
    fn write(&self, event: ValidatedEvent) -> StoreFuture<'_, WriteOutcome>;

    /// Verifies the store is reachable.
    fn health_check(&self) -> StoreFuture<'_, ()>;
}
