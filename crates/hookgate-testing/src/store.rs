//! Event store double with failure injection.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use hookgate_core::{
    storage::StoreFuture, EventStore, StoreError, ValidatedEvent, WriteOutcome,
};
use tokio::sync::Mutex;

/// Failure a scripted store can be told to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailure {
    /// The store cannot be reached.
    Unavailable,
    /// The database reports an error.
    Database,
    /// The store refuses the event.
    Rejected,
    /// The write panics.
    Panic,
}

/// Event store that records every write and fails on demand.
///
/// Queued failures are consumed one per write. With no queued failure the
/// write succeeds and the event is kept.
#[derive(Debug, Default)]
pub struct ScriptedEventStore {
    events: Mutex<Vec<ValidatedEvent>>,
    failures: Mutex<VecDeque<StoreFailure>>,
    attempts: AtomicUsize,
    unhealthy: AtomicBool,
    write_delay: Option<Duration>,
}

impl ScriptedEventStore {
    /// Creates a store that accepts every write.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a store whose first write fails with `failure`.
    pub fn failing_with(failure: StoreFailure) -> Arc<Self> {
        let mut store = Self::default();
        store.failures.get_mut().push_back(failure);
        Arc::new(store)
    }

    /// Creates a store whose writes each take `delay` before landing.
    pub fn with_write_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self { write_delay: Some(delay), ..Self::default() })
    }

    /// Queues a failure for a later write.
    pub async fn fail_next(&self, failure: StoreFailure) {
        self.failures.lock().await.push_back(failure);
    }

    /// Makes health checks report the store as unreachable.
    pub fn set_unhealthy(&self, unhealthy: bool) {
        self.unhealthy.store(unhealthy, Ordering::SeqCst);
    }

    /// Events written successfully.
    pub async fn events(&self) -> Vec<ValidatedEvent> {
        self.events.lock().await.clone()
    }

    /// Number of write calls, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl EventStore for ScriptedEventStore {
    fn write(&self, event: ValidatedEvent) -> StoreFuture<'_, WriteOutcome> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.write_delay {
                tokio::time::sleep(delay).await;
            }

            let failure = self.failures.lock().await.pop_front();
            match failure {
                Some(StoreFailure::Unavailable) => {
                    return Err(StoreError::Unavailable("connection refused".to_string()));
                },
                Some(StoreFailure::Database) => {
                    return Err(StoreError::Database("deadlock detected".to_string()));
                },
                Some(StoreFailure::Rejected) => {
                    return Err(StoreError::Rejected("payload too large".to_string()));
                },
                Some(StoreFailure::Panic) => panic!("scripted store panic"),
                None => {},
            }

            self.events.lock().await.push(event);
            Ok(WriteOutcome::Inserted)
        })
    }

    fn health_check(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if self.unhealthy.load(Ordering::SeqCst) {
                Err(StoreError::Unavailable("scripted outage".to_string()))
            } else {
                Ok(())
            }
        })
    }
}
