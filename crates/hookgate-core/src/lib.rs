//! Core domain models and collaborator interfaces.
//!
//! Provides the transport-neutral request model, the pipeline error
//! taxonomy, secret material with its load-once cache, and the event store
//! abstraction with PostgreSQL and in-memory implementations.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod secrets;
pub mod storage;

pub use error::{ErrorKind, GateError, Result, SecretError, StoreError};
pub use models::{
    BodyEncoding, BodyFault, Credential, EventId, InboundRequest, SignatureToken, ValidatedEvent,
    AUTHORIZATION_HEADER, SIGNATURE_HEADER,
};
pub use secrets::{
    CachedSecrets, EnvSecretProvider, SecretMaterial, SecretProvider, StaticSecretProvider,
};
pub use storage::{EventStore, InMemoryEventStore, PostgresEventStore, WriteOutcome};
