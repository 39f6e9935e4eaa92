//! Test infrastructure for the hookgate ingestion gate.
//!
//! Provides signed request builders, a scripted event store with failure
//! injection, and a counting secret provider. Nothing here talks to a real
//! database or reads the process environment.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::sync::Arc;

use hookgate_core::{CachedSecrets, SecretMaterial};

pub mod fixtures;
pub mod secrets;
pub mod store;

pub use fixtures::{sign_body, WebhookRequestBuilder, TEST_AUTH_TOKEN, TEST_SIGNING_KEY};
pub use secrets::CountingSecretProvider;
pub use store::{ScriptedEventStore, StoreFailure};

/// Secret material matching [`TEST_AUTH_TOKEN`] and [`TEST_SIGNING_KEY`].
pub fn test_secret_material() -> SecretMaterial {
    SecretMaterial::new(TEST_AUTH_TOKEN, TEST_SIGNING_KEY)
        .expect("test secret material must be valid")
}

/// Preloaded secret cache holding the test secrets.
pub fn test_secrets() -> Arc<CachedSecrets> {
    Arc::new(CachedSecrets::preloaded(test_secret_material()))
}
