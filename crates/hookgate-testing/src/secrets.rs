//! Secret provider that counts loads and can be told to fail.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use hookgate_core::{
    secrets::SecretFuture, CachedSecrets, SecretError, SecretMaterial, SecretProvider,
};

use crate::test_secret_material;

/// Provider returning fixed material while counting how often it is asked.
#[derive(Debug)]
pub struct CountingSecretProvider {
    material: SecretMaterial,
    loads: AtomicUsize,
    failing: AtomicBool,
    delay: Option<Duration>,
}

impl CountingSecretProvider {
    /// Provider returning the standard test secrets.
    pub fn new() -> Arc<Self> {
        Self::with_material(test_secret_material())
    }

    /// Provider returning `material`.
    pub fn with_material(material: SecretMaterial) -> Arc<Self> {
        Arc::new(Self {
            material,
            loads: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay: None,
        })
    }

    /// Provider that takes `delay` to answer each load.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            material: test_secret_material(),
            loads: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay: Some(delay),
        })
    }

    /// Provider that fails every load until [`Self::recover`] is called.
    pub fn failing() -> Arc<Self> {
        let provider = Self::new();
        provider.failing.store(true, Ordering::SeqCst);
        provider
    }

    /// Makes subsequent loads succeed.
    pub fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    /// Number of load calls so far, failed ones included.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Cache backed by this provider.
    pub fn cache(self: &Arc<Self>) -> Arc<CachedSecrets> {
        Arc::new(CachedSecrets::new(self.clone()))
    }
}

impl SecretProvider for CountingSecretProvider {
    fn load(&self) -> SecretFuture<'_> {
        Box::pin(async move {
            self.loads.fetch_add(1, Ordering::SeqCst);
            match self.delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => tokio::task::yield_now().await,
            }

            if self.failing.load(Ordering::SeqCst) {
                return Err(SecretError::Provider("secret backend unreachable".to_string()));
            }
            Ok(self.material.clone())
        })
    }
}
