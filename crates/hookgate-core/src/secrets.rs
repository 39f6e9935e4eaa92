//! Secret material and the providers that load it.
//!
//! Secrets are loaded lazily on the first request and cached for the life of
//! the process. A failed load is not cached, so the next request retries.

use std::{fmt, future::Future, pin::Pin, sync::Arc};

use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::error::SecretError;

/// Default environment variable holding the expected authorization token.
pub const DEFAULT_AUTH_TOKEN_VAR: &str = "CKO_WEBHOOK_AUTH_TOKEN";

/// Default environment variable holding the signature key.
pub const DEFAULT_SIGNING_KEY_VAR: &str = "CKO_SIGNATURE_KEY";

/// Boxed future returned by secret providers.
pub type SecretFuture<'a> =
    Pin<Box<dyn Future<Output = Result<SecretMaterial, SecretError>> + Send + 'a>>;

/// Authorization token and signing key.
///
/// Immutable once constructed. `Debug` redacts both values.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretMaterial {
    auth_token: String,
    signing_key: String,
}

impl SecretMaterial {
    /// Creates secret material, rejecting empty values.
    ///
    /// # Errors
    ///
    /// Returns `SecretError::Empty` if either value is empty.
    pub fn new(
        auth_token: impl Into<String>,
        signing_key: impl Into<String>,
    ) -> Result<Self, SecretError> {
        let auth_token = auth_token.into();
        let signing_key = signing_key.into();

        if auth_token.is_empty() {
            return Err(SecretError::Empty { name: "auth_token".to_string() });
        }
        if signing_key.is_empty() {
            return Err(SecretError::Empty { name: "signing_key".to_string() });
        }

        Ok(Self { auth_token, signing_key })
    }

    /// Expected authorization token.
    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    /// HMAC key bytes.
    pub fn signing_key(&self) -> &[u8] {
        self.signing_key.as_bytes()
    }
}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretMaterial")
            .field("auth_token", &"[REDACTED]")
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}

/// Source of secret material.
///
/// Implementations may be slow (remote secret stores); callers go through
/// [`CachedSecrets`] so a provider is hit once per process in the common
/// case.
pub trait SecretProvider: Send + Sync + 'static {
    /// Loads the current secret material.
    fn load(&self) -> SecretFuture<'_>;
}

/// Reads secrets from environment variables at load time.
#[derive(Debug, Clone)]
pub struct EnvSecretProvider {
    auth_token_var: String,
    signing_key_var: String,
}

impl EnvSecretProvider {
    /// Creates a provider reading the given variable names.
    pub fn new(auth_token_var: impl Into<String>, signing_key_var: impl Into<String>) -> Self {
        Self { auth_token_var: auth_token_var.into(), signing_key_var: signing_key_var.into() }
    }

    fn read(name: &str) -> Result<String, SecretError> {
        let value =
            std::env::var(name).map_err(|_| SecretError::Missing { name: name.to_string() })?;
        if value.is_empty() {
            return Err(SecretError::Empty { name: name.to_string() });
        }
        Ok(value)
    }
}

impl Default for EnvSecretProvider {
    fn default() -> Self {
        Self::new(DEFAULT_AUTH_TOKEN_VAR, DEFAULT_SIGNING_KEY_VAR)
    }
}

impl SecretProvider for EnvSecretProvider {
    fn load(&self) -> SecretFuture<'_> {
        Box::pin(async move {
            let auth_token = Self::read(&self.auth_token_var)?;
            let signing_key = Self::read(&self.signing_key_var)?;
            SecretMaterial::new(auth_token, signing_key)
        })
    }
}

/// Serves a fixed set of secrets.
#[derive(Debug, Clone)]
pub struct StaticSecretProvider {
    material: SecretMaterial,
}

impl StaticSecretProvider {
    /// Creates a provider that always returns `material`.
    pub fn new(material: SecretMaterial) -> Self {
        Self { material }
    }
}

impl SecretProvider for StaticSecretProvider {
    fn load(&self) -> SecretFuture<'_> {
        let material = self.material.clone();
        Box::pin(async move { Ok(material) })
    }
}

/// Process-wide, load-once cache in front of a [`SecretProvider`].
pub struct CachedSecrets {
    provider: Arc<dyn SecretProvider>,
    cell: OnceCell<Arc<SecretMaterial>>,
}

impl CachedSecrets {
    /// Wraps a provider. Nothing is loaded until the first [`get`](Self::get).
    pub fn new(provider: Arc<dyn SecretProvider>) -> Self {
        Self { provider, cell: OnceCell::new() }
    }

    /// Wraps already-loaded material.
    pub fn preloaded(material: SecretMaterial) -> Self {
        Self {
            provider: Arc::new(StaticSecretProvider::new(material.clone())),
            cell: OnceCell::new_with(Some(Arc::new(material))),
        }
    }

    /// Returns the cached material, loading it on first use.
    ///
    /// Concurrent first callers wait on a single load.
    ///
    /// # Errors
    ///
    /// Returns the provider's error; the failure is not cached.
    #[instrument(name = "load_secrets", skip(self), level = "debug")]
    pub async fn get(&self) -> Result<Arc<SecretMaterial>, SecretError> {
        if let Some(material) = self.cell.get() {
            return Ok(material.clone());
        }

        let material = self
            .cell
            .get_or_try_init(|| async {
                debug!("Loading secret material from provider");
                let material = self.provider.load().await?;
                info!("Secret material loaded");
                Ok::<_, SecretError>(Arc::new(material))
            })
            .await?;

        Ok(material.clone())
    }

    /// Whether secret material has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}

impl fmt::Debug for CachedSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedSecrets").field("loaded", &self.is_loaded()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingProvider {
        loads: AtomicUsize,
        fail_first: bool,
    }

    impl SecretProvider for CountingProvider {
        fn load(&self) -> SecretFuture<'_> {
            Box::pin(async move {
                let n = self.loads.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                if self.fail_first && n == 0 {
                    return Err(SecretError::Provider("transient".to_string()));
                }
                SecretMaterial::new("token", "key")
            })
        }
    }

    #[test]
    fn secret_material_rejects_empty_values() {
        assert!(matches!(SecretMaterial::new("", "key"), Err(SecretError::Empty { .. })));
        assert!(matches!(SecretMaterial::new("token", ""), Err(SecretError::Empty { .. })));
    }

    #[test]
    fn secret_material_debug_is_redacted() {
        let material = SecretMaterial::new("tok-123", "key-456").unwrap();
        let rendered = format!("{material:?}");

        assert!(!rendered.contains("tok-123"));
        assert!(!rendered.contains("key-456"));
    }

    #[tokio::test]
    async fn concurrent_loads_hit_provider_once() {
        let provider = Arc::new(CountingProvider { loads: AtomicUsize::new(0), fail_first: false });
        let secrets = Arc::new(CachedSecrets::new(provider.clone()));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let secrets = secrets.clone();
                tokio::spawn(async move { secrets.get().await })
            })
            .collect();

        for handle in handles {
            let material = handle.await.unwrap().unwrap();
            assert_eq!(material.auth_token(), "token");
        }

        assert_eq!(provider.loads.load(Ordering::SeqCst), 1);
        assert!(secrets.is_loaded());
    }

    #[tokio::test]
    async fn failed_load_is_retried() {
        let provider = Arc::new(CountingProvider { loads: AtomicUsize::new(0), fail_first: true });
        let secrets = CachedSecrets::new(provider.clone());

        assert!(secrets.get().await.is_err());
        assert!(!secrets.is_loaded());

        assert!(secrets.get().await.is_ok());
        assert_eq!(provider.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn env_provider_reports_missing_variable() {
        let provider = EnvSecretProvider::new(
            "HOOKGATE_TEST_UNSET_TOKEN_VAR",
            "HOOKGATE_TEST_UNSET_KEY_VAR",
        );

        let err = provider.load().await.unwrap_err();
        assert!(matches!(err, SecretError::Missing { name } if name == "HOOKGATE_TEST_UNSET_TOKEN_VAR"));
    }

    #[tokio::test]
    async fn preloaded_cache_is_ready() {
        let secrets = CachedSecrets::preloaded(SecretMaterial::new("t", "k").unwrap());
        assert!(secrets.is_loaded());
        assert_eq!(secrets.get().await.unwrap().signing_key(), b"k");
    }
}
