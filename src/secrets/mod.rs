//! Secret lifecycle management.
//!
//! # Data Flow
//! ```text
//! SecretProvider::get(secret_id)
//!     → cache hit: return cached value (no store contact)
//!     → cache miss: SecretStore::fetch → cache for process lifetime
//! ```
//!
//! # Design Decisions
//! - Lazy init-once: the first successful fetch per secret id is cached
//!   until the process is replaced; there is no invalidation path, so a
//!   rotated secret takes effect on instance replacement
//! - Concurrent first calls may race and fetch the same value
//!   redundantly; the fetch is idempotent and side-effect-free, so no
//!   init lock is taken and the first cached value wins
//! - The store is a trait seam so handlers can be tested with a double

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::GatewayError;

/// Errors produced by a backing secret store.
#[derive(Debug, Error)]
pub enum SecretStoreError {
    /// The store has no entry for the requested id.
    #[error("secret {0} not found")]
    NotFound(String),

    /// The store could not be reached or answered malformed data.
    #[error("secret store unreachable: {0}")]
    Unreachable(String),
}

/// Backing store for secrets.
pub trait SecretStore: Send + Sync {
    /// Fetch the current value of a secret. Must be side-effect-free;
    /// the provider may call it redundantly under concurrency.
    fn fetch(&self, secret_id: &str) -> Result<String, SecretStoreError>;
}

/// Secret store backed by process environment variables. The secret id
/// is the variable name, matching how the deployment injects secrets.
#[derive(Debug, Default)]
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn fetch(&self, secret_id: &str) -> Result<String, SecretStoreError> {
        match std::env::var(secret_id) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => Err(SecretStoreError::NotFound(secret_id.to_string())),
        }
    }
}

/// Fixed-content store for tests and local development.
#[derive(Debug, Default)]
pub struct StaticSecretStore {
    entries: HashMap<String, String>,
}

impl StaticSecretStore {
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }
}

impl SecretStore for StaticSecretStore {
    fn fetch(&self, secret_id: &str) -> Result<String, SecretStoreError> {
        self.entries
            .get(secret_id)
            .cloned()
            .ok_or_else(|| SecretStoreError::NotFound(secret_id.to_string()))
    }
}

/// A secret value cached for the lifetime of the process.
#[derive(Debug, Clone)]
struct CachedSecret {
    value: String,
    #[allow(dead_code)]
    fetched_at: DateTime<Utc>,
}

/// Lazily fetches and caches process-lifetime secrets.
pub struct SecretProvider {
    store: Box<dyn SecretStore>,
    cache: RwLock<HashMap<String, CachedSecret>>,
}

impl SecretProvider {
    pub fn new(store: Box<dyn SecretStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a secret, contacting the store at most on cache misses.
    pub fn get(&self, secret_id: &str) -> Result<String, GatewayError> {
        if let Some(hit) = self
            .cache
            .read()
            .expect("secret cache poisoned")
            .get(secret_id)
        {
            return Ok(hit.value.clone());
        }

        let value = self.store.fetch(secret_id).map_err(|e| {
            tracing::error!(secret_id = %secret_id, error = %e, "Secret fetch failed");
            GatewayError::SecretUnavailable(secret_id.to_string())
        })?;

        // Under a racing first call another task may have filled the
        // slot already; the earlier value stays (immutable once set).
        let mut cache = self.cache.write().expect("secret cache poisoned");
        let entry = cache
            .entry(secret_id.to_string())
            .or_insert_with(|| CachedSecret {
                value,
                fetched_at: Utc::now(),
            });
        Ok(entry.value.clone())
    }
}
