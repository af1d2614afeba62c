//! Persistent storage for per-client rate records.
//!
//! # Responsibilities
//! - Load/save one `ClientRateRecord` per distinct client id
//! - Expire idle records (TTL = window) so the store garbage-collects
//!   clients that stopped calling
//!
//! # Design Decisions
//! - Records are JSON under `{prefix}{client_id}`; the record format is
//!   versionless and compacted on every write by the limiter
//! - No cross-request locking; concurrent read-modify-write may lose an
//!   update, an accepted weak-consistency trade-off

use std::collections::HashMap;
use std::sync::Mutex;

use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-client sliding-window record. Mutated only on admission, never
/// on rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRateRecord {
    /// Distinct client identifier (API key, source address, or
    /// "anonymous").
    pub client_id: String,

    /// Epoch-millisecond timestamps of admitted requests. Entries older
    /// than the window are logically stale; they are dropped on the
    /// next admission write.
    pub request_timestamps: Vec<i64>,

    /// Epoch milliseconds of the most recent admission.
    pub last_request: i64,
}

/// Errors produced by a rate store backend. The limiter treats all of
/// them as a degraded store and fails open.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("record malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Backend storage for rate records.
pub trait RateStore: Send + Sync {
    fn load(
        &self,
        client_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<ClientRateRecord>, StoreError>> + Send;

    fn save(
        &self,
        record: &ClientRateRecord,
        ttl_ms: u64,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}

/// Redis-backed store. Records are stored as JSON with a TTL of one
/// window so idle clients expire on their own.
pub struct RedisRateStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisRateStore {
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key(&self, client_id: &str) -> String {
        format!("{}{}", self.key_prefix, client_id)
    }
}

impl RateStore for RedisRateStore {
    async fn load(&self, client_id: &str) -> Result<Option<ClientRateRecord>, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(self.key(client_id)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, record: &ClientRateRecord, ttl_ms: u64) -> Result<(), StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let json = serde_json::to_string(record)?;
        let ttl_secs = ttl_ms.div_ceil(1000).max(1);
        let _: () = conn.set_ex(self.key(&record.client_id), json, ttl_secs).await?;
        Ok(())
    }
}

/// In-process store for tests and single-instance deployments without
/// redis. State is lost on restart.
#[derive(Default)]
pub struct MemoryRateStore {
    records: Mutex<HashMap<String, ClientRateRecord>>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateStore for MemoryRateStore {
    async fn load(&self, client_id: &str) -> Result<Option<ClientRateRecord>, StoreError> {
        let records = self.records.lock().expect("rate store mutex poisoned");
        Ok(records.get(client_id).cloned())
    }

    async fn save(&self, record: &ClientRateRecord, _ttl_ms: u64) -> Result<(), StoreError> {
        let mut records = self.records.lock().expect("rate store mutex poisoned");
        records.insert(record.client_id.clone(), record.clone());
        Ok(())
    }
}

/// Store selection made at startup from config.
pub enum StoreBackend {
    Redis(RedisRateStore),
    Memory(MemoryRateStore),
}

impl RateStore for StoreBackend {
    async fn load(&self, client_id: &str) -> Result<Option<ClientRateRecord>, StoreError> {
        match self {
            StoreBackend::Redis(s) => s.load(client_id).await,
            StoreBackend::Memory(s) => s.load(client_id).await,
        }
    }

    async fn save(&self, record: &ClientRateRecord, ttl_ms: u64) -> Result<(), StoreError> {
        match self {
            StoreBackend::Redis(s) => s.save(record, ttl_ms).await,
            StoreBackend::Memory(s) => s.save(record, ttl_ms).await,
        }
    }
}
