//! Sliding-window log rate limiting.
//!
//! # Algorithm
//! ```text
//! admit(client_id, now):
//!     record      ← store.load(client_id)        (miss → empty)
//!     kept        ← timestamps > now - window
//!     kept >= max → Limited, NOTHING written back
//!     else        → store.save(kept + [now]), Allowed
//! ```
//!
//! # Design Decisions
//! - Rejected attempts are never recorded: a client blocked near a
//!   window boundary is admitted again as soon as an old timestamp ages
//!   out, without its failed retries extending the block
//! - No cross-request lock on a client's record. Two concurrent calls
//!   that both read `count == max - 1` both get Allowed; transient
//!   overshoot proportional to concurrency is an accepted trade-off
//!   for availability, not a bug
//! - Fail-open: any store error (read or write) yields Allowed; only an
//!   explicit over-limit count blocks a caller

pub mod store;

use crate::observability::metrics;

pub use store::{ClientRateRecord, MemoryRateStore, RateStore, RedisRateStore, StoreBackend};

/// Admission decision for one inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Limited,
}

/// Per-client sliding-window log limiter over a persistent store.
pub struct SlidingWindowLimiter<S> {
    store: S,
    window_ms: i64,
    max_requests: usize,
}

impl<S: RateStore> SlidingWindowLimiter<S> {
    pub fn new(store: S, window_ms: u64, max_requests: u32) -> Self {
        Self {
            store,
            window_ms: window_ms as i64,
            max_requests: max_requests as usize,
        }
    }

    /// Decide admission for `client_id` at `now_ms` (epoch ms).
    pub async fn admit(&self, client_id: &str, now_ms: i64) -> Admission {
        let record = match self.store.load(client_id).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(client = %client_id, error = %e, "Rate store read failed, failing open");
                metrics::record_store_fail_open();
                return Admission::Allowed;
            }
        };

        let window_start = now_ms - self.window_ms;
        let mut kept: Vec<i64> = record
            .map(|r| r.request_timestamps)
            .unwrap_or_default()
            .into_iter()
            .filter(|&t| t > window_start)
            .collect();

        if kept.len() >= self.max_requests {
            tracing::debug!(
                client = %client_id,
                in_window = kept.len(),
                max = self.max_requests,
                "Rate limit exceeded"
            );
            metrics::record_rate_limited();
            return Admission::Limited;
        }

        kept.push(now_ms);
        let updated = ClientRateRecord {
            client_id: client_id.to_string(),
            request_timestamps: kept,
            last_request: now_ms,
        };

        if let Err(e) = self.store.save(&updated, self.window_ms as u64).await {
            tracing::warn!(client = %client_id, error = %e, "Rate store write failed, failing open");
            metrics::record_store_fail_open();
        }

        Admission::Allowed
    }
}
