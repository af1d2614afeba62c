//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (structured, levelled)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout log subscriber (fmt layer + env filter)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod metrics;
