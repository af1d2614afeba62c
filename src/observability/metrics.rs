//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_rate_limited_total` (counter): 429 admissions
//! - `gateway_store_fail_open_total` (counter): degraded-store
//!   admissions granted by the fail-open policy
//!
//! # Design Decisions
//! - Metric updates are cheap atomic operations; recording never fails
//!   the request path
//! - The Prometheus exporter is optional and bound to its own address

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter started"),
        Err(e) => tracing::error!(error = %e, "Failed to start metrics exporter"),
    }
}

/// Record a completed request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record an admission rejected by the rate limiter.
pub fn record_rate_limited() {
    counter!("gateway_rate_limited_total").increment(1);
}

/// Record an admission granted because the rate store was degraded.
pub fn record_store_fail_open() {
    counter!("gateway_store_fail_open_total").increment(1);
}
