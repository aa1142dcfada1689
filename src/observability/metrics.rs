//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define tee metrics (primary requests, latency, shadow attempts/outcomes)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `tee_primary_requests_total` (counter): primary responses by method, status
//! - `tee_primary_request_duration_seconds` (histogram): primary latency
//! - `tee_shadow_attempts_total` (counter): shadow round trips by status
//! - `tee_shadow_outcomes_total` (counter): shadow task outcomes
//!
//! # Design Decisions
//! - Without an installed recorder every call is a no-op
//! - Shadow metrics never touch the client path

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a response returned to the client by the primary path.
pub fn record_primary(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "tee_primary_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("tee_primary_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record one shadow round trip; `status` is `None` for transport errors.
pub fn record_shadow_attempt(status: Option<u16>) {
    let status = status.map_or_else(|| "error".to_string(), |s| s.to_string());
    metrics::counter!("tee_shadow_attempts_total", "status" => status).increment(1);
}

/// Record how a shadow task ended.
pub fn record_shadow_outcome(outcome: &'static str) {
    metrics::counter!("tee_shadow_outcomes_total", "outcome" => outcome).increment(1);
}
