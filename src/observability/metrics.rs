//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by route, status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency by route
//! - `gateway_auth_decisions_total` (counter): allow / unauthenticated / forbidden
//! - `gateway_token_cache_total` (counter): cache hit / miss / expired
//! - `gateway_token_cache_entries` (gauge): stored cache entries
//! - `gateway_introspection_duration_seconds` (histogram): authority latency by outcome
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op (tests, metrics disabled)
//! - Labels are low-cardinality: route names, fixed outcome strings

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and start its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a completed request.
pub fn record_request(route: &str, status: u16, start: Instant) {
    let route = route.to_string();
    metrics::counter!(
        "gateway_requests_total",
        "route" => route.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

/// Record an authorization outcome.
pub fn record_auth_decision(outcome: &'static str) {
    metrics::counter!("gateway_auth_decisions_total", "outcome" => outcome).increment(1);
}

/// Record a credential cache lookup result.
pub fn record_cache_lookup(result: &'static str) {
    metrics::counter!("gateway_token_cache_total", "result" => result).increment(1);
}

/// Record the current number of cache entries.
pub fn record_cache_size(entries: usize) {
    metrics::gauge!("gateway_token_cache_entries").set(entries as f64);
}

/// Record one introspection call.
pub fn record_introspection(outcome: &'static str, start: Instant) {
    metrics::histogram!("gateway_introspection_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}
