//! Metrics collection and exposition.
//!
//! # Metrics
//! - `aggregator_requests_total` (counter): inbound requests by route, status
//! - `aggregator_request_duration_seconds` (histogram): inbound latency
//! - `aggregator_upstream_calls_total` (counter): upstream calls by dependency, outcome
//! - `aggregator_upstream_duration_seconds` (histogram): upstream latency by dependency
//! - `aggregator_circuit_breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `aggregator_circuit_breaker_rejections_total` (counter): calls failed fast
//! - `aggregator_cache_lookups_total` (counter): cache lookups by cache, result
//! - `aggregator_cache_entries` (gauge): stored entries per cache
//! - `aggregator_skipped_items_total` (counter): detail lookups dropped from a result
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so library code and tests never check
//! - Prometheus exporter is installed only when enabled in config

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);

    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished inbound request.
pub fn record_request(route: &'static str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!("aggregator_requests_total", "route" => route, "status" => status).increment(1);
    histogram!("aggregator_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

/// Record a finished upstream call.
pub fn record_upstream_call(dependency: &'static str, outcome: &'static str, start: Instant) {
    counter!(
        "aggregator_upstream_calls_total",
        "dependency" => dependency,
        "outcome" => outcome
    )
    .increment(1);
    histogram!("aggregator_upstream_duration_seconds", "dependency" => dependency)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_breaker_state(dependency: &'static str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::Open => 1.0,
        CircuitState::HalfOpen => 2.0,
    };
    gauge!("aggregator_circuit_breaker_state", "dependency" => dependency).set(value);
}

pub fn record_breaker_rejection(dependency: &'static str) {
    counter!("aggregator_circuit_breaker_rejections_total", "dependency" => dependency)
        .increment(1);
}

pub fn record_cache_lookup(cache: &'static str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("aggregator_cache_lookups_total", "cache" => cache, "result" => result).increment(1);
}

pub fn record_cache_size(cache: &'static str, entries: usize) {
    gauge!("aggregator_cache_entries", "cache" => cache).set(entries as f64);
}

/// Record a similar item dropped from a response, labelled by error kind.
pub fn record_skipped_item(reason: &'static str) {
    counter!("aggregator_skipped_items_total", "reason" => reason).increment(1);
}
