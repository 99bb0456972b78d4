//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_decisions_total` (counter): requests by routing decision
//! - `router_request_duration_seconds` (histogram): time to decide and respond
//! - `router_resolutions_total` (counter): CMS resolutions by outcome
//! - `router_resolution_duration_seconds` (histogram): CMS call latency
//! - `router_token_renewals_total` (counter): renewals by outcome
//! - `router_forward_errors_total` (counter): backend forwarding failures
//!
//! Without an installed recorder every call here is a no-op, which is what
//! tests rely on.

use std::net::SocketAddr;
use std::time::Instant;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_decision(decision: &'static str, start: Instant) {
    metrics::counter!("router_decisions_total", "decision" => decision).increment(1);
    metrics::histogram!("router_request_duration_seconds", "decision" => decision)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_resolution(outcome: &'static str, start: Instant) {
    metrics::counter!("router_resolutions_total", "outcome" => outcome).increment(1);
    metrics::histogram!("router_resolution_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_token_renewal(outcome: &'static str) {
    metrics::counter!("router_token_renewals_total", "outcome" => outcome).increment(1);
}

pub fn record_forward_error() {
    metrics::counter!("router_forward_errors_total").increment(1);
}
