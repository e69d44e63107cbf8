//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): responses by route, status
//! - `gateway_request_duration_seconds` (histogram): latency by route
//! - `gateway_auth_failures_total` (counter): by auth error kind
//! - `gateway_rate_limited_total` (counter): rejections by reason
//! - `gateway_rate_limit_store_errors_total` (counter): counter store failures
//! - `gateway_validation_failures_total` (counter): rejected payloads by endpoint kind
//! - `gateway_generation_attempts_total` (counter): generator calls by outcome
//! - `gateway_safety_findings_total` (counter): allergy, interaction and gap findings
//! - `gateway_pipeline_failures_total` (counter): failed requests by stage
//!
//! Without an installed recorder every call below is a no-op, so unit tests
//! and the CLI never need one.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &'static str, status: u16, start: Instant) {
    metrics::counter!("gateway_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_auth_failure(kind: &'static str) {
    metrics::counter!("gateway_auth_failures_total", "kind" => kind).increment(1);
}

pub fn record_rate_limited(reason: &'static str) {
    metrics::counter!("gateway_rate_limited_total", "reason" => reason).increment(1);
}

pub fn record_store_error() {
    metrics::counter!("gateway_rate_limit_store_errors_total").increment(1);
}

pub fn record_validation_failure(kind: &'static str) {
    metrics::counter!("gateway_validation_failures_total", "kind" => kind).increment(1);
}

pub fn record_generation_attempt(outcome: &'static str) {
    metrics::counter!("gateway_generation_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_safety_finding(kind: &'static str, count: usize) {
    if count > 0 {
        metrics::counter!("gateway_safety_findings_total", "kind" => kind).increment(count as u64);
    }
}

pub fn record_pipeline_failure(stage: &'static str) {
    metrics::counter!("gateway_pipeline_failures_total", "stage" => stage).increment(1);
}
