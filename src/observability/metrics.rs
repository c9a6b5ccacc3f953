//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_admission_total` (counter): admission outcomes
//! - `gateway_assessment_total` (counter): provider call results
//! - `gateway_limiter_buckets` (gauge): tracked rate limit clients
//! - `gateway_limiter_reclaimed_total` (counter): idle buckets dropped
//!
//! Recording is a no-op until a recorder is installed, so library code and
//! tests can call these freely.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("gateway_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_admission(outcome: &'static str) {
    ::metrics::counter!("gateway_admission_total", "outcome" => outcome).increment(1);
}

pub fn record_assessment(result: &'static str) {
    ::metrics::counter!("gateway_assessment_total", "result" => result).increment(1);
}

pub fn record_limiter_buckets(count: usize) {
    ::metrics::gauge!("gateway_limiter_buckets").set(count as f64);
}

pub fn record_limiter_reclaimed(count: usize) {
    ::metrics::counter!("gateway_limiter_reclaimed_total").increment(count as u64);
}
