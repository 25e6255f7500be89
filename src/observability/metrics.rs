//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): exchanges by method, status
//! - `http_request_duration_seconds` (histogram): time to response head
//! - `http_route_misses_total` (counter): requests with no matching route
//! - `http_handler_errors_total` (counter): aborted handler chains
//! - `http_open_connections` (gauge): current connection count
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus exporter is optional and serves its own listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a completed response head.
pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("http_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_route_miss() {
    metrics::counter!("http_route_misses_total").increment(1);
}

pub fn record_handler_error() {
    metrics::counter!("http_handler_errors_total").increment(1);
}

pub fn record_open_connections(count: usize) {
    metrics::gauge!("http_open_connections").set(count as f64);
}
