//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): requests by method, strategy, status
//! - `dispatch_request_duration_seconds` (histogram): latency by strategy
//! - `dispatch_routes` (gauge): size of the live route table
//! - `dispatch_rebinds_total` (counter): listeners replaced by `set_port`
//!
//! # Design Decisions
//! - Without an installed recorder every call is a no-op
//! - Strategy label is `none` for unmatched requests

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, strategy: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "dispatch_requests_total",
        "method" => method.to_string(),
        "strategy" => strategy,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("dispatch_request_duration_seconds", "strategy" => strategy)
        .record(start.elapsed().as_secs_f64());
}

pub fn set_route_count(count: usize) {
    metrics::gauge!("dispatch_routes").set(count as f64);
}

pub fn record_rebind(port: u16) {
    metrics::counter!("dispatch_rebinds_total", "port" => port.to_string()).increment(1);
}
