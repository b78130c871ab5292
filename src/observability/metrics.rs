//! Metrics collection and exposition.
//!
//! # Metrics
//! - `twinport_connections_total` (counter): accepted connections by outcome
//! - `twinport_http1_requests_total` (counter): parsed requests by method
//! - `twinport_http2_frames_total` (counter): received frames by type
//! - `twinport_connection_duration_seconds` (histogram): accept to close
//!
//! Without [`init_metrics`] the `record_*` helpers go nowhere.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on `addr`. Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// `outcome` is `secure`, `plaintext` or `rejected`.
pub fn record_connection(outcome: &'static str) {
    ::metrics::counter!("twinport_connections_total", "outcome" => outcome).increment(1);
}

pub fn record_request(method: &str) {
    ::metrics::counter!("twinport_http1_requests_total", "method" => method.to_string()).increment(1);
}

pub fn record_frame(frame_type: &str) {
    ::metrics::counter!("twinport_http2_frames_total", "type" => frame_type.to_string()).increment(1);
}

pub fn record_connection_duration(start: Instant) {
    ::metrics::histogram!("twinport_connection_duration_seconds").record(start.elapsed().as_secs_f64());
}
