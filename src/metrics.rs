//! Prometheus metrics for the security pipeline.
//!
//! Metrics are exposed via a dedicated HTTP listener (default: `0.0.0.0:9090`).
//!
//! # Available Metrics
//!
//! ## Counters
//! - `relayer_guard_auth_rejections_total` - Requests rejected by the authenticator (label: reason)
//! - `relayer_guard_security_events_total` - Audit events emitted (label: event)
//!
//! ## Histograms
//! - `relayer_guard_request_duration_seconds` - Authenticated request duration (labels: method, status)
//!
//! # Usage
//!
//! ```rust,ignore
//! use relayer_guard::metrics::{init_metrics, record_auth_rejection};
//!
//! // Initialize metrics (call once at startup)
//! init_metrics("0.0.0.0:9090".parse()?)?;
//!
//! record_auth_rejection("missing_credential");
//! ```
//!
//! Recording without an installed exporter is a no-op, so library users and
//! tests never need to initialize anything.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const AUTH_REJECTIONS_TOTAL: &str = "relayer_guard_auth_rejections_total";
    pub const SECURITY_EVENTS_TOTAL: &str = "relayer_guard_security_events_total";
    pub const REQUEST_DURATION_SECONDS: &str = "relayer_guard_request_duration_seconds";
}

/// Initialize the Prometheus metrics exporter.
///
/// This sets up metric descriptions and starts the Prometheus HTTP listener
/// on the specified address.
///
/// # Returns
///
/// `Ok(())` if initialization succeeds, `Err` with message otherwise.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::AUTH_REJECTIONS_TOTAL,
        "Total number of requests rejected by API key or IP allow-list checks"
    );
    describe_counter!(
        names::SECURITY_EVENTS_TOTAL,
        "Total number of security audit events emitted"
    );
    describe_histogram!(
        names::REQUEST_DURATION_SECONDS,
        "Authenticated HTTP request duration in seconds"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

/// Record a request rejected by the authenticator.
pub fn record_auth_rejection(reason: &'static str) {
    counter!(names::AUTH_REJECTIONS_TOTAL, "reason" => reason).increment(1);
}

/// Record an emitted audit event.
pub fn record_security_event(event: &'static str) {
    counter!(names::SECURITY_EVENTS_TOTAL, "event" => event).increment(1);
}

/// Record the duration of an authenticated request.
pub fn record_request_duration(method: &str, status: u16, duration_secs: f64) {
    histogram!(names::REQUEST_DURATION_SECONDS, "method" => method_label(method), "status" => status.to_string())
        .record(duration_secs);
}

/// Bound the `method` label to the standard methods.
///
/// Extension methods are client-chosen and would grow the label set without
/// limit, so they all share `"other"`.
fn method_label(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "PATCH" => "PATCH",
        "HEAD" => "HEAD",
        "OPTIONS" => "OPTIONS",
        "CONNECT" => "CONNECT",
        "TRACE" => "TRACE",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These only verify the functions don't panic without an exporter.

    #[test]
    fn test_record_auth_rejection() {
        record_auth_rejection("missing_credential");
    }

    #[test]
    fn test_record_security_event() {
        record_security_event("auth_attempt");
    }

    #[test]
    fn test_record_request_duration() {
        record_request_duration("GET", 200, 0.004);
        record_request_duration("BREW", 418, 0.001);
    }

    #[test]
    fn test_method_label_standard_methods() {
        assert_eq!(method_label("GET"), "GET");
        assert_eq!(method_label("DELETE"), "DELETE");
        assert_eq!(method_label("TRACE"), "TRACE");
    }

    #[test]
    fn test_method_label_collapses_extension_methods() {
        assert_eq!(method_label("BREW"), "other");
        assert_eq!(method_label("PROPFIND"), "other");
        assert_eq!(method_label("get"), "other");
    }
}
