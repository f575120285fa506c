//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the index server:
//! - HTTP request metrics (latency, counts, errors)
//! - Viewer resolution failures
//! - Feed rendering
//!
//! Listing and external index metrics live in the core crate and are
//! registered here alongside the HTTP ones.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "torrent_index_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("torrent_index_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "torrent_index_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Authentication failures.
pub static AUTH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "torrent_index_auth_failures_total",
            "Total viewer resolution failures",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Feed Metrics
// =============================================================================

/// RSS documents rendered.
pub static FEEDS_RENDERED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "torrent_index_feeds_rendered_total",
        "Total RSS documents rendered",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry
        .register(Box::new(AUTH_FAILURES_TOTAL.clone()))
        .unwrap();

    // Feed
    registry
        .register(Box::new(FEEDS_RENDERED_TOTAL.clone()))
        .unwrap();

    // Core metrics (listing executions, external index health)
    for metric in torrent_index_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

static NUMERIC_SEGMENT: Lazy<regex_lite::Regex> =
    Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs and usernames with placeholders).
pub fn normalize_path(path: &str) -> String {
    let path = match path.strip_prefix("/api/v1/users/") {
        Some(rest) => match rest.split_once('/') {
            Some((_, tail)) => format!("/api/v1/users/{{username}}/{}", tail),
            None => "/api/v1/users/{username}".to_string(),
        },
        None => path.to_string(),
    };
    // Applied twice since adjacent numeric segments share a slash.
    let result = NUMERIC_SEGMENT.replace_all(&path, "/{id}$1");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}
