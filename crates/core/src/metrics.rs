//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Listing and search executions (per backend, per outcome)
//! - External index health (failures, degraded routing)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Search Metrics
// =============================================================================

/// Searches total by backend and outcome.
pub static SEARCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("torrent_index_searches_total", "Total listing and search executions"),
        &["backend", "outcome"], // outcome: "ok" or an error kind
    )
    .unwrap()
});

/// Search duration in seconds.
pub static SEARCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "torrent_index_search_duration_seconds",
            "Duration of backend search executions",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["backend"],
    )
    .unwrap()
});

/// Records returned per page.
pub static SEARCH_RESULTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "torrent_index_search_results",
            "Number of records returned per page",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 75.0, 100.0]),
        &["backend"],
    )
    .unwrap()
});

/// Requests rejected before reaching a backend.
pub static QUERY_REJECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "torrent_index_query_rejections_total",
            "Requests rejected during query validation",
        ),
        &["kind"], // "invalid_parameter", "not_found", "forbidden", ...
    )
    .unwrap()
});

// =============================================================================
// External Index Metrics
// =============================================================================

/// External index failures total.
pub static EXTERNAL_INDEX_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "torrent_index_external_index_failures_total",
        "Total external index requests that failed or timed out",
    )
    .unwrap()
});

/// Whether term searches are currently routed away from the external index.
pub static EXTERNAL_INDEX_DEGRADED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "torrent_index_external_index_degraded",
        "Whether term searches are routed to the relational store (1) or not (0)",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Search
        Box::new(SEARCHES_TOTAL.clone()),
        Box::new(SEARCH_DURATION.clone()),
        Box::new(SEARCH_RESULTS.clone()),
        Box::new(QUERY_REJECTIONS.clone()),
        // External index
        Box::new(EXTERNAL_INDEX_FAILURES.clone()),
        Box::new(EXTERNAL_INDEX_DEGRADED.clone()),
    ]
}
