//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Watch loop (claimed items, active units, outcomes)
//! - Status polling (polls by remote status)
//! - Publishing (symlinks created)
//! - Debrid API errors

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Registry holding every core metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// Watch Loop Metrics
// =============================================================================

/// Descriptor files claimed from the drop folder.
pub static ITEMS_CLAIMED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("blackhole_items_claimed_total", "Descriptor files claimed"),
        &["manager"],
    )
    .unwrap()
});

/// Descriptor files skipped because their destination already exists.
pub static ITEMS_DEFERRED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "blackhole_items_deferred_total",
        "Descriptor files skipped because a prior run already published them",
    )
    .unwrap()
});

/// Units of work currently running.
pub static ACTIVE_UNITS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("blackhole_active_units", "Units of work currently running").unwrap()
});

/// Finished units of work by outcome.
pub static ITEMS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("blackhole_items_finished_total", "Finished units of work"),
        &["outcome"], // "published", "failed", "folder_not_found", "crashed"
    )
    .unwrap()
});

// =============================================================================
// Polling Metrics
// =============================================================================

/// Status polls by reported remote status.
pub static STATUS_POLLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("blackhole_status_polls_total", "Remote job status polls"),
        &["status"],
    )
    .unwrap()
});

// =============================================================================
// Publishing Metrics
// =============================================================================

/// Symlinks created in the destination tree.
pub static LINKS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("blackhole_links_created_total", "Symlinks created").unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// Failed debrid API calls by endpoint.
pub static DEBRID_API_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("blackhole_debrid_api_errors_total", "Failed debrid API calls"),
        &["endpoint"],
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ITEMS_CLAIMED.clone()),
        Box::new(ITEMS_DEFERRED.clone()),
        Box::new(ACTIVE_UNITS.clone()),
        Box::new(ITEMS_FINISHED.clone()),
        Box::new(STATUS_POLLS.clone()),
        Box::new(LINKS_CREATED.clone()),
        Box::new(DEBRID_API_ERRORS.clone()),
    ];

    for metric in metrics {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics in the Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
