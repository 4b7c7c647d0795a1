// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for kubehomedns.
//!
//! Every metric carries the `kubehomedns_` prefix and is registered in
//! [`METRICS_REGISTRY`], which the `/metrics` endpoint encodes on each scrape.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Per-hostname outcomes and latency
//! - **Sync Loop Metrics** - Completed and failed cycles per loop
//! - **Acknowledgement Metrics** - Sentinel label removals
//! - **Error Metrics** - Failures by category
//!
//! # Example
//!
//! ```rust,no_run
//! use kubehomedns::metrics::record_reconciliation;
//!
//! record_reconciliation("full_sync", "created", std::time::Duration::from_millis(120));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all metrics
const METRICS_NAMESPACE: &str = "kubehomedns";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Hostname reconciliations by trigger and outcome
///
/// Labels:
/// - `trigger`: `full_sync` or `label_trigger`
/// - `outcome`: `created`, `updated`, `unchanged`, `failed`
pub static RECONCILIATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Hostname reconciliations by trigger and outcome",
    );
    let counter = CounterVec::new(opts, &["trigger", "outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of one hostname reconciliation in seconds
///
/// Labels:
/// - `trigger`: `full_sync` or `label_trigger`
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of hostname reconciliations in seconds by trigger",
    )
    .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]);
    let histogram = HistogramVec::new(opts, &["trigger"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Sync Loop Metrics
// ============================================================================

/// Sync cycles by loop and status
///
/// Labels:
/// - `loop`: `full_sync` or `label_trigger`
/// - `status`: `completed` or `list_failed`
pub static SYNC_CYCLES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_sync_cycles_total"),
        "Sync loop cycles by loop and status",
    );
    let counter = CounterVec::new(opts, &["loop", "status"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Acknowledgement Metrics
// ============================================================================

/// Sentinel label acknowledgements by result
///
/// Labels:
/// - `result`: `cleared`, `already_cleared`, `gone`, `failed`
pub static LABEL_ACKNOWLEDGEMENTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_label_acknowledgements_total"),
        "Sentinel label acknowledgements by result",
    );
    let counter = CounterVec::new(opts, &["result"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Errors by trigger and category
///
/// Labels:
/// - `trigger`: `full_sync` or `label_trigger`
/// - `error_type`: category from the error's `error_type()`
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Errors by trigger and category",
    );
    let counter = CounterVec::new(opts, &["trigger", "error_type"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record one hostname reconciliation
///
/// # Arguments
/// * `trigger` - Loop that requested it
/// * `outcome` - `created`, `updated`, `unchanged` or `failed`
/// * `duration` - Wall time spent
pub fn record_reconciliation(trigger: &str, outcome: &str, duration: Duration) {
    RECONCILIATIONS_TOTAL
        .with_label_values(&[trigger, outcome])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[trigger])
        .observe(duration.as_secs_f64());
}

/// Record the end of a sync cycle
pub fn record_sync_cycle(loop_name: &str, status: &str) {
    SYNC_CYCLES_TOTAL
        .with_label_values(&[loop_name, status])
        .inc();
}

/// Record a label acknowledgement attempt
pub fn record_acknowledgement(result: &str) {
    LABEL_ACKNOWLEDGEMENTS_TOTAL
        .with_label_values(&[result])
        .inc();
}

/// Record an error
///
/// # Arguments
/// * `trigger` - Loop where the error occurred
/// * `error_type` - Category of error (e.g., `provider_error`, `cluster_timeout`)
pub fn record_error(trigger: &str, error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[trigger, error_type]).inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
