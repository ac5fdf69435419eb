// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the reconciliation engine.
//!
//! All metrics carry the `remnadns_` prefix.
//!
//! # Metrics Categories
//!
//! - **Tick Metrics** - Track reconciliation ticks and their outcomes
//! - **Record Metrics** - Track address record mutations per managed record name
//! - **Error Metrics** - Track zone and mutation failures
//! - **State Metrics** - Desired IP counts and zone resolution states
//!
//! # Example
//!
//! ```rust,no_run
//! use remnadns::metrics::{gather_metrics, record_tick_completed};
//!
//! record_tick_completed(std::time::Duration::from_millis(420));
//! println!("{}", gather_metrics().unwrap());
//! ```

use crate::constants::METRICS_NAMESPACE;
use prometheus::{
    CounterVec, Encoder, GaugeVec, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Tick Metrics
// ============================================================================

/// Total number of reconciliation ticks by outcome
///
/// Labels:
/// - `outcome`: `success` or `skipped`
pub static TICKS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_ticks_total"),
        "Total number of reconciliation ticks by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of completed ticks in seconds
pub static TICK_DURATION_SECONDS: LazyLock<Histogram> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_tick_duration_seconds"),
        "Duration of completed reconciliation ticks in seconds",
    )
    .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = Histogram::with_opts(opts).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Record Metrics
// ============================================================================

/// Total number of address record mutations
///
/// Labels:
/// - `record`: Managed record name (e.g., `proxy.example.com`)
/// - `action`: `added`, `updated` or `removed`
pub static RECORD_CHANGES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_record_changes_total"),
        "Total number of address record mutations by record name and action",
    );
    let counter = CounterVec::new(opts, &["record", "action"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Number of IPs currently desired per record name
pub static DESIRED_IPS: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_desired_ips"),
        "Number of healthy configured IPs per record name",
    );
    let gauge = GaugeVec::new(opts, &["record"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Total number of zones that could not be reconciled in a tick
///
/// Labels:
/// - `record`: Managed record name
/// - `kind`: Error kind (`transient`, `authentication`, ...)
pub static ZONE_FAILURES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_zone_failures_total"),
        "Total number of zone reconciliation failures by record name and kind",
    );
    let counter = CounterVec::new(opts, &["record", "kind"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Total number of individual record mutations that failed
pub static MUTATION_FAILURES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_mutation_failures_total"),
        "Total number of failed record mutations by record name and action",
    );
    let counter = CounterVec::new(opts, &["record", "action"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// State Metrics
// ============================================================================

/// Number of inventory nodes in the last snapshot by health
///
/// Labels:
/// - `health`: `healthy` or `unhealthy`
pub static NODES: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_nodes"),
        "Number of inventory nodes in the last health snapshot by health",
    );
    let gauge = GaugeVec::new(opts, &["health"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Number of configured domains per resolution state
///
/// Labels:
/// - `state`: `resolved`, `pending` or `disabled`
pub static ZONE_STATES: LazyLock<GaugeVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_zone_states"),
        "Number of configured domains by resolution state",
    );
    let gauge = GaugeVec::new(opts, &["state"]).unwrap();
    METRICS_REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Record a completed tick
pub fn record_tick_completed(duration: Duration) {
    TICKS_TOTAL.with_label_values(&["success"]).inc();
    TICK_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Record a tick skipped because no usable health snapshot was available
pub fn record_tick_skipped() {
    TICKS_TOTAL.with_label_values(&["skipped"]).inc();
}

/// Record one successful record mutation
///
/// # Arguments
/// * `record` - Managed record name
/// * `action` - `added`, `updated` or `removed`
pub fn record_record_change(record: &str, action: &str) {
    RECORD_CHANGES_TOTAL
        .with_label_values(&[record, action])
        .inc();
}

/// Record one failed record mutation
pub fn record_mutation_failure(record: &str, action: &str) {
    MUTATION_FAILURES_TOTAL
        .with_label_values(&[record, action])
        .inc();
}

/// Record a zone that could not be reconciled this tick
pub fn record_zone_failure(record: &str, kind: &str) {
    ZONE_FAILURES_TOTAL
        .with_label_values(&[record, kind])
        .inc();
}

/// Publish the desired IP count of a record name
#[allow(clippy::cast_precision_loss)]
pub fn set_desired_ips(record: &str, count: usize) {
    DESIRED_IPS.with_label_values(&[record]).set(count as f64);
}

/// Publish the node counts of the last health snapshot
#[allow(clippy::cast_precision_loss)]
pub fn set_node_health(healthy: usize, unhealthy: usize) {
    NODES.with_label_values(&["healthy"]).set(healthy as f64);
    NODES.with_label_values(&["unhealthy"]).set(unhealthy as f64);
}

/// Publish how many domains are resolved, pending and disabled
#[allow(clippy::cast_precision_loss)]
pub fn set_zone_states(resolved: usize, pending: usize, disabled: usize) {
    ZONE_STATES.with_label_values(&["resolved"]).set(resolved as f64);
    ZONE_STATES.with_label_values(&["pending"]).set(pending as f64);
    ZONE_STATES.with_label_values(&["disabled"]).set(disabled as f64);
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
