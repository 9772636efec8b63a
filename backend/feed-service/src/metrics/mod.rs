//! Feed service metrics
//!
//! Prometheus metrics for the precompute worker, hydration and the trending
//! merge. Store-level counters live in `feed_store`.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};
use std::time::Duration;

static PRECOMPUTE_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_precompute_runs_total",
        "Total precompute runs by feed kind and outcome",
        &["kind", "outcome"]
    )
    .expect("Failed to register precompute runs metric")
});

static PRECOMPUTE_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "feed_precompute_duration_seconds",
        "Duration of precompute runs",
        &["kind"],
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to register precompute duration metric")
});

static HYDRATION_MISSES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "feed_hydration_misses_total",
        "Indexed identifiers whose object could not be resolved"
    )
    .expect("Failed to register hydration misses metric")
});

static TRENDING_CANDIDATES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "feed_trending_candidates_total",
        "Trending candidates by resolution outcome",
        &["outcome"]
    )
    .expect("Failed to register trending candidates metric")
});

/// Record a precompute run (success/error/timeout)
pub fn record_precompute_run(kind: &str, outcome: &str) {
    PRECOMPUTE_RUNS_TOTAL
        .with_label_values(&[kind, outcome])
        .inc();
}

pub fn record_precompute_duration(kind: &str, duration: Duration) {
    PRECOMPUTE_DURATION_SECONDS
        .with_label_values(&[kind])
        .observe(duration.as_secs_f64());
}

pub fn record_hydration_misses(count: u64) {
    HYDRATION_MISSES_TOTAL.inc_by(count);
}

/// Record trending candidate outcome (resolved/unresolved/failed/duplicate)
pub fn record_trending_candidate(outcome: &str) {
    TRENDING_CANDIDATES_TOTAL.with_label_values(&[outcome]).inc();
}
