//! Central metrics registry and metric definitions
//!
//! This module provides Prometheus metrics for the vector search path.
//! Metrics are registered lazily on first access using once_cell::Lazy.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec,
};

// ===== Index Search Metrics =====

/// Index search duration histogram
pub static INDEX_SEARCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "akidb_index_search_duration_seconds",
        "Index search duration in seconds",
        &["index_type", "distance_metric"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register index search duration histogram")
});

// ===== Cross-shard coordinator metrics =====

/// Number of rounds a coordinator search ran before returning.
pub static COORDINATOR_ROUNDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "akidb_coordinator_rounds",
        "Number of fan-out rounds executed per coordinator search",
        &["termination_reason"],
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 8.0, 10.0, 20.0]
    )
    .expect("Failed to register coordinator rounds histogram")
});

/// Total coordinator searches by termination reason.
pub static COORDINATOR_TERMINATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "akidb_coordinator_terminations_total",
        "Total number of coordinator searches by termination reason",
        &["termination_reason"]
    )
    .expect("Failed to register coordinator terminations counter")
});

/// Per-shard `next_batch` fetch latency observed by the coordinator.
pub static COORDINATOR_SHARD_FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "akidb_coordinator_shard_fetch_duration_seconds",
        "Latency of a single shard's next_batch call, as observed by the coordinator",
        &["shard"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register coordinator shard fetch duration histogram")
});
