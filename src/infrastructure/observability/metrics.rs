//! Cache and store metrics
//!
//! Recorded through the `metrics` facade; they are no-ops until the host
//! process installs a recorder.

use std::time::Duration;

use metrics::{counter, histogram};

/// Record a cache hit for a lookup kind ("entity" or "list")
pub fn record_cache_hit(kind: &'static str) {
    counter!("cache_hits_total", "kind" => kind).increment(1);
}

pub fn record_cache_miss(kind: &'static str) {
    counter!("cache_misses_total", "kind" => kind).increment(1);
}

/// Record a cache call that failed or timed out and was swallowed
pub fn record_cache_error(operation: &'static str, reason: &'static str) {
    let labels = [("operation", operation.to_string()), ("reason", reason.to_string())];

    counter!("cache_errors_total", &labels).increment(1);
}

/// Record a cache payload that could not be decoded and was discarded
pub fn record_cache_corruption() {
    counter!("cache_corrupted_entries_total").increment(1);
}

/// Record an invalidation triggered by a write
pub fn record_cache_invalidation(scope: &'static str, keys: usize) {
    counter!("cache_invalidations_total", "scope" => scope).increment(1);
    counter!("cache_invalidated_keys_total", "scope" => scope).increment(keys as u64);
}

/// Record a store round trip
pub fn record_store_query(operation: &'static str, duration: Duration, success: bool) {
    let labels = [
        ("operation", operation.to_string()),
        ("status", if success { "success" } else { "error" }.to_string()),
    ];

    counter!("store_queries_total", &labels).increment(1);
    histogram!("store_query_duration_seconds", &labels).record(duration.as_secs_f64());
}
