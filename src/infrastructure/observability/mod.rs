//! Observability - metrics recorded by the cache and store layers

pub mod metrics;

pub use metrics::{
    record_cache_corruption, record_cache_error, record_cache_hit, record_cache_invalidation,
    record_cache_miss, record_store_query,
};
