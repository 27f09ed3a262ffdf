//! Infrastructure services

mod user_cache_coordinator;

pub use user_cache_coordinator::{UserCacheConfig, UserCacheCoordinator};
