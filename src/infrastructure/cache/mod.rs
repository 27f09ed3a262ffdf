//! Cache infrastructure - backends and the fail-soft client

mod client;
mod factory;
mod in_memory;
mod redis;

pub use client::{CacheClient, CACHE_SCHEMA_VERSION};
pub use factory::{CacheConfig, CacheFactory, CacheType};
pub use in_memory::{InMemoryCache, InMemoryCacheConfig};
pub use redis::{RedisCache, RedisCacheConfig};
