//! Cache factory for runtime selection

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::cache::{Cache, RetryPolicy};
use crate::domain::DomainError;

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use super::redis::{RedisCache, RedisCacheConfig};

/// Supported cache types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheType {
    /// Redis, shared across processes
    #[default]
    Redis,
    /// Process-local cache using moka
    InMemory,
}

impl std::fmt::Display for CacheType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheType::InMemory => write!(f, "in_memory"),
            CacheType::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for CacheType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(CacheType::InMemory),
            "redis" => Ok(CacheType::Redis),
            _ => Err(DomainError::configuration(format!(
                "Unknown cache type: {}. Valid types: in_memory, redis",
                s
            ))),
        }
    }
}

/// Configuration for the cache backend and the policy layered on top of it
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheType,
    pub url: String,
    /// Prefix prepended to every key (Redis only)
    pub key_prefix: Option<String>,
    /// Key namespace for user entries
    pub namespace: String,
    pub entity_ttl_secs: u64,
    pub list_ttl_secs: u64,
    pub max_connections: usize,
    pub connect_timeout_ms: u64,
    /// Bound on any single cache call before it is treated as failed
    pub operation_timeout_ms: u64,
    /// Maximum entries (in-memory only)
    pub max_capacity: u64,
    pub retry: RetryPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheType::Redis,
            url: "redis://localhost:6379/0".to_string(),
            key_prefix: None,
            namespace: "user".to_string(),
            entity_ttl_secs: 3600,
            list_ttl_secs: 300,
            max_connections: 10,
            connect_timeout_ms: 5000,
            operation_timeout_ms: 2000,
            max_capacity: 10_000,
            retry: RetryPolicy::default(),
        }
    }
}

impl CacheConfig {
    pub fn in_memory() -> Self {
        Self {
            backend: CacheType::InMemory,
            ..Default::default()
        }
    }

    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            backend: CacheType::Redis,
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn entity_ttl(&self) -> Duration {
        Duration::from_secs(self.entity_ttl_secs)
    }

    pub fn list_ttl(&self) -> Duration {
        Duration::from_secs(self.list_ttl_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.entity_ttl_secs == 0 || self.list_ttl_secs == 0 {
            return Err(DomainError::configuration("Cache TTLs must be positive"));
        }
        if self.namespace.is_empty() || self.namespace.contains('*') {
            return Err(DomainError::configuration(format!(
                "Invalid cache namespace: '{}'",
                self.namespace
            )));
        }
        if self.backend == CacheType::Redis && self.url.is_empty() {
            return Err(DomainError::configuration(
                "Redis URL is required for Redis cache type",
            ));
        }
        Ok(())
    }
}

/// Factory for creating cache instances
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    pub fn new() -> Self {
        Self
    }

    /// Creates a cache backend based on configuration
    ///
    /// Redis pools connect lazily, so this succeeds even while Redis is down.
    pub fn create(&self, config: &CacheConfig) -> Result<Arc<dyn Cache>, DomainError> {
        config.validate()?;

        match config.backend {
            CacheType::InMemory => {
                let max_ttl = config.entity_ttl().max(config.list_ttl());
                let cache = InMemoryCache::with_config(
                    InMemoryCacheConfig::default()
                        .with_max_capacity(config.max_capacity)
                        .with_max_ttl(max_ttl),
                );
                Ok(Arc::new(cache))
            }
            CacheType::Redis => {
                let mut redis_config = RedisCacheConfig::new(config.url.clone())
                    .with_max_connections(config.max_connections)
                    .with_connection_timeout(Duration::from_millis(config.connect_timeout_ms))
                    .with_retry(config.retry.clone());

                if let Some(prefix) = &config.key_prefix {
                    redis_config = redis_config.with_key_prefix(prefix.clone());
                }

                Ok(Arc::new(RedisCache::new(redis_config)?))
            }
        }
    }

    pub fn create_in_memory(&self) -> Arc<dyn Cache> {
        Arc::new(InMemoryCache::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_type_from_str() {
        assert_eq!("in_memory".parse::<CacheType>().unwrap(), CacheType::InMemory);
        assert_eq!("memory".parse::<CacheType>().unwrap(), CacheType::InMemory);
        assert_eq!("Redis".parse::<CacheType>().unwrap(), CacheType::Redis);
        assert!("memcached".parse::<CacheType>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();

        assert_eq!(config.backend, CacheType::Redis);
        assert_eq!(config.entity_ttl(), Duration::from_secs(3600));
        assert_eq!(config.list_ttl(), Duration::from_secs(300));
        assert_eq!(config.namespace, "user");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = CacheConfig::in_memory();
        config.list_ttl_secs = 0;
        assert!(config.validate().is_err());

        let mut config = CacheConfig::in_memory();
        config.namespace = "user*".to_string();
        assert!(config.validate().is_err());

        assert!(CacheConfig::redis("").validate().is_err());
    }

    #[tokio::test]
    async fn test_create_in_memory() {
        let cache = CacheFactory::new().create(&CacheConfig::in_memory()).unwrap();

        cache
            .set_raw("user:1", "v", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(cache.get_raw("user:1").await.unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_create_redis_without_server() {
        let config = CacheConfig::redis("redis://127.0.0.1:1").with_key_prefix("test");

        assert!(CacheFactory::new().create(&config).is_ok());
    }
}
