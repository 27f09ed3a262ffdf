//! Redis cache implementation

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config as PoolSettings, Connection, Pool, PoolConfig, PoolError, Runtime};
use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::domain::cache::{Cache, CacheOp, CacheOpResult, RetryPolicy};
use crate::domain::DomainError;

/// Configuration for Redis cache
#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix for namespacing
    pub key_prefix: Option<String>,
    /// Pool size
    pub max_connections: usize,
    /// Bound on waiting for, creating, or recycling a pooled connection
    pub connection_timeout: Duration,
    /// Backoff applied when a connection cannot be acquired
    pub retry: RetryPolicy,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            max_connections: 10,
            connection_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

impl RedisCacheConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Redis cache backed by a deadpool connection pool
///
/// The pool connects lazily, so constructing a `RedisCache` never fails just
/// because Redis is down. Connection acquisition retries with the configured
/// backoff; commands themselves are not retried.
pub struct RedisCache {
    pool: Pool,
    config: RedisCacheConfig,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("config", &self.config)
            .field("pool", &"<deadpool_redis::Pool>")
            .finish()
    }
}

impl RedisCache {
    pub fn new(config: RedisCacheConfig) -> Result<Self, DomainError> {
        let mut pool_config = PoolConfig::new(config.max_connections.max(1));
        pool_config.timeouts.wait = Some(config.connection_timeout);
        pool_config.timeouts.create = Some(config.connection_timeout);
        pool_config.timeouts.recycle = Some(config.connection_timeout);

        let mut settings = PoolSettings::from_url(config.url.as_str());
        settings.pool = Some(pool_config);

        let pool = settings
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| DomainError::cache(format!("Failed to create Redis pool: {}", e)))?;

        Ok(Self { pool, config })
    }

    pub fn with_url(url: impl Into<String>) -> Result<Self, DomainError> {
        Self::new(RedisCacheConfig::new(url))
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    /// Acquires a pooled connection, backing off between failed attempts
    async fn connection(&self) -> Result<Connection, DomainError> {
        let delays = self.config.retry.delays();
        let mut attempt = 0usize;

        loop {
            match self.pool.get().await {
                Ok(conn) => return Ok(conn),
                Err(PoolError::Closed) => {
                    return Err(DomainError::cache("Redis pool is closed"));
                }
                Err(e) => match delays.get(attempt) {
                    Some(delay) => {
                        warn!(
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Redis connection failed, retrying"
                        );
                        tokio::time::sleep(*delay).await;
                        attempt += 1;
                    }
                    None => {
                        return Err(DomainError::cache(format!(
                            "Redis unavailable after {} attempts: {}",
                            attempt + 1,
                            e
                        )));
                    }
                },
            }
        }
    }

    async fn scan_keys(&self, conn: &mut Connection, pattern: &str) -> Result<Vec<String>, DomainError> {
        let mut cursor = 0u64;
        let mut found = Vec::new();

        loop {
            let (new_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(conn)
                .await
                .map_err(|e| {
                    DomainError::cache(format!(
                        "Failed to scan keys with pattern '{}': {}",
                        pattern, e
                    ))
                })?;

            found.extend(keys);
            cursor = new_cursor;

            if cursor == 0 {
                break;
            }
        }

        Ok(found)
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    (ttl.as_millis() as u64).max(1)
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection().await?;

        let bytes: Option<Vec<u8>> = conn.get(&prefixed_key).await.map_err(|e| {
            DomainError::cache(format!("Failed to get key '{}': {}", key, e))
        })?;

        bytes
            .map(String::from_utf8)
            .transpose()
            .map_err(|e| DomainError::serialization(format!("Value of '{}' is not UTF-8: {}", key, e)))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection().await?;

        redis::cmd("SET")
            .arg(&prefixed_key)
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to set key '{}': {}", key, e)))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection().await?;

        let deleted: i64 = conn.del(&prefixed_key).await.map_err(|e| {
            DomainError::cache(format!("Failed to delete key '{}': {}", key, e))
        })?;

        Ok(deleted > 0)
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError> {
        let prefixed_pattern = self.prefix_key(pattern);
        let mut conn = self.connection().await?;

        let keys = self.scan_keys(&mut conn, &prefixed_pattern).await?;
        let mut total_deleted = 0usize;

        for chunk in keys.chunks(100) {
            let deleted: i64 = conn.del(chunk).await.map_err(|e| {
                DomainError::cache(format!("Failed to delete keys: {}", e))
            })?;
            total_deleted += deleted as usize;
        }

        debug!(pattern = %pattern, deleted = total_deleted, "Deleted keys by pattern");
        Ok(total_deleted)
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection().await?;

        let exists: bool = conn.exists(&prefixed_key).await.map_err(|e| {
            DomainError::cache(format!("Failed to check existence of key '{}': {}", key, e))
        })?;

        Ok(exists)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection().await?;

        let ttl_ms: i64 = redis::cmd("PTTL")
            .arg(&prefixed_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                DomainError::cache(format!("Failed to get TTL for key '{}': {}", key, e))
            })?;

        // -2: no such key, -1: no expiry
        if ttl_ms < 0 {
            Ok(None)
        } else {
            Ok(Some(Duration::from_millis(ttl_ms as u64)))
        }
    }

    async fn clear(&self) -> Result<(), DomainError> {
        match &self.config.key_prefix {
            Some(_) => {
                self.delete_pattern("*").await?;
            }
            None => {
                let mut conn = self.connection().await?;
                redis::cmd("FLUSHDB")
                    .query_async::<()>(&mut conn)
                    .await
                    .map_err(|e| DomainError::cache(format!("Failed to flush database: {}", e)))?;
            }
        }

        Ok(())
    }

    async fn size(&self) -> Result<usize, DomainError> {
        let mut conn = self.connection().await?;

        match &self.config.key_prefix {
            Some(_) => {
                let pattern = self.prefix_key("*");
                Ok(self.scan_keys(&mut conn, &pattern).await?.len())
            }
            None => redis::cmd("DBSIZE")
                .query_async::<usize>(&mut conn)
                .await
                .map_err(|e| DomainError::cache(format!("Failed to get database size: {}", e))),
        }
    }

    /// Runs the batch as one MULTI/EXEC transaction in a single round trip
    async fn pipeline(&self, ops: Vec<CacheOp>) -> Result<Vec<CacheOpResult>, DomainError> {
        if ops.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();

        for op in &ops {
            match op {
                CacheOp::Get { key } => {
                    pipe.cmd("GET").arg(self.prefix_key(key));
                }
                CacheOp::Set { key, value, ttl } => {
                    pipe.cmd("SET")
                        .arg(self.prefix_key(key))
                        .arg(value)
                        .arg("PX")
                        .arg(ttl_millis(*ttl));
                }
                CacheOp::Delete { key } => {
                    pipe.cmd("DEL").arg(self.prefix_key(key));
                }
            }
        }

        let mut conn = self.connection().await?;
        let replies: Vec<redis::Value> = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Pipeline of {} ops failed: {}", ops.len(), e)))?;

        if replies.len() != ops.len() {
            return Err(DomainError::cache(format!(
                "Pipeline returned {} replies for {} ops",
                replies.len(),
                ops.len()
            )));
        }

        ops.iter()
            .zip(replies.iter())
            .map(|(op, reply)| {
                let result = match op {
                    CacheOp::Get { .. } => {
                        CacheOpResult::Value(redis::from_redis_value::<Option<String>>(reply)?)
                    }
                    CacheOp::Set { .. } => CacheOpResult::Stored,
                    CacheOp::Delete { .. } => {
                        CacheOpResult::Deleted(redis::from_redis_value::<i64>(reply)? > 0)
                    }
                };
                Ok(result)
            })
            .collect::<Result<Vec<_>, redis::RedisError>>()
            .map_err(|e| DomainError::cache(format!("Unexpected pipeline reply: {}", e)))
    }

    async fn ping(&self) -> Result<(), DomainError> {
        let mut conn = self.connection().await?;

        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Redis ping failed: {}", e)))?;

        Ok(())
    }

    async fn close(&self) {
        self.pool.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests require a running Redis instance
    // Run with: cargo test -- --ignored

    fn get_test_cache() -> RedisCache {
        let config = RedisCacheConfig::new("redis://127.0.0.1:6379")
            .with_key_prefix("user-cache-test")
            .with_retry(RetryPolicy::no_retry());

        RedisCache::new(config).unwrap()
    }

    #[test]
    fn test_pool_is_created_lazily() {
        let cache = RedisCache::with_url("redis://127.0.0.1:1");
        assert!(cache.is_ok());
    }

    #[test]
    fn test_key_prefix() {
        let cache = RedisCache::new(
            RedisCacheConfig::new("redis://localhost").with_key_prefix("myapp"),
        )
        .unwrap();

        assert_eq!(cache.prefix_key("user:1"), "myapp:user:1");

        let bare = RedisCache::with_url("redis://localhost").unwrap();
        assert_eq!(bare.prefix_key("user:1"), "user:1");
    }

    #[test]
    fn test_ttl_is_at_least_one_millisecond() {
        assert_eq!(ttl_millis(Duration::ZERO), 1);
        assert_eq!(ttl_millis(Duration::from_secs(300)), 300_000);
    }

    #[tokio::test]
    async fn test_unreachable_redis_fails_within_retry_budget() {
        let config = RedisCacheConfig::new("redis://127.0.0.1:1")
            .with_connection_timeout(Duration::from_millis(200))
            .with_retry(
                RetryPolicy::new(3)
                    .with_initial_delay(10)
                    .with_max_total_wait(50),
            );
        let cache = RedisCache::new(config).unwrap();

        let started = std::time::Instant::now();
        let result = cache.get_raw("user:1").await;

        assert!(matches!(result, Err(DomainError::Cache { .. })));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_set_and_get() {
        let cache = get_test_cache();

        cache
            .set_raw("user:1", r#"{"id":1}"#, Duration::from_secs(60))
            .await
            .unwrap();

        let result = cache.get_raw("user:1").await.unwrap();
        assert_eq!(result.as_deref(), Some(r#"{"id":1}"#));

        cache.delete("user:1").await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_ttl_in_milliseconds() {
        let cache = get_test_cache();

        cache
            .set_raw("user:list:ttl", "[]", Duration::from_millis(1500))
            .await
            .unwrap();

        let ttl = cache.ttl("user:list:ttl").await.unwrap().unwrap();
        assert!(ttl <= Duration::from_millis(1500));
        assert!(ttl > Duration::from_millis(1000));

        cache.delete("user:list:ttl").await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_pipeline_is_atomic_batch() {
        let cache = get_test_cache();
        let ttl = Duration::from_secs(60);

        let results = cache
            .pipeline(vec![
                CacheOp::set("user:7", "a", ttl),
                CacheOp::set("user:email:g@x.com", "a", ttl),
                CacheOp::get("user:7"),
                CacheOp::delete("user:email:g@x.com"),
            ])
            .await
            .unwrap();

        assert_eq!(
            results,
            vec![
                CacheOpResult::Stored,
                CacheOpResult::Stored,
                CacheOpResult::Value(Some("a".to_string())),
                CacheOpResult::Deleted(true),
            ]
        );

        cache.delete("user:7").await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_delete_pattern() {
        let cache = get_test_cache();
        let ttl = Duration::from_secs(60);

        cache.set_raw("user:list:a", "[]", ttl).await.unwrap();
        cache.set_raw("user:list:b", "[]", ttl).await.unwrap();
        cache.set_raw("user:9", "{}", ttl).await.unwrap();

        let deleted = cache.delete_pattern("user:list:*").await.unwrap();
        assert_eq!(deleted, 2);
        assert!(cache.exists("user:9").await.unwrap());

        cache.delete("user:9").await.unwrap();
    }

    #[tokio::test]
    #[ignore = "Requires running Redis instance"]
    async fn test_redis_non_utf8_value_is_serialization_error() {
        let cache = get_test_cache();
        let mut conn = cache.connection().await.unwrap();

        redis::cmd("SET")
            .arg(cache.prefix_key("user:8"))
            .arg(&[0xffu8, 0xfe, 0x00][..])
            .query_async::<()>(&mut conn)
            .await
            .unwrap();

        let result = cache.get_raw("user:8").await;
        assert!(matches!(result, Err(DomainError::Serialization { .. })));

        cache.delete("user:8").await.unwrap();
    }
}
