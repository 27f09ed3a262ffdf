//! In-memory cache implementation using moka

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache as MokaCache;

use crate::domain::cache::{glob_to_regex, Cache};
use crate::domain::DomainError;

/// Configuration for in-memory cache
#[derive(Debug, Clone)]
pub struct InMemoryCacheConfig {
    /// Maximum number of entries
    pub max_capacity: u64,
    /// Upper bound on any entry's lifetime; per-entry TTLs are enforced separately
    pub max_ttl: Duration,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            max_ttl: Duration::from_secs(3600),
        }
    }
}

impl InMemoryCacheConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn with_max_ttl(mut self, ttl: Duration) -> Self {
        self.max_ttl = ttl;
        self
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: String,
    /// Expiration timestamp (millis since epoch)
    expires_at: u64,
}

/// Process-local cache backend
///
/// Stands in for Redis in development and tests. Entries carry their own
/// expiry so the entity and list TTL tiers behave as they do in Redis.
#[derive(Debug)]
pub struct InMemoryCache {
    cache: MokaCache<String, CacheEntry>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::with_config(InMemoryCacheConfig::default())
    }

    pub fn with_config(config: InMemoryCacheConfig) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.max_ttl)
            .build();

        Self { cache }
    }

    fn current_time_millis() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    /// Returns the entry if it has not expired, evicting it otherwise
    async fn live_entry(&self, key: &str) -> Option<CacheEntry> {
        let entry = self.cache.get(key).await?;

        if Self::current_time_millis() >= entry.expires_at {
            self.cache.remove(key).await;
            return None;
        }

        Some(entry)
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.live_entry(key).await.map(|entry| entry.data))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let entry = CacheEntry {
            data: value.to_string(),
            expires_at: Self::current_time_millis() + ttl.as_millis() as u64,
        };

        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let existed = self.live_entry(key).await.is_some();
        self.cache.remove(key).await;
        Ok(existed)
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError> {
        let regex = glob_to_regex(pattern)?;

        self.cache.run_pending_tasks().await;

        let keys_to_delete: Vec<String> = self
            .cache
            .iter()
            .filter(|(k, _)| regex.is_match(k.as_str()))
            .map(|(k, _)| k.to_string())
            .collect();

        let deleted = keys_to_delete.len();
        for key in keys_to_delete {
            self.cache.remove(&key).await;
        }

        Ok(deleted)
    }

    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.live_entry(key).await.is_some())
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        Ok(self.live_entry(key).await.map(|entry| {
            Duration::from_millis(entry.expires_at.saturating_sub(Self::current_time_millis()))
        }))
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }

    async fn size(&self) -> Result<usize, DomainError> {
        self.cache.run_pending_tasks().await;
        Ok(self.cache.entry_count() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{CacheOp, CacheOpResult};

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = InMemoryCache::new();

        cache
            .set_raw("user:1", r#"{"id":1}"#, Duration::from_secs(60))
            .await
            .unwrap();

        let result = cache.get_raw("user:1").await.unwrap();
        assert_eq!(result.as_deref(), Some(r#"{"id":1}"#));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let cache = InMemoryCache::new();

        assert!(cache.get_raw("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = InMemoryCache::new();

        cache
            .set_raw("user:1", "v", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(cache.delete("user:1").await.unwrap());
        assert!(cache.get_raw("user:1").await.unwrap().is_none());
        assert!(!cache.delete("user:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let cache = InMemoryCache::new();

        cache
            .set_raw("user:list:abc", "[]", Duration::from_millis(50))
            .await
            .unwrap();

        assert!(cache.exists("user:list:abc").await.unwrap());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.get_raw("user:list:abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ttl_remaining() {
        let cache = InMemoryCache::new();

        cache
            .set_raw("user:1", "v", Duration::from_secs(60))
            .await
            .unwrap();

        let remaining = cache.ttl("user:1").await.unwrap().unwrap();
        assert!(remaining.as_secs() > 50 && remaining.as_secs() <= 60);
        assert!(cache.ttl("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_pattern_only_touches_matching_keys() {
        let cache = InMemoryCache::new();
        let ttl = Duration::from_secs(60);

        cache.set_raw("user:1", "a", ttl).await.unwrap();
        cache.set_raw("user:email:a@x.com", "a", ttl).await.unwrap();
        cache.set_raw("user:list:f1", "[]", ttl).await.unwrap();
        cache.set_raw("user:list:f2", "[]", ttl).await.unwrap();

        let deleted = cache.delete_pattern("user:list:*").await.unwrap();
        assert_eq!(deleted, 2);

        assert!(cache.exists("user:1").await.unwrap());
        assert!(cache.exists("user:email:a@x.com").await.unwrap());
        assert!(!cache.exists("user:list:f1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_pattern_treats_dots_literally() {
        let cache = InMemoryCache::new();
        let ttl = Duration::from_secs(60);

        cache.set_raw("user:email:a@x.com", "a", ttl).await.unwrap();
        cache.set_raw("user:email:a@xycom", "b", ttl).await.unwrap();

        let deleted = cache.delete_pattern("user:email:a@x.com").await.unwrap();
        assert_eq!(deleted, 1);
        assert!(cache.exists("user:email:a@xycom").await.unwrap());
    }

    #[tokio::test]
    async fn test_pipeline_runs_in_order() {
        let cache = InMemoryCache::new();
        let ttl = Duration::from_secs(60);

        let results = cache
            .pipeline(vec![
                CacheOp::set("user:1", "one", ttl),
                CacheOp::get("user:1"),
                CacheOp::delete("user:1"),
                CacheOp::get("user:1"),
            ])
            .await
            .unwrap();

        assert_eq!(
            results,
            vec![
                CacheOpResult::Stored,
                CacheOpResult::Value(Some("one".to_string())),
                CacheOpResult::Deleted(true),
                CacheOpResult::Value(None),
            ]
        );
    }

    #[tokio::test]
    async fn test_clear_and_size() {
        let cache = InMemoryCache::new();
        let ttl = Duration::from_secs(60);

        cache.set_raw("user:1", "a", ttl).await.unwrap();
        cache.set_raw("user:2", "b", ttl).await.unwrap();
        assert_eq!(cache.size().await.unwrap(), 2);

        cache.clear().await.unwrap();
        assert_eq!(cache.size().await.unwrap(), 0);
    }
}
