//! Fail-soft cache client
//!
//! Wraps a [`Cache`] backend so that no cache problem ever reaches the caller:
//! errors and timeouts are logged, counted, and turned into misses or `false`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::cache::{Cache, CacheOpResult, CachePipeline};
use crate::domain::DomainError;
use crate::infrastructure::observability;

/// Version stamped into every payload; anything else reads as a miss
pub const CACHE_SCHEMA_VERSION: u32 = 1;

const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    schema_version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    schema_version: u32,
    data: serde_json::Value,
}

/// Cache client that never fails
#[derive(Debug, Clone)]
pub struct CacheClient {
    backend: Arc<dyn Cache>,
    operation_timeout: Duration,
}

impl CacheClient {
    pub fn new(backend: Arc<dyn Cache>) -> Self {
        Self {
            backend,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Runs a backend call under the operation timeout, absorbing failures
    async fn guarded<T, F>(&self, operation: &'static str, key: &str, call: F) -> Option<T>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        match tokio::time::timeout(self.operation_timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                warn!(operation, key, error = %e, "Cache operation failed, continuing without cache");
                observability::record_cache_error(operation, "error");
                None
            }
            Err(_) => {
                warn!(
                    operation,
                    key,
                    timeout_ms = self.operation_timeout.as_millis() as u64,
                    "Cache operation timed out, continuing without cache"
                );
                observability::record_cache_error(operation, "timeout");
                None
            }
        }
    }

    /// Raw value for a key; `None` on miss or failure
    ///
    /// A value the backend cannot decode is deleted.
    pub async fn get(&self, key: &str) -> Option<String> {
        let read = self
            .guarded("get", key, async {
                match self.backend.get_raw(key).await {
                    Err(DomainError::Serialization { message }) => Ok(Err(message)),
                    other => other.map(Ok),
                }
            })
            .await?;

        match read {
            Ok(value) => value,
            Err(message) => {
                warn!(key, error = %message, "Discarding unreadable cache entry");
                observability::record_cache_corruption();
                self.delete(key).await;
                None
            }
        }
    }

    /// Stores a raw value; `false` if the write did not happen
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> bool {
        self.guarded("set", key, self.backend.set_raw(key, value, ttl))
            .await
            .is_some()
    }

    /// Removes a key; succeeds whether or not it existed
    pub async fn delete(&self, key: &str) -> bool {
        self.guarded("delete", key, self.backend.delete(key))
            .await
            .is_some()
    }

    /// Removes every key matching a glob pattern
    pub async fn delete_pattern(&self, pattern: &str) -> bool {
        match self
            .guarded("delete_pattern", pattern, self.backend.delete_pattern(pattern))
            .await
        {
            Some(deleted) => {
                debug!(pattern, deleted, "Deleted cache keys by pattern");
                true
            }
            None => false,
        }
    }

    /// Runs a batch in one round trip; `None` if the batch failed as a whole
    pub async fn pipeline(&self, pipeline: CachePipeline) -> Option<Vec<CacheOpResult>> {
        if pipeline.is_empty() {
            return Some(Vec::new());
        }

        let first_key = pipeline.ops()[0].key().to_string();
        self.guarded("pipeline", &first_key, self.backend.pipeline(pipeline.into_ops()))
            .await
    }

    /// Serializes a value inside the versioned envelope
    pub fn encode<T: Serialize>(value: &T) -> Result<String, DomainError> {
        serde_json::to_string(&EnvelopeRef {
            schema_version: CACHE_SCHEMA_VERSION,
            data: value,
        })
        .map_err(|e| DomainError::serialization(e.to_string()))
    }

    /// Parses an enveloped payload, rejecting other schema versions
    pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, DomainError> {
        let envelope: Envelope =
            serde_json::from_str(raw).map_err(|e| DomainError::serialization(e.to_string()))?;

        if envelope.schema_version != CACHE_SCHEMA_VERSION {
            return Err(DomainError::serialization(format!(
                "Unsupported schema version {} (expected {})",
                envelope.schema_version, CACHE_SCHEMA_VERSION
            )));
        }

        serde_json::from_value(envelope.data).map_err(|e| DomainError::serialization(e.to_string()))
    }

    /// Decodes a raw payload read from `key`, deleting the key if it is unusable
    pub async fn decode_or_discard<T: DeserializeOwned>(&self, key: &str, raw: &str) -> Option<T> {
        match Self::decode(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Discarding malformed cache entry");
                observability::record_cache_corruption();
                self.delete(key).await;
                None
            }
        }
    }

    /// Typed read; malformed payloads are deleted and reported as a miss
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        self.decode_or_discard(key, &raw).await
    }

    /// Typed write inside the versioned envelope
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        match Self::encode(value) {
            Ok(payload) => self.set(key, &payload, ttl).await,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize cache payload");
                false
            }
        }
    }

    /// Whether the backend currently answers
    pub async fn health_check(&self) -> bool {
        self.guarded("ping", "", self.backend.ping()).await.is_some()
    }

    pub async fn close(&self) {
        self.backend.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use async_trait::async_trait;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        id: i64,
        name: String,
    }

    fn payload() -> Payload {
        Payload {
            id: 7,
            name: "seven".to_string(),
        }
    }

    #[derive(Debug)]
    struct StallingCache;

    #[async_trait]
    impl Cache for StallingCache {
        async fn get_raw(&self, _key: &str) -> Result<Option<String>, DomainError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(None)
        }

        async fn set_raw(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), DomainError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }

        async fn delete(&self, _key: &str) -> Result<bool, DomainError> {
            Ok(false)
        }

        async fn delete_pattern(&self, _pattern: &str) -> Result<usize, DomainError> {
            Ok(0)
        }

        async fn ttl(&self, _key: &str) -> Result<Option<Duration>, DomainError> {
            Ok(None)
        }

        async fn clear(&self) -> Result<(), DomainError> {
            Ok(())
        }

        async fn size(&self) -> Result<usize, DomainError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_json_round_trip_uses_envelope() {
        let mock = Arc::new(MockCache::new());
        let client = CacheClient::new(mock.clone());

        assert!(client.set_json("user:7", &payload(), Duration::from_secs(60)).await);

        let raw = mock.raw("user:7").unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["schema_version"], CACHE_SCHEMA_VERSION);
        assert_eq!(value["data"]["id"], 7);

        assert_eq!(client.get_json::<Payload>("user:7").await, Some(payload()));
    }

    #[tokio::test]
    async fn test_failing_backend_is_absorbed() {
        let client = CacheClient::new(Arc::new(MockCache::failing()));

        assert!(client.get("user:1").await.is_none());
        assert!(!client.set("user:1", "v", Duration::from_secs(1)).await);
        assert!(!client.delete("user:1").await);
        assert!(!client.delete_pattern("user:list:*").await);
        assert!(client.pipeline(CachePipeline::new().get("user:1")).await.is_none());
        assert!(!client.health_check().await);
    }

    #[tokio::test]
    async fn test_delete_of_missing_key_succeeds() {
        let client = CacheClient::new(Arc::new(MockCache::new()));

        assert!(client.delete("user:404").await);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_deleted() {
        let mock = Arc::new(MockCache::new().with_raw_entry(
            "user:7",
            "{not json",
            Duration::from_secs(60),
        ));
        let client = CacheClient::new(mock.clone());

        assert!(client.get_json::<Payload>("user:7").await.is_none());
        assert!(mock.raw("user:7").is_none());
    }

    #[tokio::test]
    async fn test_unknown_schema_version_is_a_miss() {
        let stale = r#"{"schema_version":0,"data":{"id":7,"name":"seven"}}"#;
        let mock = Arc::new(MockCache::new().with_raw_entry("user:7", stale, Duration::from_secs(60)));
        let client = CacheClient::new(mock.clone());

        assert!(client.get_json::<Payload>("user:7").await.is_none());
        assert!(mock.raw("user:7").is_none());
    }

    #[tokio::test]
    async fn test_wrong_shape_is_a_miss() {
        let wrong = r#"{"schema_version":1,"data":{"unexpected":true}}"#;
        let mock = Arc::new(MockCache::new().with_raw_entry("user:7", wrong, Duration::from_secs(60)));
        let client = CacheClient::new(mock);

        assert!(client.get_json::<Payload>("user:7").await.is_none());
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let client = CacheClient::new(Arc::new(StallingCache))
            .with_operation_timeout(Duration::from_millis(50));

        let started = std::time::Instant::now();
        assert!(client.get("user:1").await.is_none());
        assert!(!client.set("user:1", "v", Duration::from_secs(1)).await);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_empty_pipeline_skips_backend() {
        let client = CacheClient::new(Arc::new(MockCache::failing()));

        assert_eq!(client.pipeline(CachePipeline::new()).await, Some(Vec::new()));
    }

    /// Backend holding one value it cannot decode
    #[derive(Debug, Default)]
    struct UndecodableCache {
        deleted: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Cache for UndecodableCache {
        async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
            Err(DomainError::serialization(format!("Value of '{}' is not valid UTF-8", key)))
        }

        async fn set_raw(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), DomainError> {
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<bool, DomainError> {
            self.deleted.lock().unwrap().push(key.to_string());
            Ok(true)
        }

        async fn delete_pattern(&self, _pattern: &str) -> Result<usize, DomainError> {
            Ok(0)
        }

        async fn ttl(&self, _key: &str) -> Result<Option<Duration>, DomainError> {
            Ok(None)
        }

        async fn clear(&self) -> Result<(), DomainError> {
            Ok(())
        }

        async fn size(&self) -> Result<usize, DomainError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_undecodable_value_is_deleted() {
        let backend = Arc::new(UndecodableCache::default());
        let client = CacheClient::new(backend.clone());

        assert!(client.get_json::<Payload>("user:7").await.is_none());
        assert_eq!(*backend.deleted.lock().unwrap(), vec!["user:7".to_string()]);
    }

    #[tokio::test]
    async fn test_backend_error_on_get_does_not_delete() {
        let mock = Arc::new(MockCache::failing());
        let client = CacheClient::new(mock.clone());

        assert!(client.get("user:7").await.is_none());
        assert_eq!(mock.delete_count(), 0);
    }
}
