//! Cache trait definition

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use super::pipeline::{CacheOp, CacheOpResult};
use crate::domain::DomainError;

/// Raw key-value cache backend with TTL support
///
/// Values are JSON strings. Implementations report every backend problem as
/// `DomainError::Cache`; deciding whether that is fatal is up to the caller.
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    /// Gets a raw value from the cache
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Sets a raw value in the cache with a TTL
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Deletes a value from the cache, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Deletes every key matching a glob pattern (`*` wildcard)
    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError>;

    /// Checks if a key exists in the cache
    async fn exists(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.get_raw(key).await?.is_some())
    }

    /// Gets the remaining TTL for a key
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError>;

    /// Clears all entries from the cache
    async fn clear(&self) -> Result<(), DomainError>;

    /// Returns approximate number of entries in the cache
    async fn size(&self) -> Result<usize, DomainError>;

    /// Executes a batch of operations, all or nothing
    ///
    /// The default runs the operations one by one and stops at the first
    /// failure; network backends override it with a single round trip.
    async fn pipeline(&self, ops: Vec<CacheOp>) -> Result<Vec<CacheOpResult>, DomainError> {
        let mut results = Vec::with_capacity(ops.len());

        for op in ops {
            let result = match op {
                CacheOp::Get { key } => CacheOpResult::Value(self.get_raw(&key).await?),
                CacheOp::Set { key, value, ttl } => {
                    self.set_raw(&key, &value, ttl).await?;
                    CacheOpResult::Stored
                }
                CacheOp::Delete { key } => CacheOpResult::Deleted(self.delete(&key).await?),
            };
            results.push(result);
        }

        Ok(results)
    }

    /// Checks that the backend is reachable
    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }

    /// Releases pooled connections
    async fn close(&self) {}
}

/// Converts a glob (`*` wildcard) into an anchored regex
pub(crate) fn glob_to_regex(pattern: &str) -> Result<regex::Regex, DomainError> {
    let escaped = regex::escape(pattern).replace(r"\*", ".*");

    regex::Regex::new(&format!("^{}$", escaped))
        .map_err(|e| DomainError::cache(format!("Invalid pattern: {}", e)))
}
