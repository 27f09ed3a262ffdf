//! Health reporting for the cache and the store

use std::time::Instant;

use serde::Serialize;

use crate::domain::user::UserStore;
use crate::infrastructure::cache::CacheClient;

/// Overall health report
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: String,
    pub checks: Vec<HealthCheck>,
    pub latency_ms: u64,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Cache down, store up: requests are served, only slower
    Degraded,
    Unhealthy,
}

/// Individual component health check
#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub latency_ms: u64,
}

impl HealthReport {
    pub fn is_unhealthy(&self) -> bool {
        self.status == HealthStatus::Unhealthy
    }
}

/// Runs both checks; the store decides health, the cache only degrades it
pub async fn check(cache: &CacheClient, store: &dyn UserStore) -> HealthReport {
    let start = Instant::now();

    let cache_check = check_cache(cache).await;
    let store_check = check_store(store).await;

    let status = match (store_check.status, cache_check.status) {
        (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
        (HealthStatus::Healthy, _) => HealthStatus::Degraded,
        _ => HealthStatus::Unhealthy,
    };

    HealthReport {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: vec![cache_check, store_check],
        latency_ms: start.elapsed().as_millis() as u64,
    }
}

async fn check_cache(cache: &CacheClient) -> HealthCheck {
    let start = Instant::now();
    let healthy = cache.health_check().await;

    HealthCheck {
        name: "cache".to_string(),
        status: if healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        },
        message: (!healthy).then(|| "Cache backend is not responding".to_string()),
        latency_ms: start.elapsed().as_millis() as u64,
    }
}

async fn check_store(store: &dyn UserStore) -> HealthCheck {
    let start = Instant::now();

    match store.ping().await {
        Ok(()) => HealthCheck {
            name: "store".to_string(),
            status: HealthStatus::Healthy,
            message: None,
            latency_ms: start.elapsed().as_millis() as u64,
        },
        Err(e) => HealthCheck {
            name: "store".to_string(),
            status: HealthStatus::Unhealthy,
            message: Some(e.to_string()),
            latency_ms: start.elapsed().as_millis() as u64,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockCache;
    use crate::domain::user::MockUserStore;
    use crate::domain::DomainError;
    use crate::infrastructure::user::InMemoryUserStore;
    use std::sync::Arc;

    #[test]
    fn test_health_status_serialization() {
        assert_eq!(serde_json::to_string(&HealthStatus::Healthy).unwrap(), "\"healthy\"");
        assert_eq!(serde_json::to_string(&HealthStatus::Degraded).unwrap(), "\"degraded\"");
        assert_eq!(serde_json::to_string(&HealthStatus::Unhealthy).unwrap(), "\"unhealthy\"");
    }

    #[tokio::test]
    async fn test_all_healthy() {
        let cache = CacheClient::new(Arc::new(MockCache::new()));
        let report = check(&cache, &InMemoryUserStore::new()).await;

        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.checks.len(), 2);

        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("message"));
    }

    #[tokio::test]
    async fn test_cache_down_is_degraded() {
        let cache = CacheClient::new(Arc::new(MockCache::failing()));
        let report = check(&cache, &InMemoryUserStore::new()).await;

        assert_eq!(report.status, HealthStatus::Degraded);
        assert!(!report.is_unhealthy());
    }

    #[tokio::test]
    async fn test_store_down_is_unhealthy() {
        let mut store = MockUserStore::new();
        store
            .expect_ping()
            .returning(|| Err(DomainError::storage("connection refused")));
        let cache = CacheClient::new(Arc::new(MockCache::new()));

        let report = check(&cache, &store).await;

        assert!(report.is_unhealthy());
        assert_eq!(
            report.checks[1].message.as_deref(),
            Some("Storage error: connection refused")
        );
    }
}
