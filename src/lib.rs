//! User Cache Core
//!
//! Cache-aside coordination for user records:
//! - Redis (or in-process) read-through cache keyed by id and email
//! - PostgreSQL (or in-memory) durable store
//! - Coarse invalidation of cached list queries on every write
//! - Fail-soft cache access: a cache outage only costs latency

pub mod cli;
pub mod config;
pub mod domain;
pub mod health;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::info;

use domain::DomainError;
use health::HealthReport;
use infrastructure::cache::{CacheClient, CacheFactory};
use infrastructure::services::{UserCacheConfig, UserCacheCoordinator};
use infrastructure::storage::StoreFactory;
use infrastructure::user::{Argon2Hasher, UserService};

/// Wired application components
pub struct AppContext {
    pub config: AppConfig,
    pub coordinator: Arc<UserCacheCoordinator>,
    pub users: UserService<Argon2Hasher>,
}

impl AppContext {
    /// Builds every component from configuration
    ///
    /// The cache never blocks startup; the store must be reachable.
    pub async fn build(config: &AppConfig) -> Result<Self, DomainError> {
        let backend = CacheFactory::new().create(&config.cache)?;
        let cache = CacheClient::new(backend).with_operation_timeout(config.cache.operation_timeout());
        info!(backend = %config.cache.backend, "Cache backend configured");

        let store = StoreFactory::create(&config.store).await?;
        info!(backend = ?config.store.backend, "User store ready");

        let coordinator = Arc::new(UserCacheCoordinator::new(
            store,
            cache,
            UserCacheConfig::from(&config.cache),
        ));
        let users = UserService::new(coordinator.clone(), Arc::new(Argon2Hasher::new()));

        Ok(Self {
            config: config.clone(),
            coordinator,
            users,
        })
    }

    pub async fn health(&self) -> HealthReport {
        health::check(self.coordinator.cache(), self.coordinator.store().as_ref()).await
    }

    /// Releases cache connections and the store pool
    pub async fn shutdown(&self) {
        self.coordinator.cache().close().await;
        self.coordinator.store().close().await;
        info!("Connections closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::ListCriteria;
    use crate::health::HealthStatus;
    use crate::infrastructure::cache::CacheConfig;
    use crate::infrastructure::storage::StoreConfig;
    use crate::infrastructure::user::CreateUserRequest;

    fn in_memory_config() -> AppConfig {
        AppConfig {
            cache: CacheConfig::in_memory(),
            store: StoreConfig::in_memory(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_build_in_memory_context() {
        let ctx = AppContext::build(&in_memory_config()).await.unwrap();

        let created = ctx
            .users
            .create(CreateUserRequest::new("carol@example.com", "carol", "testpass123"))
            .await
            .unwrap();

        assert_eq!(ctx.users.get(created.id.value()).await.unwrap(), Some(created.clone()));
        assert_eq!(
            ctx.users.list(&ListCriteria::default()).await.unwrap(),
            vec![created]
        );

        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn test_health_of_in_memory_context() {
        let ctx = AppContext::build(&in_memory_config()).await.unwrap();

        let report = ctx.health().await;
        assert_eq!(report.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_cache_config() {
        let mut config = in_memory_config();
        config.cache.entity_ttl_secs = 0;

        assert!(matches!(
            AppContext::build(&config).await,
            Err(DomainError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_build_with_redis_down_still_succeeds() {
        let mut config = in_memory_config();
        config.cache = CacheConfig::redis("redis://127.0.0.1:1/0");
        config.cache.operation_timeout_ms = 200;

        let ctx = AppContext::build(&config).await.unwrap();
        let created = ctx
            .users
            .create(CreateUserRequest::new("dave@example.com", "dave", "testpass123"))
            .await
            .unwrap();

        assert_eq!(ctx.users.get(created.id.value()).await.unwrap(), Some(created));
        assert_eq!(ctx.health().await.status, HealthStatus::Degraded);
    }
}
