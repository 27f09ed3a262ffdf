//! Store factory for runtime store selection

use std::sync::Arc;

use serde::Deserialize;

use crate::domain::user::UserStore;
use crate::domain::DomainError;
use crate::infrastructure::user::{InMemoryUserStore, PostgresUserStore};

use super::postgres::{self, PostgresConfig};

/// Supported store types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    #[default]
    Postgres,
    /// In-memory store (for testing/development)
    InMemory,
}

impl StoreType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            _ => None,
        }
    }
}

/// Store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreType,
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    /// Create the users table at startup if it is missing
    pub ensure_schema: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let pg = PostgresConfig::default();

        Self {
            backend: StoreType::Postgres,
            url: pg.url,
            max_connections: pg.max_connections,
            min_connections: pg.min_connections,
            connect_timeout_secs: pg.connect_timeout_secs,
            idle_timeout_secs: pg.idle_timeout_secs,
            ensure_schema: true,
        }
    }
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self {
            backend: StoreType::InMemory,
            ..Default::default()
        }
    }

    pub fn postgres_url(url: impl Into<String>) -> Self {
        Self {
            backend: StoreType::Postgres,
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn postgres_config(&self) -> PostgresConfig {
        PostgresConfig::new(self.url.clone())
            .with_max_connections(self.max_connections)
            .with_min_connections(self.min_connections)
            .with_connect_timeout(self.connect_timeout_secs)
            .with_idle_timeout(self.idle_timeout_secs)
    }
}

/// Factory for creating user stores
#[derive(Debug)]
pub struct StoreFactory;

impl StoreFactory {
    /// Creates a store based on the configuration
    ///
    /// Unlike the cache, an unreachable database is a startup error.
    pub async fn create(config: &StoreConfig) -> Result<Arc<dyn UserStore>, DomainError> {
        match config.backend {
            StoreType::InMemory => Ok(Arc::new(InMemoryUserStore::new())),
            StoreType::Postgres => Ok(Self::create_postgres(config).await?),
        }
    }

    pub async fn create_postgres(config: &StoreConfig) -> Result<Arc<PostgresUserStore>, DomainError> {
        if config.url.is_empty() {
            return Err(DomainError::configuration("Database URL is required for Postgres store"));
        }

        let pool = postgres::connect(&config.postgres_config()).await?;
        let store = PostgresUserStore::new(pool);

        if config.ensure_schema {
            store.ensure_schema().await?;
        }

        Ok(Arc::new(store))
    }
}
