use serde::Deserialize;

use crate::infrastructure::cache::CacheConfig;
use crate::infrastructure::storage::StoreConfig;

/// Application configuration
///
/// Sources, lowest precedence first: `config/default`, `config/local`,
/// `APP__`-prefixed environment variables (`APP__CACHE__ENTITY_TTL_SECS=60`),
/// then `REDIS_URL` and `DATABASE_URL`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub cache: CacheConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(
            config::Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
            std::env::var("REDIS_URL").ok(),
            std::env::var("DATABASE_URL").ok(),
        )
    }

    fn load_from(
        environment: config::Environment,
        redis_url: Option<String>,
        database_url: Option<String>,
    ) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(environment)
            .set_override_option("cache.url", redis_url)?
            .set_override_option("store.url", database_url)?
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cache::CacheType;
    use crate::infrastructure::storage::StoreType;
    use std::collections::HashMap;

    fn environment(vars: &[(&str, &str)]) -> config::Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        config::Environment::with_prefix("APP")
            .separator("__")
            .try_parsing(true)
            .source(Some(source))
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::load_from(environment(&[]), None, None).unwrap();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.cache.backend, CacheType::Redis);
        assert_eq!(config.cache.entity_ttl_secs, 3600);
        assert_eq!(config.cache.list_ttl_secs, 300);
        assert_eq!(config.cache.retry.max_attempts, 5);
        assert_eq!(config.store.backend, StoreType::Postgres);
        assert!(config.store.ensure_schema);
    }

    #[test]
    fn test_environment_overrides() {
        let config = AppConfig::load_from(
            environment(&[
                ("APP__LOGGING__FORMAT", "json"),
                ("APP__CACHE__BACKEND", "in_memory"),
                ("APP__CACHE__LIST_TTL_SECS", "30"),
                ("APP__CACHE__RETRY__MAX_ATTEMPTS", "2"),
                ("APP__STORE__BACKEND", "in_memory"),
            ]),
            None,
            None,
        )
        .unwrap();

        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.cache.backend, CacheType::InMemory);
        assert_eq!(config.cache.list_ttl_secs, 30);
        assert_eq!(config.cache.entity_ttl_secs, 3600);
        assert_eq!(config.cache.retry.max_attempts, 2);
        assert_eq!(config.store.backend, StoreType::InMemory);
    }

    #[test]
    fn test_connection_urls_override_everything() {
        let config = AppConfig::load_from(
            environment(&[("APP__CACHE__URL", "redis://from-app-env:6379")]),
            Some("redis://cache.internal:6379/2".to_string()),
            Some("postgres://db.internal/users".to_string()),
        )
        .unwrap();

        assert_eq!(config.cache.url, "redis://cache.internal:6379/2");
        assert_eq!(config.store.url, "postgres://db.internal/users");
    }
}
