//! Cache key generation strategies

use std::collections::BTreeMap;
use std::fmt::{Debug, Display};

use sha2::{Digest, Sha256};

/// Length of hashed key fragments, in hex characters
const SHORT_HASH_LEN: usize = 32;

/// Trait for generating cache keys from input data
pub trait CacheKeyGenerator: Send + Sync + Debug {
    /// Generates a cache key from the given components
    fn generate(&self, params: &CacheKeyParams) -> String;

    /// Generates a key with a namespace prefix
    fn generate_with_namespace(&self, namespace: &str, params: &CacheKeyParams) -> String {
        format!("{}:{}", namespace, self.generate(params))
    }
}

/// Parameters for cache key generation
#[derive(Debug, Clone, Default)]
pub struct CacheKeyParams {
    /// Primary identifier
    pub primary: String,
    /// Secondary components (sorted for consistency)
    pub components: BTreeMap<String, String>,
}

impl CacheKeyParams {
    /// Creates new cache key parameters with a primary identifier
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            components: BTreeMap::new(),
        }
    }

    /// Adds a component to the key parameters
    pub fn with_component(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.components.insert(key.into(), value.into());
        self
    }

    /// Adds a component only when a value is present
    pub fn with_optional_component<V: Display>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with_component(key, v.to_string()),
            None => self,
        }
    }
}

/// Default cache key generator
///
/// With short hashing enabled the key is a truncated SHA-256 digest, which is
/// stable across processes so every instance sharing a Redis computes the same
/// key for the same parameters.
#[derive(Debug, Clone, Default)]
pub struct DefaultKeyGenerator {
    use_short_hash: bool,
}

impl DefaultKeyGenerator {
    /// Creates a new default key generator
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator that produces hashed keys
    pub fn with_short_hash(mut self) -> Self {
        self.use_short_hash = true;
        self
    }

    fn hash_string(input: &str) -> String {
        let digest = Sha256::digest(input.as_bytes());
        let mut encoded = hex::encode(digest);
        encoded.truncate(SHORT_HASH_LEN);
        encoded
    }
}

impl CacheKeyGenerator for DefaultKeyGenerator {
    fn generate(&self, params: &CacheKeyParams) -> String {
        let mut parts = vec![params.primary.clone()];

        for (k, v) in &params.components {
            parts.push(format!("{}={}", k, v));
        }

        let combined = parts.join(":");

        if self.use_short_hash {
            Self::hash_string(&combined)
        } else {
            combined
        }
    }
}

/// Key layout for one cached entity type
///
/// - `{ns}:{id}` for lookups by primary id
/// - `{ns}:email:{email}` for lookups by the secondary unique field
/// - `{ns}:list:{fingerprint}` for list results
#[derive(Debug, Clone)]
pub struct EntityKeys {
    namespace: String,
}

impl EntityKeys {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn by_id(&self, id: impl Display) -> String {
        format!("{}:{}", self.namespace, id)
    }

    pub fn by_email(&self, email: &str) -> String {
        format!("{}:email:{}", self.namespace, email)
    }

    pub fn list(&self, fingerprint: &str) -> String {
        format!("{}:list:{}", self.namespace, fingerprint)
    }

    /// Glob matching every list entry of this namespace
    pub fn list_pattern(&self) -> String {
        format!("{}:list:*", self.namespace)
    }
}
