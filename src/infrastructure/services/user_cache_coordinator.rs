//! Cache-aside coordination for user records
//!
//! Reads check the cache first and fall back to the store, populating the cache
//! on the way out. Writes go to the store first; only after the store accepts
//! them are cache entries refreshed or invalidated.
//!
//! Keys, with `ns` the configured namespace:
//! - `{ns}:{id}` and `{ns}:email:{email}` hold the same profile snapshot
//! - `{ns}:list:{fingerprint}` holds one page of results for one criteria set
//!
//! Any write drops every list entry; list TTLs are kept short so a missed
//! invalidation heals quickly.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::domain::cache::{CachePipeline, EntityKeys};
use crate::domain::user::{normalize_email, ListCriteria, NewUser, UserChanges, UserId, UserProfile, UserStore};
use crate::domain::DomainError;
use crate::infrastructure::cache::{CacheClient, CacheConfig};
use crate::infrastructure::observability;

const KIND_ENTITY: &str = "entity";
const KIND_LIST: &str = "list";

/// Configuration for user caching
#[derive(Debug, Clone)]
pub struct UserCacheConfig {
    pub namespace: String,
    /// TTL for `{ns}:{id}` and `{ns}:email:{email}` entries
    pub entity_ttl: Duration,
    /// TTL for `{ns}:list:*` entries
    pub list_ttl: Duration,
    /// Also write each user of a freshly loaded list to its id key
    pub warm_entities_from_lists: bool,
}

impl Default for UserCacheConfig {
    fn default() -> Self {
        Self {
            namespace: "user".to_string(),
            entity_ttl: Duration::from_secs(3600),
            list_ttl: Duration::from_secs(300),
            warm_entities_from_lists: true,
        }
    }
}

impl UserCacheConfig {
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_entity_ttl(mut self, ttl: Duration) -> Self {
        self.entity_ttl = ttl;
        self
    }

    pub fn with_list_ttl(mut self, ttl: Duration) -> Self {
        self.list_ttl = ttl;
        self
    }

    pub fn without_list_warming(mut self) -> Self {
        self.warm_entities_from_lists = false;
        self
    }
}

impl From<&CacheConfig> for UserCacheConfig {
    fn from(config: &CacheConfig) -> Self {
        Self::default()
            .with_namespace(config.namespace.clone())
            .with_entity_ttl(config.entity_ttl())
            .with_list_ttl(config.list_ttl())
    }
}

/// Read-through / write-invalidate coordinator between the cache and the store
///
/// The store is the source of truth: its errors are returned to the caller.
/// The cache is best effort: its failures only cost latency.
pub struct UserCacheCoordinator {
    store: Arc<dyn UserStore>,
    cache: CacheClient,
    keys: EntityKeys,
    config: UserCacheConfig,
}

impl std::fmt::Debug for UserCacheCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCacheCoordinator")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}

impl UserCacheCoordinator {
    pub fn new(store: Arc<dyn UserStore>, cache: CacheClient, config: UserCacheConfig) -> Self {
        let keys = EntityKeys::new(config.namespace.clone());

        Self {
            store,
            cache,
            keys,
            config,
        }
    }

    pub fn cache(&self) -> &CacheClient {
        &self.cache
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    /// Get a user by id
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<UserProfile>, DomainError> {
        let key = self.keys.by_id(id);

        if let Some(profile) = self.cache.get_json::<UserProfile>(&key).await {
            if profile.id == id {
                debug!(key = %key, user_id = %id, "User cache hit");
                observability::record_cache_hit(KIND_ENTITY);
                return Ok(Some(profile));
            }

            warn!(key = %key, cached_id = %profile.id, "Cached user does not match key, discarding");
            self.cache.delete(&key).await;
        }

        debug!(key = %key, user_id = %id, "User cache miss");
        observability::record_cache_miss(KIND_ENTITY);

        let Some(user) = self.timed("find_by_id", self.store.find_by_id(id)).await? else {
            return Ok(None);
        };

        let profile = user.profile();
        self.cache.set_json(&key, &profile, self.config.entity_ttl).await;

        Ok(Some(profile))
    }

    /// Get a user by email (case-insensitive)
    pub async fn get_by_email(&self, email: &str) -> Result<Option<UserProfile>, DomainError> {
        let email = normalize_email(email);
        let key = self.keys.by_email(&email);

        if let Some(profile) = self.cache.get_json::<UserProfile>(&key).await {
            if profile.email == email {
                debug!(key = %key, user_id = %profile.id, "User cache hit");
                observability::record_cache_hit(KIND_ENTITY);
                return Ok(Some(profile));
            }

            warn!(key = %key, cached_email = %profile.email, "Cached user does not match key, discarding");
            self.cache.delete(&key).await;
        }

        debug!(key = %key, "User cache miss");
        observability::record_cache_miss(KIND_ENTITY);

        let Some(user) = self.timed("find_by_email", self.store.find_by_email(&email)).await? else {
            return Ok(None);
        };

        let profile = user.profile();
        self.populate_identity(&profile).await;

        Ok(Some(profile))
    }

    /// List users matching the criteria
    pub async fn list(&self, criteria: &ListCriteria) -> Result<Vec<UserProfile>, DomainError> {
        criteria.validate()?;

        let key = self.keys.list(&criteria.fingerprint());

        if let Some(profiles) = self.cache.get_json::<Vec<UserProfile>>(&key).await {
            debug!(key = %key, count = profiles.len(), "User list cache hit");
            observability::record_cache_hit(KIND_LIST);
            return Ok(profiles);
        }

        debug!(key = %key, "User list cache miss");
        observability::record_cache_miss(KIND_LIST);

        let users = self.timed("find_many", self.store.find_many(criteria)).await?;
        let profiles: Vec<UserProfile> = users.iter().map(|user| user.profile()).collect();

        self.populate_list(&key, &profiles).await;

        Ok(profiles)
    }

    /// Create a user, then cache it under both identity keys
    pub async fn create(&self, new_user: NewUser) -> Result<UserProfile, DomainError> {
        let user = self.timed("insert", self.store.insert(new_user)).await?;
        let profile = user.profile();

        debug!(user_id = %profile.id, "User created");
        self.populate_identity(&profile).await;
        self.invalidate_lists().await;

        Ok(profile)
    }

    /// Apply a partial update, then drop the affected entries
    ///
    /// Returns `None` when the user does not exist; nothing is invalidated then.
    pub async fn update(
        &self,
        id: UserId,
        changes: &UserChanges,
    ) -> Result<Option<UserProfile>, DomainError> {
        let Some(change) = self.timed("update", self.store.update(id, changes)).await? else {
            return Ok(None);
        };

        let mut stale_keys = vec![
            self.keys.by_id(id),
            self.keys.by_email(change.before.email()),
        ];
        if change.email_changed() {
            stale_keys.push(self.keys.by_email(change.after.email()));
        }

        debug!(user_id = %id, email_changed = change.email_changed(), "User updated");
        self.invalidate_keys(stale_keys).await;
        self.invalidate_lists().await;

        Ok(Some(change.after.profile()))
    }

    /// Delete a user, then drop its entries; returns whether it existed
    pub async fn delete(&self, id: UserId) -> Result<bool, DomainError> {
        let Some(user) = self.timed("delete", self.store.delete(id)).await? else {
            return Ok(false);
        };

        debug!(user_id = %id, "User deleted");
        self.invalidate_keys(vec![self.keys.by_id(id), self.keys.by_email(user.email())])
            .await;
        self.invalidate_lists().await;

        Ok(true)
    }

    /// Runs a store call, recording its latency and outcome
    async fn timed<T, F>(&self, operation: &'static str, call: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        let started = Instant::now();
        let result = call.await;

        observability::record_store_query(operation, started.elapsed(), result.is_ok());
        match &result {
            Err(e) if e.is_storage() => error!(operation, error = %e, "Store operation failed"),
            Err(e) => debug!(operation, error = %e, "Store rejected operation"),
            Ok(_) => {}
        }

        result
    }

    /// Writes one snapshot under both identity keys in a single round trip
    async fn populate_identity(&self, profile: &UserProfile) {
        let payload = match CacheClient::encode(profile) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(user_id = %profile.id, error = %e, "Failed to serialize user for cache");
                return;
            }
        };

        let pipeline = CachePipeline::new()
            .set(self.keys.by_id(profile.id), payload.clone(), self.config.entity_ttl)
            .set(self.keys.by_email(&profile.email), payload, self.config.entity_ttl);

        if self.cache.pipeline(pipeline).await.is_none() {
            debug!(user_id = %profile.id, "Skipped caching user");
        }
    }

    async fn populate_list(&self, key: &str, profiles: &[UserProfile]) {
        let payload = match CacheClient::encode(&profiles) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize user list for cache");
                return;
            }
        };

        let mut pipeline = CachePipeline::new().set(key, payload, self.config.list_ttl);

        if self.config.warm_entities_from_lists {
            for profile in profiles {
                if let Ok(entity) = CacheClient::encode(profile) {
                    pipeline = pipeline.set(self.keys.by_id(profile.id), entity, self.config.entity_ttl);
                }
            }
        }

        if self.cache.pipeline(pipeline).await.is_none() {
            debug!(key, "Skipped caching user list");
        }
    }

    /// Deletes identity keys in one round trip
    ///
    /// A failed batch is not retried key by key: the cache is down, and the
    /// entity TTL bounds how long a stale entry can be served.
    async fn invalidate_keys(&self, keys: Vec<String>) {
        let count = keys.len();
        let pipeline = keys
            .iter()
            .fold(CachePipeline::new(), |pipeline, key| pipeline.delete(key.as_str()));

        if self.cache.pipeline(pipeline).await.is_some() {
            observability::record_cache_invalidation(KIND_ENTITY, count);
        } else {
            warn!(keys = ?keys, "Could not invalidate user entries; they expire with their TTL");
        }
    }

    async fn invalidate_lists(&self) {
        let pattern = self.keys.list_pattern();

        if self.cache.delete_pattern(&pattern).await {
            observability::record_cache_invalidation(KIND_LIST, 1);
        } else {
            warn!(pattern = %pattern, "Could not invalidate user lists; they expire with their TTL");
        }
    }
}
