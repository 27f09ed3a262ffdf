//! List query criteria

use serde::{Deserialize, Serialize};

use super::entity::User;
use crate::domain::cache::{CacheKeyGenerator, CacheKeyParams, DefaultKeyGenerator};
use crate::domain::DomainError;

pub const DEFAULT_LIST_LIMIT: u64 = 100;
pub const MAX_LIST_LIMIT: u64 = 100;
/// Largest offset a SQL `OFFSET` (BIGINT) accepts
pub const MAX_LIST_SKIP: u64 = i64::MAX as u64;

/// Pagination and filters for listing users
///
/// Results are ordered by id ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCriteria {
    pub skip: u64,
    pub limit: u64,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
}

impl Default for ListCriteria {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIST_LIMIT,
            is_active: None,
            is_superuser: None,
        }
    }
}

impl ListCriteria {
    pub fn new(skip: u64, limit: u64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn superuser(mut self, is_superuser: bool) -> Self {
        self.is_superuser = Some(is_superuser);
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.limit == 0 || self.limit > MAX_LIST_LIMIT {
            return Err(DomainError::validation(format!(
                "limit must be between 1 and {}, got {}",
                MAX_LIST_LIMIT, self.limit
            )));
        }
        if self.skip > MAX_LIST_SKIP {
            return Err(DomainError::validation(format!(
                "skip must be at most {}, got {}",
                MAX_LIST_SKIP, self.skip
            )));
        }
        Ok(())
    }

    /// Whether a user passes the filters (pagination not applied)
    pub fn matches(&self, user: &User) -> bool {
        self.is_active.is_none_or(|active| user.is_active() == active)
            && self
                .is_superuser
                .is_none_or(|superuser| user.is_superuser() == superuser)
    }

    /// Deterministic digest of these criteria, used as the list cache key suffix
    ///
    /// Components are sorted by name before hashing, so two criteria with the
    /// same values always produce the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let params = CacheKeyParams::new("users")
            .with_component("skip", self.skip.to_string())
            .with_component("limit", self.limit.to_string())
            .with_optional_component("is_active", self.is_active)
            .with_optional_component("is_superuser", self.is_superuser);

        DefaultKeyGenerator::new().with_short_hash().generate(&params)
    }
}
