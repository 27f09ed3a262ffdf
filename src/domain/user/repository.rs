//! User store trait

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::criteria::ListCriteria;
use super::entity::{NewUser, User, UserChange, UserChanges, UserId};
use crate::domain::DomainError;

/// Durable storage for users
///
/// Absence is reported as `None`; errors mean the durable layer failed (or, for
/// writes, rejected the data with `Conflict`).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get a user by id
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError>;

    /// Get a user by email (case-insensitive)
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    /// List users matching the criteria, ordered by id
    async fn find_many(&self, criteria: &ListCriteria) -> Result<Vec<User>, DomainError>;

    /// Insert a user, assigning its id
    async fn insert(&self, new_user: NewUser) -> Result<User, DomainError>;

    /// Apply a partial update, returning the record before and after
    async fn update(
        &self,
        id: UserId,
        changes: &UserChanges,
    ) -> Result<Option<UserChange>, DomainError>;

    /// Delete a user, returning the removed record
    async fn delete(&self, id: UserId) -> Result<Option<User>, DomainError>;

    /// Checks that the store is reachable
    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }

    /// Releases pooled connections
    async fn close(&self) {}
}
