//! In-memory user store implementation

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::user::{ListCriteria, NewUser, User, UserChange, UserChanges, UserId, UserStore};
use crate::domain::DomainError;

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<UserId, User>,
    email_index: HashMap<String, UserId>,
    username_index: HashMap<String, UserId>,
    last_id: i64,
}

impl State {
    fn check_unique(&self, email: &str, username: &str, owner: Option<UserId>) -> Result<(), DomainError> {
        if let Some(id) = self.email_index.get(email) {
            if Some(*id) != owner {
                return Err(DomainError::conflict(format!(
                    "Email '{}' is already registered",
                    email
                )));
            }
        }

        if let Some(id) = self.username_index.get(username) {
            if Some(*id) != owner {
                return Err(DomainError::conflict(format!(
                    "Username '{}' is already taken",
                    username
                )));
            }
        }

        Ok(())
    }
}

/// In-memory implementation of UserStore
///
/// Ids are assigned from a monotonic counter and never reused. Email and
/// username uniqueness is enforced the way the database constraints do.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let state = self.state.read().await;
        let email = crate::domain::user::normalize_email(email);

        Ok(state
            .email_index
            .get(&email)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn find_many(&self, criteria: &ListCriteria) -> Result<Vec<User>, DomainError> {
        let state = self.state.read().await;

        Ok(state
            .users
            .values()
            .filter(|user| criteria.matches(user))
            .skip(criteria.skip as usize)
            .take(criteria.limit as usize)
            .cloned()
            .collect())
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, DomainError> {
        let mut state = self.state.write().await;

        state.check_unique(&new_user.email, &new_user.username, None)?;

        let id = UserId::new(state.last_id + 1)
            .map_err(|e| DomainError::internal(format!("Failed to assign user id: {}", e)))?;
        state.last_id = id.value();

        let user = User::from_new(id, new_user);
        state.email_index.insert(user.email().to_string(), id);
        state.username_index.insert(user.username().to_string(), id);
        state.users.insert(id, user.clone());

        Ok(user)
    }

    async fn update(&self, id: UserId, changes: &UserChanges) -> Result<Option<UserChange>, DomainError> {
        let mut state = self.state.write().await;

        let Some(before) = state.users.get(&id).cloned() else {
            return Ok(None);
        };

        let mut after = before.clone();
        after.apply(changes);
        state.check_unique(after.email(), after.username(), Some(id))?;

        state.email_index.remove(before.email());
        state.username_index.remove(before.username());
        state.email_index.insert(after.email().to_string(), id);
        state.username_index.insert(after.username().to_string(), id);
        state.users.insert(id, after.clone());

        Ok(Some(UserChange { before, after }))
    }

    async fn delete(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let mut state = self.state.write().await;

        let Some(user) = state.users.remove(&id) else {
            return Ok(None);
        };

        state.email_index.remove(user.email());
        state.username_index.remove(user.username());

        Ok(Some(user))
    }
}
