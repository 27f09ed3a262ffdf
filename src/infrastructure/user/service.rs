//! User service: validation and password hashing in front of the coordinator

use std::sync::Arc;

use crate::domain::user::{
    normalize_email, validate_email, validate_full_name, validate_password, validate_username,
    ListCriteria, NewUser, UserChanges, UserId, UserProfile, UserValidationError,
};
use crate::domain::DomainError;
use crate::infrastructure::services::UserCacheCoordinator;

use super::password::PasswordHasher;

/// Request for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
}

impl CreateUserRequest {
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            password: password.into(),
            full_name: None,
            is_active: true,
            is_superuser: false,
        }
    }
}

/// Request for a partial update; unset fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
}

fn invalid(e: UserValidationError) -> DomainError {
    DomainError::validation(e.to_string())
}

/// User management entry point
#[derive(Debug)]
pub struct UserService<H: PasswordHasher> {
    coordinator: Arc<UserCacheCoordinator>,
    hasher: Arc<H>,
}

impl<H: PasswordHasher> UserService<H> {
    pub fn new(coordinator: Arc<UserCacheCoordinator>, hasher: Arc<H>) -> Self {
        Self { coordinator, hasher }
    }

    /// Create a new user
    pub async fn create(&self, request: CreateUserRequest) -> Result<UserProfile, DomainError> {
        validate_email(&request.email).map_err(invalid)?;
        validate_username(&request.username).map_err(invalid)?;
        validate_password(&request.password).map_err(invalid)?;
        if let Some(full_name) = &request.full_name {
            validate_full_name(full_name).map_err(invalid)?;
        }

        let password_hash = self.hasher.hash(&request.password)?;

        let mut new_user = NewUser::new(normalize_email(&request.email), request.username, password_hash)
            .with_active(request.is_active)
            .with_superuser(request.is_superuser);
        if let Some(full_name) = request.full_name {
            new_user = new_user.with_full_name(full_name);
        }

        self.coordinator.create(new_user).await
    }

    /// Update a user; `NotFound` if it does not exist
    pub async fn update(&self, id: i64, request: UpdateUserRequest) -> Result<UserProfile, DomainError> {
        let user_id = parse_id(id)?;
        let mut changes = UserChanges::new();

        if let Some(email) = request.email {
            validate_email(&email).map_err(invalid)?;
            changes = changes.email(email);
        }
        if let Some(username) = request.username {
            validate_username(&username).map_err(invalid)?;
            changes = changes.username(username);
        }
        if let Some(full_name) = request.full_name {
            validate_full_name(&full_name).map_err(invalid)?;
            changes = changes.full_name(full_name);
        }
        if let Some(is_active) = request.is_active {
            changes = changes.active(is_active);
        }
        if let Some(is_superuser) = request.is_superuser {
            changes = changes.superuser(is_superuser);
        }
        if let Some(password) = request.password {
            validate_password(&password).map_err(invalid)?;
            changes = changes.password_hash(self.hasher.hash(&password)?);
        }

        if changes.is_empty() {
            return Err(DomainError::validation("No fields to update"));
        }

        self.coordinator
            .update(user_id, &changes)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("User {} not found", id)))
    }

    /// Get a user by id
    pub async fn get(&self, id: i64) -> Result<Option<UserProfile>, DomainError> {
        self.coordinator.get_by_id(parse_id(id)?).await
    }

    /// Get a user by email
    pub async fn get_by_email(&self, email: &str) -> Result<Option<UserProfile>, DomainError> {
        validate_email(email).map_err(invalid)?;
        self.coordinator.get_by_email(email).await
    }

    pub async fn list(&self, criteria: &ListCriteria) -> Result<Vec<UserProfile>, DomainError> {
        self.coordinator.list(criteria).await
    }

    /// Delete a user; `NotFound` if it does not exist
    pub async fn delete(&self, id: i64) -> Result<(), DomainError> {
        if self.coordinator.delete(parse_id(id)?).await? {
            Ok(())
        } else {
            Err(DomainError::not_found(format!("User {} not found", id)))
        }
    }
}

fn parse_id(id: i64) -> Result<UserId, DomainError> {
    UserId::new(id).map_err(|e| DomainError::invalid_id(e.to_string()))
}
