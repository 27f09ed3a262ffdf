//! User infrastructure
//!
//! Store implementations (PostgreSQL and in-memory), Argon2 password hashing,
//! and the user service that validates requests before they reach the cache
//! coordinator.

mod password;
mod postgres_repository;
mod repository;
mod service;

pub use password::{Argon2Hasher, PasswordHasher};
pub use postgres_repository::PostgresUserStore;
pub use repository::InMemoryUserStore;
pub use service::{CreateUserRequest, UpdateUserRequest, UserService};
