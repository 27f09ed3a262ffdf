//! Domain layer - Core entities, traits and errors

pub mod cache;
pub mod error;
pub mod user;

pub use cache::{Cache, CacheOp, CacheOpResult, CachePipeline, EntityKeys, RetryPolicy};
pub use error::DomainError;
pub use user::{
    ListCriteria, NewUser, User, UserChange, UserChanges, UserId, UserProfile, UserStore,
};
