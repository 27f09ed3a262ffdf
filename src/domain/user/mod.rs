//! User domain
//!
//! Domain types and traits for user records: the entity and its public
//! profile, list criteria, validation rules, and the store trait.

mod criteria;
mod entity;
mod repository;
mod validation;

pub use criteria::{ListCriteria, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT, MAX_LIST_SKIP};
pub use entity::{NewUser, User, UserChange, UserChanges, UserId, UserProfile};
pub use repository::UserStore;
pub use validation::{
    normalize_email, validate_email, validate_full_name, validate_password, validate_user_id,
    validate_username, UserValidationError,
};

#[cfg(test)]
pub use repository::MockUserStore;
