//! Password hashing using Argon2id

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as Argon2PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use std::fmt::Debug;

use crate::domain::DomainError;

/// Memory cost in KiB (64 MiB)
pub const DEFAULT_MEMORY_KIB: u32 = 65_536;
pub const DEFAULT_ITERATIONS: u32 = 4;
pub const DEFAULT_PARALLELISM: u32 = 4;
const HASH_LEN: usize = 32;

/// Trait for password hashing operations
pub trait PasswordHasher: Send + Sync + Debug {
    fn hash(&self, password: &str) -> Result<String, DomainError>;

    /// Verify a password against a stored hash; malformed hashes never verify
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Argon2id hasher producing PHC strings
///
/// Verification reads the parameters back out of the PHC string, so hashes
/// made with older settings keep verifying after the defaults change.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::with_params(DEFAULT_MEMORY_KIB, DEFAULT_ITERATIONS, DEFAULT_PARALLELISM)
            .unwrap_or_else(|_| Self {
                params: Params::default(),
            })
    }

    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, DomainError> {
        let params = Params::new(memory_kib, iterations, parallelism, Some(HASH_LEN))
            .map_err(|e| DomainError::configuration(format!("Invalid Argon2 parameters: {}", e)))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, DomainError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DomainError::internal(format!("Failed to hash password: {}", e)))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };

        self.argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> Argon2Hasher {
        Argon2Hasher::with_params(1024, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let hash = hasher.hash("testpass123").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("testpass123", &hash));
        assert!(!hasher.verify("wrongpass123", &hash));
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = fast_hasher();

        let hash1 = hasher.hash("testpass123").unwrap();
        let hash2 = hasher.hash("testpass123").unwrap();

        assert_ne!(hash1, hash2);
        assert!(hasher.verify("testpass123", &hash1));
        assert!(hasher.verify("testpass123", &hash2));
    }

    #[test]
    fn test_verify_uses_parameters_from_hash() {
        let hash = fast_hasher().hash("testpass123").unwrap();

        let other = Argon2Hasher::with_params(2048, 2, 1).unwrap();
        assert!(other.verify("testpass123", &hash));
    }

    #[test]
    fn test_default_parameters() {
        let hasher = Argon2Hasher::new();
        let hash = hasher.hash("testpass123").unwrap();

        assert!(hash.contains("m=65536,t=4,p=4"));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        let hasher = fast_hasher();

        assert!(!hasher.verify("testpass123", ""));
        assert!(!hasher.verify("testpass123", "not-a-phc-string"));
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(Argon2Hasher::with_params(1, 0, 1).is_err());
    }
}
