// Password hashing and verification

use crate::{AuthError, Result};

/// Bcrypt password hasher
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Create a hasher with the given bcrypt cost (4..=31).
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password
    pub fn hash(&self, password: &str) -> Result<String> {
        bcrypt::hash(password, self.cost).map_err(|e| AuthError::PasswordHashError(e.to_string()))
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

/// Password verifier
pub trait PasswordVerifier {
    /// Verify a password against a hash
    fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}

impl PasswordVerifier for PasswordHasher {
    fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        if !hash.starts_with("$2") {
            return Err(AuthError::PasswordVerifyError(
                "Unknown hash format".to_string(),
            ));
        }
        bcrypt::verify(password, hash).map_err(|e| AuthError::PasswordVerifyError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bcrypt_hashing() {
        let hasher = PasswordHasher::new(4);
        let password = "test-password-123";

        let hash = hasher.hash(password).unwrap();
        assert!(hash.starts_with("$2"));
        assert_ne!(hash, hasher.hash(password).unwrap());

        assert!(hasher.verify(password, &hash).unwrap());
        assert!(!hasher.verify("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_unknown_hash_format() {
        let hasher = PasswordHasher::new(4);
        assert!(matches!(
            hasher.verify("pw", "plaintext"),
            Err(AuthError::PasswordVerifyError(_))
        ));
    }

    #[test]
    fn test_default_cost() {
        assert_eq!(PasswordHasher::default().cost(), bcrypt::DEFAULT_COST);
    }
}
