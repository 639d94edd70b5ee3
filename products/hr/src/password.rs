use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use once_cell::sync::Lazy;

use crate::error::RepoError;

static DECOY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("decoy-password").ok());

pub fn hash_password(password: &str) -> Result<String, RepoError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| RepoError::Internal(format!("hash error: {err}")))
}

/// A stored hash that fails to parse never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Full argon2 verification against a throwaway hash, so a lookup miss costs
/// the same as a wrong password.
pub fn verify_decoy(password: &str) {
    if let Some(hash) = DECOY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted_phc_strings() {
        let first = hash_password("p@ss").unwrap();
        let second = hash_password("p@ss").unwrap();
        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
        assert!(!first.contains("p@ss"));
    }

    #[test]
    fn verify_accepts_only_the_original_password() {
        let hash = hash_password("p@ss").unwrap();
        assert!(verify_password("p@ss", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn decoy_hash_is_a_real_argon2_hash() {
        let hash = DECOY_HASH.as_deref().unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!verify_password("p@ss", hash));
        verify_decoy("p@ss");
    }

    #[test]
    fn corrupt_hash_never_verifies() {
        assert!(!verify_password("p@ss", "not-a-phc-string"));
    }
}
