//! Argon2id password hashing shared by the identity-provider adapters.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use secrecy::{ExposeSecret, SecretString};

use super::IdentityError;

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `IdentityError::Provider` if hashing fails.
pub fn hash_password(password: &SecretString) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| IdentityError::Provider(format!("password hashing failed: {e}")))
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `IdentityError::InvalidCredential` on mismatch or an unreadable hash.
pub fn verify_password(password: &SecretString, hash: &str) -> Result<(), IdentityError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| IdentityError::InvalidCredential)?;

    Argon2::default()
        .verify_password(password.expose_secret().as_bytes(), &parsed_hash)
        .map_err(|_| IdentityError::InvalidCredential)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = SecretString::from("abcd1234".to_owned());
        let hash = hash_password(&password).unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(&password, &hash).is_ok());
        assert!(matches!(
            verify_password(&SecretString::from("abcd1235".to_owned()), &hash),
            Err(IdentityError::InvalidCredential)
        ));
    }

    #[test]
    fn test_garbage_hash_is_invalid_credential() {
        let password = SecretString::from("abcd1234".to_owned());
        assert!(matches!(
            verify_password(&password, "not-a-hash"),
            Err(IdentityError::InvalidCredential)
        ));
    }
}
