//! Password checks: Argon2id verification and the registration policy.
//!
//! Hashing happens in the user repository when a record is written; this
//! module only ever reads PHC strings.

use argon2::{Argon2, PasswordVerifier};

use crate::error::AuthError;

/// Verify a plaintext password against an Argon2id PHC-format hash.
///
/// `pepper` must match the pepper used during hashing. A malformed stored
/// hash is a `Crypto` error, not a mismatch.
pub fn verify_password(
    password: &str,
    hash: &str,
    pepper: Option<&str>,
) -> Result<bool, AuthError> {
    let input = match pepper {
        Some(p) => format!("{p}{password}"),
        None => password.to_owned(),
    };

    let parsed = argon2::PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

    // Parameters come from the PHC string, so defaults are fine here.
    match Argon2::default().verify_password(input.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}

/// Reject passwords shorter than `min_length` characters.
pub fn check_policy(password: &str, min_length: usize) -> Result<(), AuthError> {
    if password.chars().count() < min_length {
        return Err(AuthError::PasswordTooShort(min_length));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::PasswordHasher;
    use argon2::password_hash::SaltString;
    use argon2::password_hash::rand_core::OsRng;

    fn hash(password: &str, pepper: Option<&str>) -> String {
        let input = format!("{}{password}", pepper.unwrap_or_default());
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(input.as_bytes(), &salt)
            .expect("hashing failed")
            .to_string()
    }

    #[test]
    fn matching_and_mismatching_passwords() {
        let stored = hash("admin123", None);
        assert!(verify_password("admin123", &stored, None).unwrap());
        assert!(!verify_password("admin124", &stored, None).unwrap());
    }

    #[test]
    fn pepper_must_match() {
        let stored = hash("hr123456", Some("pepper!"));
        assert!(verify_password("hr123456", &stored, Some("pepper!")).unwrap());
        assert!(!verify_password("hr123456", &stored, None).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(matches!(
            verify_password("pw", "not-a-hash", None),
            Err(AuthError::Crypto(_))
        ));
    }

    #[test]
    fn policy_counts_characters() {
        assert!(check_policy("12345678", 8).is_ok());
        assert!(matches!(
            check_policy("1234567", 8),
            Err(AuthError::PasswordTooShort(8))
        ));
        // Multi-byte characters count once each.
        assert!(check_policy("ääääääää", 8).is_ok());
    }
}
