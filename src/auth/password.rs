//! Password hashing and the password policy.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::errors::{AppError, ValidationErrors};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Passwords rejected outright regardless of length.
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "passw0rd",
    "12345678",
    "123456789",
    "1234567890",
    "qwerty123",
    "qwertyuiop",
    "iloveyou",
    "sunshine",
    "princess",
    "football",
    "baseball",
    "welcome1",
    "welcome123",
    "letmein1",
    "trustno1",
    "superman",
    "starwars",
    "whatever",
    "abc12345",
    "11111111",
    "00000000",
    "admin123",
    "changeme",
    "monkey123",
    "dragon123",
];

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored PHC hash string. Malformed hashes never verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        tracing::warn!("Stored password hash is malformed");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Apply the password policy, recording every failure under `field`.
pub fn validate_password(errors: &mut ValidationErrors, field: &str, password: &str, email: &str) {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            field,
            format!(
                "This password is too short. It must contain at least {} characters.",
                MIN_PASSWORD_LENGTH
            ),
        );
    }

    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        errors.add(field, "This password is too common.");
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        errors.add(field, "This password is entirely numeric.");
    }

    if is_similar_to_email(&lowered, email) {
        errors.add(field, "The password is too similar to the email.");
    }
}

fn is_similar_to_email(lowered_password: &str, email: &str) -> bool {
    let email = email.trim().to_lowercase();
    let local = email.split('@').next().unwrap_or_default();
    if local.len() < 3 || lowered_password.is_empty() {
        return false;
    }
    lowered_password == email
        || lowered_password == local
        || lowered_password.contains(local)
        || local.contains(lowered_password)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failures(password: &str, email: &str) -> Vec<String> {
        let mut errors = ValidationErrors::new();
        validate_password(&mut errors, "password", password, email);
        errors
            .fields()
            .get("password")
            .cloned()
            .unwrap_or_default()
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same-password-1").unwrap();
        let b = hash_password("same-password-1").unwrap();
        assert_ne!(a, b);

        let salt_a = PasswordHash::new(&a).unwrap().salt.unwrap().to_string();
        let salt_b = PasswordHash::new(&b).unwrap().salt.unwrap().to_string();
        assert_ne!(salt_a, salt_b);
        // 16 random bytes, unpadded base64.
        assert_eq!(salt_a.len(), 22);
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_policy_accepts_reasonable_password() {
        assert!(failures("Blue-Kettle-42", "alice@example.com").is_empty());
    }

    #[test]
    fn test_policy_rules() {
        assert_eq!(failures("Ab1!", "alice@example.com").len(), 1);
        assert!(failures("Password123", "alice@example.com")
            .iter()
            .any(|m| m.contains("too common")));
        assert!(failures("84736251", "alice@example.com")
            .iter()
            .any(|m| m.contains("entirely numeric")));
        assert!(failures("alicewonder", "alice@example.com")
            .iter()
            .any(|m| m.contains("similar")));
    }

    #[test]
    fn test_policy_collects_every_failure() {
        // Short, numeric, and common at once.
        let messages = failures("1234567", "bob@example.com");
        assert!(messages.len() >= 2);
    }
}
