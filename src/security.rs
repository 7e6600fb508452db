//! Password hashing and the account password policy.

use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!(e.to_string()))?
        .to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else {
        false
    }
}

/// Minimum password rules applied to new passwords and password changes:
/// at least 8 characters, one digit, one symbol, one upper- and one
/// lower-case letter.
pub fn password_is_strong(password: &str) -> bool {
    let mut has_number = false;
    let mut has_symbol = false;
    let mut has_uppercase = false;
    let mut has_lowercase = false;
    for c in password.chars() {
        if c.is_numeric() {
            has_number = true;
        } else if !c.is_alphabetic() {
            has_symbol = true;
        }
        if c.is_uppercase() {
            has_uppercase = true;
        }
        if c.is_lowercase() {
            has_lowercase = true;
        }
    }
    password.chars().count() >= 8 && has_number && has_symbol && has_uppercase && has_lowercase
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("P@ssw0rd!").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "P@ssw0rd!"));
        assert!(!verify_password(&hash, "p@ssw0rd!"));
        assert!(!verify_password("not-a-phc-string", "P@ssw0rd!"));
    }

    #[test]
    fn strength_policy() {
        assert!(password_is_strong("P@ssw0rd!"));
        assert!(password_is_strong("Aa1!Aa1!"));
        // too short
        assert!(!password_is_strong("Aa1!"));
        // missing digit
        assert!(!password_is_strong("Password!"));
        // missing symbol
        assert!(!password_is_strong("Passw0rd"));
        // missing upper
        assert!(!password_is_strong("p@ssw0rd"));
        // missing lower
        assert!(!password_is_strong("P@SSW0RD"));
    }
}
