//! Password hashing with PBKDF2-SHA256, stored as PHC strings
//! (`$pbkdf2-sha256$i=<rounds>,l=32$<salt>$<hash>`).
//!
//! Hashing is CPU-bound, so the async wrappers move the work onto tokio's
//! blocking pool.

use crate::{ClinicError, ClinicResult};
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::{Params, Pbkdf2};

const OUTPUT_LENGTH: usize = 32;

fn hash_error(e: impl std::fmt::Display) -> ClinicError {
    ClinicError::PasswordHash(e.to_string())
}

pub fn hash_password_blocking(password: &str, rounds: u32) -> ClinicResult<String> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes).map_err(hash_error)?;
    let params = Params {
        rounds,
        output_length: OUTPUT_LENGTH,
    };
    let hash = Pbkdf2
        .hash_password_customized(password.as_bytes(), None, None, params, &salt)
        .map_err(hash_error)?;
    Ok(hash.to_string())
}

/// Returns `Ok(false)` for a wrong password; `Err` only when `stored` is not a PHC string.
pub fn verify_password_blocking(password: &str, stored: &str) -> ClinicResult<bool> {
    let parsed = PasswordHash::new(stored).map_err(hash_error)?;
    Ok(Pbkdf2.verify_password(password.as_bytes(), &parsed).is_ok())
}

pub async fn hash_password(password: &str, rounds: u32) -> ClinicResult<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_password_blocking(&password, rounds))
        .await
        .map_err(hash_error)?
}

pub async fn verify_password(password: &str, stored: &str) -> ClinicResult<bool> {
    let password = password.to_owned();
    let stored = stored.to_owned();
    tokio::task::spawn_blocking(move || verify_password_blocking(&password, &stored))
        .await
        .map_err(hash_error)?
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUNDS: u32 = 1_000;

    #[test]
    fn hash_verifies_and_embeds_rounds() {
        let hash = hash_password_blocking("S3cret!pass", ROUNDS).unwrap();
        assert!(hash.starts_with("$pbkdf2-sha256$"));
        assert!(hash.contains("i=1000"));
        assert!(verify_password_blocking("S3cret!pass", &hash).unwrap());
        assert!(!verify_password_blocking("wrong", &hash).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = hash_password_blocking("same", ROUNDS).unwrap();
        let b = hash_password_blocking("same", ROUNDS).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password_blocking("x", "not-a-phc-string").is_err());
    }

    #[tokio::test]
    async fn async_wrappers_agree_with_blocking_versions() {
        let hash = hash_password("An0ther!pass", ROUNDS).await.unwrap();
        assert!(verify_password("An0ther!pass", &hash).await.unwrap());
    }
}
