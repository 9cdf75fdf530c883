use std::sync::LazyLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::errors::AppError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Checked when the account does not exist, so unknown emails cost one full Argon2 verify.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_sync("procura-unknown-account").unwrap_or_default());

fn hash_sync(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

/// Unparseable hashes never match.
fn verify_sync(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Hashes a password with Argon2id on the blocking pool and returns the PHC string.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_sync(&password))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in hashing: {e}")))?
}

/// Checks a password against the stored PHC string, or against a dummy hash when
/// there is no account, so both paths take the same time. The latter never matches.
pub async fn verify_password(
    password: String,
    stored_hash: Option<String>,
) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || match stored_hash {
        Some(hash) => verify_sync(&password, &hash),
        None => {
            verify_sync(&password, &DUMMY_HASH);
            false
        }
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in verify: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_then_verify() {
        let hash = hash_password("hunter22".to_string()).await.unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter22".to_string(), Some(hash.clone()))
            .await
            .unwrap());
        assert!(!verify_password("hunter23".to_string(), Some(hash))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_same_password_gets_distinct_salts() {
        let a = hash_password("secret1".to_string()).await.unwrap();
        let b = hash_password("secret1".to_string()).await.unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_hash_never_matches() {
        assert!(!verify_sync("anything", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn test_missing_account_runs_a_real_verify() {
        assert!(DUMMY_HASH.starts_with("$argon2id$"));
        let matched = verify_password("procura-unknown-account".to_string(), None)
            .await
            .unwrap();
        assert!(!matched);
    }
}
