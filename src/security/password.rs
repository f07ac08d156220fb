//! Argon2id password hashing, off the async runtime's worker threads.
//!
//! The salt is derived deterministically from the nickname (t=3, m=64MiB,
//! p=4, 32-byte output) rather than generated randomly: the nickname is
//! already unique per registered account, and a recoverable salt means
//! password verification never needs to look anything up besides the
//! stored hash.

use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

const PARAMS_M_COST_KIB: u32 = 64 * 1024;
const PARAMS_T_COST: u32 = 3;
const PARAMS_P_COST: u32 = 4;
const PARAMS_OUTPUT_LEN: usize = 32;

fn argon2() -> Argon2<'static> {
    let params = Params::new(
        PARAMS_M_COST_KIB,
        PARAMS_T_COST,
        PARAMS_P_COST,
        Some(PARAMS_OUTPUT_LEN),
    )
    .expect("static argon2 params are valid");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Nicknames are 1..20 chars, well inside the salt-string length bounds
/// (4..64 b64 chars) once base64-encoded; no extra padding needed.
fn salt_from_nickname(nickname: &str) -> Result<SaltString, argon2::password_hash::Error> {
    let encoded = base64_url_no_pad(nickname.as_bytes());
    SaltString::from_b64(&encoded)
}

fn base64_url_no_pad(bytes: &[u8]) -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    let encoded = URL_SAFE_NO_PAD.encode(bytes);
    // pad up to the 4-char salt-string minimum for very short nicknames
    if encoded.len() < 4 {
        format!("{encoded:_<4}")
    } else {
        encoded
    }
}

pub async fn hash_password(
    password: String,
    nickname: String,
) -> Result<String, argon2::password_hash::Error> {
    tokio::task::spawn_blocking(move || {
        let salt = salt_from_nickname(&nickname)?;
        Ok(argon2().hash_password(password.as_bytes(), &salt)?.to_string())
    })
    .await
    .expect("spawn_blocking failed")
}

pub async fn verify_password(
    password: String,
    hash: String,
) -> Result<bool, argon2::password_hash::Error> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)?;
        Ok(argon2().verify_password(password.as_bytes(), &parsed).is_ok())
    })
    .await
    .expect("spawn_blocking failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify_round_trips() {
        let hash = hash_password("p@ssword1".to_string(), "carol".to_string())
            .await
            .unwrap();
        assert!(verify_password("p@ssword1".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password("wrong".to_string(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn same_password_and_nickname_hash_deterministically() {
        let a = hash_password("p@ssword1".to_string(), "carol".to_string())
            .await
            .unwrap();
        let b = hash_password("p@ssword1".to_string(), "carol".to_string())
            .await
            .unwrap();
        assert_eq!(a, b);
    }
}
