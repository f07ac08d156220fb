//! Password and SSH-pubkey authentication, and the progressive backoff
//! applied to consecutive failed `AUTH_REQUEST`s for the same nickname.
//!
//! `AuthBackoff` is in-memory only, never persisted — modeled the way the
//! teacher's `RateLimitManager` keeps per-key `DashMap` state without
//! touching the database, since losing it across a restart just resets
//! the penalty, which is an acceptable failure mode for a rate limit.

use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

use crate::db::users::UserRow;
use crate::db::{Database, DbError};
use crate::security::password::verify_password;

#[derive(Debug, Clone, Copy, Default)]
struct Attempt {
    consecutive_failures: u32,
    next_allowed_at: i64,
}

#[derive(Default)]
pub struct AuthBackoff {
    attempts: DashMap<String, Attempt>,
}

pub enum BackoffDecision {
    Allowed,
    MustWait { retry_after_secs: u32 },
    SessionClosed,
}

impl AuthBackoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checked before attempting a password verification.
    pub fn check(&self, nickname_lower: &str) -> BackoffDecision {
        let now = now_unix_secs();
        let attempt = self
            .attempts
            .get(nickname_lower)
            .map(|a| *a)
            .unwrap_or_default();
        if attempt.next_allowed_at > now {
            return BackoffDecision::MustWait {
                retry_after_secs: (attempt.next_allowed_at - now) as u32,
            };
        }
        BackoffDecision::Allowed
    }

    /// Records a failed attempt and returns whether the session must close
    /// (5th consecutive failure). Delays are 1,2,4,8s for attempts 2..5.
    pub fn record_failure(&self, nickname_lower: &str) -> BackoffDecision {
        let now = now_unix_secs();
        let mut entry = self.attempts.entry(nickname_lower.to_string()).or_default();
        entry.consecutive_failures += 1;
        if entry.consecutive_failures >= 5 {
            self.attempts.remove(nickname_lower);
            return BackoffDecision::SessionClosed;
        }
        let delay_secs = 1u32 << (entry.consecutive_failures.saturating_sub(1));
        entry.next_allowed_at = now + delay_secs as i64;
        BackoffDecision::MustWait {
            retry_after_secs: delay_secs,
        }
    }

    pub fn record_success(&self, nickname_lower: &str) {
        self.attempts.remove(nickname_lower);
    }
}

fn now_unix_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

/// Verifies `nickname`/`password` against the store. `Ok(None)` means the
/// nickname is not registered or the password didn't match; callers should
/// not distinguish the two in their reply.
pub async fn authenticate_password(
    db: &Database,
    nickname: &str,
    password: &str,
) -> Result<Option<UserRow>, DbError> {
    let repo = crate::db::users::UserRepository::new(db.pool());
    let Some(user) = repo.find_by_nickname(nickname).await? else {
        return Ok(None);
    };
    let Some(hash) = user.password_hash.clone() else {
        return Ok(None);
    };
    let ok = verify_password(password.to_string(), hash)
        .await
        .unwrap_or(false);
    Ok(if ok { Some(user) } else { None })
}

pub async fn register_user(
    db: &Database,
    nickname: &str,
    password: &str,
    now_ms: i64,
) -> Result<i64, DbError> {
    let hash = crate::security::password::hash_password(password.to_string(), nickname.to_string())
        .await
        .map_err(|e| DbError::Sqlx(sqlx::Error::Protocol(e.to_string())))?;
    let repo = crate::db::users::UserRepository::new(db.pool());
    repo.register(nickname, &hash, now_ms).await
}
