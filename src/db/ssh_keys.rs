//! SSH public key persistence and the one-time registration-code flow.

use sqlx::SqlitePool;

use super::DbError;

#[derive(Debug, Clone)]
pub struct SshKeyRow {
    pub key_id: i64,
    pub user_id: i64,
    pub fingerprint: String,
    pub key_type: String,
    pub label: Option<String>,
    pub added_at: i64,
    pub last_used_at: Option<i64>,
}

pub struct SshKeyRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SshKeyRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<SshKeyRow>, DbError> {
        let row: Option<(i64, i64, String, String, Option<String>, i64, Option<i64>)> = sqlx::query_as(
            "SELECT key_id, user_id, fingerprint, key_type, label, added_at, last_used_at
             FROM SSHKeys WHERE fingerprint = ?",
        )
        .bind(fingerprint)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(|r| SshKeyRow {
            key_id: r.0,
            user_id: r.1,
            fingerprint: r.2,
            key_type: r.3,
            label: r.4,
            added_at: r.5,
            last_used_at: r.6,
        }))
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<SshKeyRow>, DbError> {
        let rows: Vec<(i64, i64, String, String, Option<String>, i64, Option<i64>)> = sqlx::query_as(
            "SELECT key_id, user_id, fingerprint, key_type, label, added_at, last_used_at
             FROM SSHKeys WHERE user_id = ? ORDER BY key_id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| SshKeyRow {
                key_id: r.0,
                user_id: r.1,
                fingerprint: r.2,
                key_type: r.3,
                label: r.4,
                added_at: r.5,
                last_used_at: r.6,
            })
            .collect())
    }

    pub async fn add(
        &self,
        user_id: i64,
        fingerprint: &str,
        key_type: &str,
        label: Option<&str>,
        added_at: i64,
    ) -> Result<i64, DbError> {
        let existing = self.find_by_fingerprint(fingerprint).await?;
        if existing.is_some() {
            return Err(DbError::FingerprintTaken);
        }
        let result = sqlx::query(
            "INSERT INTO SSHKeys (user_id, fingerprint, key_type, label, added_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(fingerprint)
        .bind(key_type)
        .bind(label)
        .bind(added_at)
        .execute(self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn update_label(&self, key_id: i64, label: &str) -> Result<(), DbError> {
        let result = sqlx::query("UPDATE SSHKeys SET label = ? WHERE key_id = ?")
            .bind(label)
            .bind(key_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    pub async fn delete(&self, key_id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM SSHKeys WHERE key_id = ?")
            .bind(key_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    pub async fn touch_last_used(&self, key_id: i64, now: i64) -> Result<(), DbError> {
        sqlx::query("UPDATE SSHKeys SET last_used_at = ? WHERE key_id = ?")
            .bind(now)
            .bind(key_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Generates and stores a one-time registration code for an
    /// unrecognized fingerprint, returned to the SSH client as the payload
    /// of `ERROR(need_registration, code)`.
    pub async fn create_registration_code(
        &self,
        code: &str,
        fingerprint: &str,
        key_type: &str,
        created_at: i64,
        expires_at: i64,
    ) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO SshRegistrationCodes (code, fingerprint, key_type, created_at, expires_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(code)
        .bind(fingerprint)
        .bind(key_type)
        .bind(created_at)
        .bind(expires_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Consumes a registration code if unexpired, returning the fingerprint
    /// and key type it was bound to.
    pub async fn consume_registration_code(
        &self,
        code: &str,
        now: i64,
    ) -> Result<Option<(String, String)>, DbError> {
        let row: Option<(String, String, i64)> = sqlx::query_as(
            "SELECT fingerprint, key_type, expires_at FROM SshRegistrationCodes WHERE code = ?",
        )
        .bind(code)
        .fetch_optional(self.pool)
        .await?;
        sqlx::query("DELETE FROM SshRegistrationCodes WHERE code = ?")
            .bind(code)
            .execute(self.pool)
            .await?;
        match row {
            Some((fingerprint, key_type, expires_at)) if expires_at > now => {
                Ok(Some((fingerprint, key_type)))
            }
            _ => Ok(None),
        }
    }
}
