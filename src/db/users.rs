//! User account persistence: registration, lookup, admin flag, soft-delete.

use sqlx::SqlitePool;

use super::DbError;

pub const FLAG_ADMIN: i64 = 0x1;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub user_id: i64,
    pub nickname: String,
    pub password_hash: Option<String>,
    pub user_flags: i64,
    pub created_at: i64,
}

impl UserRow {
    pub fn is_admin(&self) -> bool {
        self.user_flags & FLAG_ADMIN != 0
    }
}

pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Registers a new account for `nickname` with an already-hashed
    /// password. Fails with [`DbError::NicknameTaken`] on the unique
    /// constraint over the case-folded nickname.
    pub async fn register(
        &self,
        nickname: &str,
        password_hash: &str,
        created_at: i64,
    ) -> Result<i64, DbError> {
        let mut tx = self.pool.begin().await?;
        let nickname_lower = nickname.to_lowercase();

        let existing: Option<i64> = sqlx::query_scalar(
            "SELECT user_id FROM Users WHERE nickname_lower = ?",
        )
        .bind(&nickname_lower)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Err(DbError::NicknameTaken);
        }

        let result = sqlx::query(
            "INSERT INTO Users (nickname, nickname_lower, password_hash, user_flags, created_at)
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(nickname)
        .bind(&nickname_lower)
        .bind(password_hash)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_nickname(&self, nickname: &str) -> Result<Option<UserRow>, DbError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT user_id, nickname, password_hash, user_flags, created_at
             FROM Users WHERE nickname_lower = ?",
        )
        .bind(nickname.to_lowercase())
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    pub async fn find_by_id(&self, user_id: i64) -> Result<Option<UserRow>, DbError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT user_id, nickname, password_hash, user_flags, created_at
             FROM Users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    pub async fn set_password_hash(&self, user_id: i64, hash: &str) -> Result<(), DbError> {
        sqlx::query("UPDATE Users SET password_hash = ? WHERE user_id = ?")
            .bind(hash)
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_admin(&self, user_id: i64, admin: bool) -> Result<(), DbError> {
        if admin {
            sqlx::query("UPDATE Users SET user_flags = user_flags | ? WHERE user_id = ?")
                .bind(FLAG_ADMIN)
                .bind(user_id)
                .execute(self.pool)
                .await?;
        } else {
            sqlx::query("UPDATE Users SET user_flags = user_flags & ~? WHERE user_id = ?")
                .bind(FLAG_ADMIN)
                .bind(user_id)
                .execute(self.pool)
                .await?;
        }
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<UserRow>, DbError> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT user_id, nickname, password_hash, user_flags, created_at
             FROM Users ORDER BY user_id",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Soft-deletes a user: nulls `author_user_id` on their messages
    /// (content preserved), drops their SSH keys, and removes the row.
    pub async fn delete(&self, user_id: i64) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE Messages SET author_user_id = NULL WHERE author_user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM SSHKeys WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM Users WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        tx.commit().await?;
        Ok(())
    }
}
