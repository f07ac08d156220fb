//! Ban persistence: per-user and per-CIDR, with optional expiry and
//! shadowban flag (user bans only).

use sqlx::SqlitePool;

use super::DbError;

#[derive(Debug, Clone)]
pub struct BanRow {
    pub ban_id: i64,
    pub user_id: Option<i64>,
    pub cidr: Option<String>,
    pub reason: String,
    pub banned_at: i64,
    pub banned_until: Option<i64>,
    pub banned_by: Option<i64>,
    pub is_shadowban: bool,
}

type Raw = (
    i64,
    Option<i64>,
    Option<String>,
    String,
    i64,
    Option<i64>,
    Option<i64>,
    i64,
);

fn from_raw(r: Raw) -> BanRow {
    BanRow {
        ban_id: r.0,
        user_id: r.1,
        cidr: r.2,
        reason: r.3,
        banned_at: r.4,
        banned_until: r.5,
        banned_by: r.6,
        is_shadowban: r.7 != 0,
    }
}

const COLUMNS: &str =
    "ban_id, user_id, cidr, reason, banned_at, banned_until, banned_by, is_shadowban";

pub struct BanRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BanRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn ban_user(
        &self,
        user_id: i64,
        reason: &str,
        banned_at: i64,
        banned_until: Option<i64>,
        banned_by: i64,
        is_shadowban: bool,
    ) -> Result<i64, DbError> {
        sqlx::query("DELETE FROM Bans WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        let result = sqlx::query(
            "INSERT INTO Bans (user_id, reason, banned_at, banned_until, banned_by, is_shadowban)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(reason)
        .bind(banned_at)
        .bind(banned_until)
        .bind(banned_by)
        .bind(is_shadowban as i64)
        .execute(self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn ban_ip(
        &self,
        cidr: &str,
        reason: &str,
        banned_at: i64,
        banned_until: Option<i64>,
        banned_by: i64,
    ) -> Result<i64, DbError> {
        sqlx::query("DELETE FROM Bans WHERE cidr = ?")
            .bind(cidr)
            .execute(self.pool)
            .await?;
        let result = sqlx::query(
            "INSERT INTO Bans (cidr, reason, banned_at, banned_until, banned_by, is_shadowban)
             VALUES (?, ?, ?, ?, ?, 0)",
        )
        .bind(cidr)
        .bind(reason)
        .bind(banned_at)
        .bind(banned_until)
        .bind(banned_by)
        .execute(self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn unban_user(&self, user_id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM Bans WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    pub async fn unban_ip(&self, cidr: &str) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM Bans WHERE cidr = ?")
            .bind(cidr)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<BanRow>, DbError> {
        let sql = format!("SELECT {COLUMNS} FROM Bans ORDER BY ban_id");
        let rows: Vec<Raw> = sqlx::query_as(&sql).fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(from_raw).collect())
    }

    /// Used at startup to warm [`crate::security::ban_cache::BanCache`].
    pub async fn list_active(&self, now: i64) -> Result<Vec<BanRow>, DbError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM Bans WHERE banned_until IS NULL OR banned_until > ?"
        );
        let rows: Vec<Raw> = sqlx::query_as(&sql).bind(now).fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(from_raw).collect())
    }
}
