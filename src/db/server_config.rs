//! Single-row KV table for bootstrap state that must survive a restart
//! (e.g. "has the first-admin bootstrap already run").

use sqlx::SqlitePool;

use super::DbError;

pub struct ServerConfigRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ServerConfigRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, DbError> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM ServerConfig WHERE key = ?")
                .bind(key)
                .fetch_optional(self.pool)
                .await?;
        Ok(value)
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO ServerConfig (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
