//! Persistence layer: connection pool, migrations, and repositories.
//!
//! Migrations are plain numbered SQL files applied with raw `sqlx::query`
//! calls gated by existence checks against `sqlite_master`/
//! `pragma_table_info`, not `sqlx::migrate!` — this keeps migration
//! application inspectable and tolerant of a database that already has a
//! later-but-compatible schema from a previous deploy.

pub mod bans;
pub mod channels;
pub mod messages;
pub mod server_config;
pub mod ssh_keys;
pub mod users;
pub mod write_batch;

use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("nickname already registered")]
    NicknameTaken,
    #[error("channel name already exists")]
    ChannelNameTaken,
    #[error("fingerprint already registered")]
    FingerprintTaken,
    #[error("row not found")]
    NotFound,
    #[error("migration {0} failed: {1}")]
    Migration(String, sqlx::Error),
    #[error("batch insert failed: {0}")]
    BatchFailed(String),
    #[error("write batcher shut down")]
    Closed,
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let options = if path == ":memory:" {
            SqliteConnectOptions::new()
                .filename("file::memory:")
                .shared_cache(true)
                .create_if_missing(true)
        } else {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .idle_timeout(Some(IDLE_TIMEOUT))
            .test_before_acquire(true)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(&self) -> Result<(), DbError> {
        let migrations: &[(&str, &str)] = &[
            ("0001_init", include_str!("../../migrations/0001_init.sql")),
            (
                "0002_ssh_registration_codes",
                include_str!("../../migrations/0002_ssh_registration_codes.sql"),
            ),
        ];

        for (name, sql) in migrations {
            if table_exists(&self.pool, "schema_migrations").await?
                && migration_applied(&self.pool, name).await?
            {
                continue;
            }
            run_migration_file(&self.pool, sql)
                .await
                .map_err(|e| DbError::Migration(name.to_string(), e))?;
            record_migration(&self.pool, name).await?;
            info!(migration = %name, "applied migration");
        }
        Ok(())
    }
}

async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name = ?)",
    )
    .bind(table)
    .fetch_one(pool)
    .await
}

async fn migration_applied(pool: &SqlitePool, name: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE name = ?)",
    )
    .bind(name)
    .fetch_one(pool)
    .await
}

async fn record_migration(pool: &SqlitePool, name: &str) -> Result<(), DbError> {
    sqlx::query("INSERT OR IGNORE INTO schema_migrations (name) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}

/// Splits a migration file on `;`, drops comment-only lines, and executes
/// each statement individually. Tolerates (logs, doesn't fail on)
/// "already exists" errors so a half-applied migration can be re-run.
async fn run_migration_file(pool: &SqlitePool, sql: &str) -> Result<(), sqlx::Error> {
    for raw_statement in sql.split(';') {
        let cleaned: String = raw_statement
            .lines()
            .filter(|line| !line.trim_start().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let statement = cleaned.trim();
        if statement.is_empty() {
            continue;
        }
        if let Err(e) = sqlx::query(statement).execute(pool).await {
            let msg = e.to_string();
            if msg.contains("already exists") {
                warn!(error = %msg, "migration statement skipped, already applied");
                continue;
            }
            return Err(e);
        }
    }
    Ok(())
}

#[allow(dead_code)]
async fn column_exists(pool: &SqlitePool, table: &str, column: &str) -> Result<bool, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM pragma_table_info('{table}') WHERE name = ?");
    let count: i64 = sqlx::query_scalar(&sql).bind(column).fetch_one(pool).await?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let db = Database::new(":memory:").await.unwrap();
        db.run_migrations().await.unwrap();
        assert!(table_exists(&db.pool, "Messages").await.unwrap());
    }
}
