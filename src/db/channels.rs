//! Channel and subchannel persistence.

use sqlx::SqlitePool;

use super::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    Chat,
    Forum,
}

impl ChannelType {
    fn as_str(self) -> &'static str {
        match self {
            ChannelType::Chat => "chat",
            ChannelType::Forum => "forum",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "forum" => ChannelType::Forum,
            _ => ChannelType::Chat,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChannelRow {
    pub channel_id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub channel_type: ChannelType,
    pub retention_hours: Option<i64>,
    pub message_limit: Option<i64>,
    pub created_by: Option<i64>,
    pub created_at: i64,
}

struct ChannelRowRaw {
    channel_id: i64,
    name: String,
    display_name: String,
    description: Option<String>,
    channel_type: String,
    retention_hours: Option<i64>,
    message_limit: Option<i64>,
    created_by: Option<i64>,
    created_at: i64,
}

impl From<ChannelRowRaw> for ChannelRow {
    fn from(r: ChannelRowRaw) -> Self {
        ChannelRow {
            channel_id: r.channel_id,
            name: r.name,
            display_name: r.display_name,
            description: r.description,
            channel_type: ChannelType::from_str(&r.channel_type),
            retention_hours: r.retention_hours,
            message_limit: r.message_limit,
            created_by: r.created_by,
            created_at: r.created_at,
        }
    }
}

pub struct ChannelRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ChannelRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        name: &str,
        display_name: &str,
        description: Option<&str>,
        channel_type: ChannelType,
        retention_hours: Option<i64>,
        message_limit: Option<i64>,
        created_by: Option<i64>,
        created_at: i64,
    ) -> Result<i64, DbError> {
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT channel_id FROM Channels WHERE name = ?")
                .bind(name)
                .fetch_optional(self.pool)
                .await?;
        if existing.is_some() {
            return Err(DbError::ChannelNameTaken);
        }

        let result = sqlx::query(
            "INSERT INTO Channels
                (name, display_name, description, channel_type, retention_hours, message_limit, created_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(name)
        .bind(display_name)
        .bind(description)
        .bind(channel_type.as_str())
        .bind(retention_hours)
        .bind(message_limit)
        .bind(created_by)
        .bind(created_at)
        .execute(self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find_by_id(&self, channel_id: i64) -> Result<Option<ChannelRow>, DbError> {
        let row: Option<(i64, String, String, Option<String>, String, Option<i64>, Option<i64>, Option<i64>, i64)> =
            sqlx::query_as(
                "SELECT channel_id, name, display_name, description, channel_type,
                        retention_hours, message_limit, created_by, created_at
                 FROM Channels WHERE channel_id = ?",
            )
            .bind(channel_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|r| {
            ChannelRow::from(ChannelRowRaw {
                channel_id: r.0,
                name: r.1,
                display_name: r.2,
                description: r.3,
                channel_type: r.4,
                retention_hours: r.5,
                message_limit: r.6,
                created_by: r.7,
                created_at: r.8,
            })
        }))
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<ChannelRow>, DbError> {
        let row: Option<(i64, String, String, Option<String>, String, Option<i64>, Option<i64>, Option<i64>, i64)> =
            sqlx::query_as(
                "SELECT channel_id, name, display_name, description, channel_type,
                        retention_hours, message_limit, created_by, created_at
                 FROM Channels WHERE name = ?",
            )
            .bind(name)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|r| {
            ChannelRow::from(ChannelRowRaw {
                channel_id: r.0,
                name: r.1,
                display_name: r.2,
                description: r.3,
                channel_type: r.4,
                retention_hours: r.5,
                message_limit: r.6,
                created_by: r.7,
                created_at: r.8,
            })
        }))
    }

    pub async fn list(&self) -> Result<Vec<ChannelRow>, DbError> {
        let rows: Vec<(i64, String, String, Option<String>, String, Option<i64>, Option<i64>, Option<i64>, i64)> =
            sqlx::query_as(
                "SELECT channel_id, name, display_name, description, channel_type,
                        retention_hours, message_limit, created_by, created_at
                 FROM Channels ORDER BY channel_id",
            )
            .fetch_all(self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| {
                ChannelRow::from(ChannelRowRaw {
                    channel_id: r.0,
                    name: r.1,
                    display_name: r.2,
                    description: r.3,
                    channel_type: r.4,
                    retention_hours: r.5,
                    message_limit: r.6,
                    created_by: r.7,
                    created_at: r.8,
                })
            })
            .collect())
    }

    pub async fn delete(&self, channel_id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM Channels WHERE channel_id = ?")
            .bind(channel_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    pub async fn create_subchannel(
        &self,
        channel_id: i64,
        name: &str,
    ) -> Result<i64, DbError> {
        let result = sqlx::query("INSERT INTO Subchannels (channel_id, name) VALUES (?, ?)")
            .bind(channel_id)
            .bind(name)
            .execute(self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }
}
