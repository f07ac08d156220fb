//! Message persistence: insert, listing/pagination, edit, delete (tombstone
//! for moderation, hard-delete for retention/ring-buffer eviction).

use sqlx::{Sqlite, SqlitePool, Transaction};

use super::DbError;

/// One pending insert, as queued by [`crate::db::write_batch::WriteBatcher`].
#[derive(Debug, Clone)]
pub struct InsertRequest {
    pub channel_id: i64,
    pub subchannel_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub author_user_id: Option<i64>,
    pub author_nickname: String,
    pub content: String,
    pub created_at: i64,
    pub ring_limit: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub message_id: i64,
    pub channel_id: i64,
    pub subchannel_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub thread_root_id: Option<i64>,
    pub author_user_id: Option<i64>,
    pub author_nickname: String,
    pub content: String,
    pub created_at: i64,
    pub edited_at: Option<i64>,
    pub deleted_at: Option<i64>,
    pub deleted_by: Option<String>,
}

type Raw = (
    i64,
    i64,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    String,
    String,
    i64,
    Option<i64>,
    Option<i64>,
    Option<String>,
);

fn from_raw(r: Raw) -> MessageRow {
    MessageRow {
        message_id: r.0,
        channel_id: r.1,
        subchannel_id: r.2,
        parent_id: r.3,
        thread_root_id: r.4,
        author_user_id: r.5,
        author_nickname: r.6,
        content: r.7,
        created_at: r.8,
        edited_at: r.9,
        deleted_at: r.10,
        deleted_by: r.11,
    }
}

const COLUMNS: &str = "message_id, channel_id, subchannel_id, parent_id, thread_root_id,
     author_user_id, author_nickname, content, created_at, edited_at, deleted_at, deleted_by";

pub struct MessageRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MessageRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a message in one transaction, then (for ring-buffer chat
    /// channels) evicts the oldest rows past `message_limit` in the same
    /// transaction so the limit is never transiently exceeded.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        &self,
        channel_id: i64,
        subchannel_id: Option<i64>,
        parent_id: Option<i64>,
        author_user_id: Option<i64>,
        author_nickname: &str,
        content: &str,
        created_at: i64,
        ring_limit: Option<i64>,
    ) -> Result<i64, DbError> {
        let mut tx = self.pool.begin().await?;
        let message_id = insert_in_tx(
            &mut tx,
            channel_id,
            subchannel_id,
            parent_id,
            author_user_id,
            author_nickname,
            content,
            created_at,
            ring_limit,
        )
        .await?;
        tx.commit().await?;
        Ok(message_id)
    }

    /// Runs every request in `batch` inside a single transaction, matching
    /// the caller's arrival order. Used by [`crate::db::write_batch`] to
    /// amortize fsync cost across concurrently-arriving posts; a request
    /// that fails (e.g. its `parent_id` vanished mid-batch) fails only
    /// itself, not the rest of the batch.
    pub async fn insert_batch(
        &self,
        batch: &[InsertRequest],
    ) -> Result<Vec<Result<i64, DbError>>, DbError> {
        let mut tx = self.pool.begin().await?;
        let mut results = Vec::with_capacity(batch.len());
        for req in batch {
            let outcome = insert_in_tx(
                &mut tx,
                req.channel_id,
                req.subchannel_id,
                req.parent_id,
                req.author_user_id,
                &req.author_nickname,
                &req.content,
                req.created_at,
                req.ring_limit,
            )
            .await;
            // A logical failure (bad parent_id) only sinks its own request;
            // a real SQL error aborts the whole batch since the underlying
            // sqlite transaction may no longer accept further statements.
            match outcome {
                Ok(id) => results.push(Ok(id)),
                Err(DbError::NotFound) => results.push(Err(DbError::NotFound)),
                Err(e) => return Err(e),
            }
        }
        tx.commit().await?;
        Ok(results)
    }

    pub async fn find_by_id(&self, message_id: i64) -> Result<Option<MessageRow>, DbError> {
        let sql = format!("SELECT {COLUMNS} FROM Messages WHERE message_id = ?");
        let row: Option<Raw> = sqlx::query_as(&sql)
            .bind(message_id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(from_raw))
    }

    /// `parent_id = None` returns channel roots newest-first; `Some(id)`
    /// returns that message's full subtree in depth-first, per-parent
    /// creation-time order (a simple recursive CTE).
    pub async fn list(
        &self,
        channel_id: i64,
        subchannel_id: Option<i64>,
        parent_id: Option<i64>,
        before_id: Option<i64>,
        after_id: Option<i64>,
        limit: i64,
    ) -> Result<(Vec<MessageRow>, bool), DbError> {
        let rows = if let Some(parent) = parent_id {
            let sql = format!(
                "WITH RECURSIVE subtree(message_id, depth, path) AS (
                    SELECT message_id, 0, printf('%020d', message_id)
                    FROM Messages WHERE parent_id = ?
                    UNION ALL
                    SELECT m.message_id, s.depth + 1, s.path || '/' || printf('%020d', m.message_id)
                    FROM Messages m JOIN subtree s ON m.parent_id = s.message_id
                )
                SELECT {COLUMNS} FROM Messages
                WHERE message_id IN (SELECT message_id FROM subtree)
                ORDER BY (SELECT path FROM subtree WHERE subtree.message_id = Messages.message_id)
                LIMIT ?"
            );
            sqlx::query_as::<_, Raw>(&sql)
                .bind(parent)
                .bind(limit + 1)
                .fetch_all(self.pool)
                .await?
        } else {
            let mut sql = format!(
                "SELECT {COLUMNS} FROM Messages WHERE channel_id = ? AND parent_id IS NULL"
            );
            if subchannel_id.is_some() {
                sql.push_str(" AND subchannel_id = ?");
            }
            if before_id.is_some() {
                sql.push_str(" AND message_id < ?");
            }
            if after_id.is_some() {
                sql.push_str(" AND message_id > ?");
            }
            sql.push_str(" ORDER BY message_id DESC LIMIT ?");

            let mut query = sqlx::query_as::<_, Raw>(&sql).bind(channel_id);
            if let Some(sub) = subchannel_id {
                query = query.bind(sub);
            }
            if let Some(before) = before_id {
                query = query.bind(before);
            }
            if let Some(after) = after_id {
                query = query.bind(after);
            }
            query.bind(limit + 1).fetch_all(self.pool).await?
        };

        let mut rows: Vec<MessageRow> = rows.into_iter().map(from_raw).collect();
        let has_more = rows.len() as i64 > limit;
        rows.truncate(limit as usize);
        Ok((rows, has_more))
    }

    pub async fn edit(
        &self,
        message_id: i64,
        content: &str,
        edited_at: i64,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE Messages SET content = ?, edited_at = ? WHERE message_id = ? AND deleted_at IS NULL",
        )
        .bind(content)
        .bind(edited_at)
        .bind(message_id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Tombstones: content replaced, id/timestamps retained.
    pub async fn delete(
        &self,
        message_id: i64,
        deleted_at: i64,
        deleted_by: &str,
    ) -> Result<(), DbError> {
        let tombstone = if deleted_by == "author" {
            "[deleted by author]"
        } else {
            "[deleted by moderator]"
        };
        let result = sqlx::query(
            "UPDATE Messages SET content = ?, deleted_at = ?, deleted_by = ?
             WHERE message_id = ? AND deleted_at IS NULL",
        )
        .bind(tombstone)
        .bind(deleted_at)
        .bind(deleted_by)
        .bind(message_id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Hard-deletes forum messages older than the retention window. Returns
    /// the number of rows removed.
    pub async fn sweep_retention(
        &self,
        channel_id: i64,
        cutoff: i64,
    ) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM Messages WHERE channel_id = ? AND created_at < ?")
            .bind(channel_id)
            .bind(cutoff)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Shared body for [`MessageRepository::insert`] and
/// [`MessageRepository::insert_batch`]: resolve `thread_root_id`, insert the
/// row, self-link root messages, then evict past `ring_limit` if set.
#[allow(clippy::too_many_arguments)]
async fn insert_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    channel_id: i64,
    subchannel_id: Option<i64>,
    parent_id: Option<i64>,
    author_user_id: Option<i64>,
    author_nickname: &str,
    content: &str,
    created_at: i64,
    ring_limit: Option<i64>,
) -> Result<i64, DbError> {
    let thread_root_id = if let Some(parent) = parent_id {
        let root: Option<i64> = sqlx::query_scalar(
            "SELECT COALESCE(thread_root_id, message_id) FROM Messages WHERE message_id = ? AND channel_id = ?",
        )
        .bind(parent)
        .bind(channel_id)
        .fetch_optional(&mut **tx)
        .await?;
        match root {
            Some(r) => Some(r),
            None => return Err(DbError::NotFound),
        }
    } else {
        None
    };

    let result = sqlx::query(
        "INSERT INTO Messages
            (channel_id, subchannel_id, parent_id, thread_root_id, author_user_id,
             author_nickname, content, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(channel_id)
    .bind(subchannel_id)
    .bind(parent_id)
    .bind(thread_root_id)
    .bind(author_user_id)
    .bind(author_nickname)
    .bind(content)
    .bind(created_at)
    .execute(&mut **tx)
    .await?;
    let message_id = result.last_insert_rowid();

    if thread_root_id.is_none() {
        sqlx::query("UPDATE Messages SET thread_root_id = ? WHERE message_id = ?")
            .bind(message_id)
            .bind(message_id)
            .execute(&mut **tx)
            .await?;
    }

    if let Some(limit) = ring_limit {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Messages WHERE channel_id = ?")
            .bind(channel_id)
            .fetch_one(&mut **tx)
            .await?;
        if count > limit {
            let excess = count - limit;
            sqlx::query(
                "DELETE FROM Messages WHERE message_id IN
                    (SELECT message_id FROM Messages WHERE channel_id = ?
                     ORDER BY message_id ASC LIMIT ?)",
            )
            .bind(channel_id)
            .bind(excess)
            .execute(&mut **tx)
            .await?;
        }
    }

    Ok(message_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::channels::{ChannelRepository, ChannelType};
    use crate::db::Database;

    async fn setup() -> (Database, i64) {
        let db = Database::new(":memory:").await.unwrap();
        let channel_id = ChannelRepository::new(db.pool())
            .create("general", "General", None, ChannelType::Forum, None, None, None, 0)
            .await
            .unwrap();
        (db, channel_id)
    }

    #[tokio::test]
    async fn thread_subtree_is_depth_first_by_creation_order() {
        let (db, channel_id) = setup().await;
        let repo = MessageRepository::new(db.pool());

        let root = repo
            .insert(channel_id, None, None, None, "~alice", "root", 1, None)
            .await
            .unwrap();
        let r1 = repo
            .insert(channel_id, None, Some(root), None, "~bob", "r1", 2, None)
            .await
            .unwrap();
        let _r2 = repo
            .insert(channel_id, None, Some(r1), None, "~carol", "r2", 3, None)
            .await
            .unwrap();
        let _r3 = repo
            .insert(channel_id, None, Some(root), None, "~dave", "r3", 4, None)
            .await
            .unwrap();

        let (subtree, _) = repo.list(channel_id, None, Some(root), None, None, 10).await.unwrap();
        let contents: Vec<&str> = subtree.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["r1", "r2", "r3"]);
    }

    #[tokio::test]
    async fn ring_buffer_evicts_oldest() {
        let (db, channel_id) = setup().await;
        let repo = MessageRepository::new(db.pool());
        for i in 0..5 {
            repo.insert(channel_id, None, None, None, "~alice", "x", i, Some(3))
                .await
                .unwrap();
        }
        let (rows, _) = repo.list(channel_id, None, None, None, None, 100).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|m| m.created_at >= 2));
    }

    #[tokio::test]
    async fn delete_tombstones_preserve_id_and_timestamps() {
        let (db, channel_id) = setup().await;
        let repo = MessageRepository::new(db.pool());
        let id = repo
            .insert(channel_id, None, None, None, "~alice", "hello", 10, None)
            .await
            .unwrap();
        repo.delete(id, 20, "author").await.unwrap();
        let row = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(row.content, "[deleted by author]");
        assert_eq!(row.created_at, 10);
        assert_eq!(row.deleted_at, Some(20));
    }
}
