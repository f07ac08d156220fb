//! Batches concurrent [`InsertRequest`]s into a single transaction per
//! flush interval, per §4.5's write-batching requirement: acks are only
//! sent to callers once the batch commits, so a caller awaiting
//! [`WriteBatcher::submit`] never observes a message id that isn't
//! durable yet.

use std::time::Duration;

use sqlx::SqlitePool;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use super::messages::{InsertRequest, MessageRepository};
use super::DbError;

type Ack = oneshot::Sender<Result<i64, DbError>>;

#[derive(Clone)]
pub struct WriteBatcher {
    tx: mpsc::UnboundedSender<(InsertRequest, Ack)>,
}

impl WriteBatcher {
    /// Spawns the background flush task and returns a handle. `interval`
    /// is the maximum delay between a submission landing and its batch
    /// committing (spec caps this at 50ms).
    pub fn spawn(pool: SqlitePool, interval: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(pool, rx, interval));
        Self { tx }
    }

    /// Enqueues `req` and waits for its batch to commit, returning the
    /// new message id.
    pub async fn submit(&self, req: InsertRequest) -> Result<i64, DbError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send((req, ack_tx))
            .map_err(|_| DbError::Closed)?;
        ack_rx.await.map_err(|_| DbError::Closed)?
    }
}

async fn run(
    pool: SqlitePool,
    mut rx: mpsc::UnboundedReceiver<(InsertRequest, Ack)>,
    interval: Duration,
) {
    let mut pending: Vec<(InsertRequest, Ack)> = Vec::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            item = rx.recv() => {
                match item {
                    Some(item) => pending.push(item),
                    None => {
                        flush(&pool, std::mem::take(&mut pending)).await;
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                if !pending.is_empty() {
                    flush(&pool, std::mem::take(&mut pending)).await;
                }
            }
        }
    }
}

async fn flush(pool: &SqlitePool, batch: Vec<(InsertRequest, Ack)>) {
    if batch.is_empty() {
        return;
    }
    let (reqs, acks): (Vec<InsertRequest>, Vec<Ack>) = batch.into_iter().unzip();
    let repo = MessageRepository::new(pool);
    match repo.insert_batch(&reqs).await {
        Ok(results) => {
            for (ack, result) in acks.into_iter().zip(results.into_iter()) {
                let _ = ack.send(result);
            }
        }
        Err(e) => {
            warn!(error = %e, batch_len = acks.len(), "write batch transaction failed");
            let msg = e.to_string();
            for ack in acks {
                let _ = ack.send(Err(DbError::BatchFailed(msg.clone())));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::channels::{ChannelRepository, ChannelType};
    use crate::db::Database;

    #[tokio::test]
    async fn concurrent_submits_all_commit_and_get_distinct_ids() {
        let db = Database::new(":memory:").await.unwrap();
        let channel_id = ChannelRepository::new(db.pool())
            .create("general", "General", None, ChannelType::Forum, None, None, None, 0)
            .await
            .unwrap();

        let batcher = WriteBatcher::spawn(db.pool().clone(), Duration::from_millis(20));
        let mut handles = Vec::new();
        for i in 0..10 {
            let batcher = batcher.clone();
            handles.push(tokio::spawn(async move {
                batcher
                    .submit(InsertRequest {
                        channel_id,
                        subchannel_id: None,
                        parent_id: None,
                        author_user_id: None,
                        author_nickname: "~alice".to_string(),
                        content: format!("msg {i}"),
                        created_at: i,
                        ring_limit: None,
                    })
                    .await
                    .unwrap()
            }));
        }
        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap());
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }
}
