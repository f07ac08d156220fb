//! Process-wide shared state: the broker, store, security caches, and
//! config, constructed once at startup and handed to every session as an
//! `Arc<AppState>` — the broker and store are singletons torn down in
//! reverse order of construction, matching the teacher's `Matrix`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::broker::Broker;
use crate::config::Config;
use crate::db::write_batch::WriteBatcher;
use crate::db::Database;
use crate::security::{BanCache, RateLimitManager};

pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub broker: Broker,
    pub ban_cache: BanCache,
    pub rate_limiter: RateLimitManager,
    pub auth_backoff: crate::auth::AuthBackoff,
    pub write_batcher: WriteBatcher,
    session_id_gen: AtomicU64,
}

impl AppState {
    pub fn new(config: Config, db: Database) -> Arc<Self> {
        let rate_limiter = RateLimitManager::new(
            config.rate_limit.user_posts_per_min,
            config.rate_limit.ip_posts_per_min,
            config.rate_limit.connections_per_min_per_ip,
        );
        let write_batcher = WriteBatcher::spawn(
            db.pool().clone(),
            std::time::Duration::from_millis(config.history.write_batch_interval_ms),
        );
        Arc::new(Self {
            config,
            db,
            broker: Broker::new(),
            ban_cache: BanCache::new(),
            rate_limiter,
            auth_backoff: crate::auth::AuthBackoff::new(),
            write_batcher,
            session_id_gen: AtomicU64::new(1),
        })
    }

    pub fn next_session_id(&self) -> u64 {
        self.session_id_gen.fetch_add(1, Ordering::Relaxed)
    }
}
