//! Per-IP and per-user leaky buckets for connection attempts and posts.
//!
//! One `DashMap<Key, DirectRateLimiter>` per rate-limited concern, matching
//! the teacher's `RateLimitManager`: each key gets its own token bucket,
//! lazily created on first use. `cleanup()` uses the same simple strategy
//! as the teacher (clear the whole map past a size threshold) rather than
//! LRU eviction, since buckets are cheap to recreate and a burst of new
//! keys is itself a signal worth resetting state over.

use std::net::IpAddr;
use std::num::NonZeroU32;

use dashmap::DashMap;
use governor::{Quota, RateLimiter};
use tracing::debug;

type DirectRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

const MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Default, Clone, Copy)]
pub struct RateLimitStats {
    pub message_limiters: usize,
    pub connection_limiters: usize,
}

pub struct RateLimitManager {
    message_limiters: DashMap<i64, DirectRateLimiter>,
    connection_limiters: DashMap<IpAddr, DirectRateLimiter>,
    ip_message_limiters: DashMap<IpAddr, DirectRateLimiter>,
    user_quota: Quota,
    ip_quota: Quota,
    connection_quota: Quota,
}

impl RateLimitManager {
    pub fn new(user_posts_per_min: u32, ip_posts_per_min: u32, connections_per_min: u32) -> Self {
        Self {
            message_limiters: DashMap::new(),
            connection_limiters: DashMap::new(),
            ip_message_limiters: DashMap::new(),
            user_quota: per_minute(user_posts_per_min),
            ip_quota: per_minute(ip_posts_per_min),
            connection_quota: per_minute(connections_per_min),
        }
    }

    pub fn check_user_post(&self, user_key: i64) -> bool {
        self.message_limiters
            .entry(user_key)
            .or_insert_with(|| RateLimiter::direct(self.user_quota))
            .check()
            .is_ok()
    }

    pub fn check_ip_post(&self, ip: IpAddr) -> bool {
        self.ip_message_limiters
            .entry(ip)
            .or_insert_with(|| RateLimiter::direct(self.ip_quota))
            .check()
            .is_ok()
    }

    pub fn check_connection(&self, ip: IpAddr) -> bool {
        self.connection_limiters
            .entry(ip)
            .or_insert_with(|| RateLimiter::direct(self.connection_quota))
            .check()
            .is_ok()
    }

    pub fn remove_user(&self, user_key: i64) {
        self.message_limiters.remove(&user_key);
    }

    pub fn cleanup(&self) {
        if self.message_limiters.len() > MAX_ENTRIES {
            debug!(entries = self.message_limiters.len(), "clearing message rate limiters");
            self.message_limiters.clear();
        }
        if self.connection_limiters.len() > MAX_ENTRIES {
            self.connection_limiters.clear();
        }
        if self.ip_message_limiters.len() > MAX_ENTRIES {
            self.ip_message_limiters.clear();
        }
    }

    pub fn stats(&self) -> RateLimitStats {
        RateLimitStats {
            message_limiters: self.message_limiters.len(),
            connection_limiters: self.connection_limiters.len(),
        }
    }
}

fn per_minute(n: u32) -> Quota {
    let per_min = NonZeroU32::new(n.max(1)).expect("clamped to >= 1");
    Quota::per_minute(per_min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exceeding_quota_is_rejected() {
        let mgr = RateLimitManager::new(1, 100, 100);
        assert!(mgr.check_user_post(1));
        assert!(!mgr.check_user_post(1));
    }

    #[test]
    fn different_users_have_independent_buckets() {
        let mgr = RateLimitManager::new(1, 100, 100);
        assert!(mgr.check_user_post(1));
        assert!(mgr.check_user_post(2));
    }
}
