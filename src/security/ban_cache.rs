//! In-memory ban cache, refreshed from the store at startup and on every
//! admin ban/unban so the hot path (every accepted connection, every
//! `POST_MESSAGE`) never touches the database.

use std::net::IpAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use ipnet::IpNet;

#[derive(Debug, Clone)]
pub struct CachedUserBan {
    pub reason: String,
    pub expires_at: Option<i64>,
    pub is_shadowban: bool,
}

#[derive(Debug, Clone)]
pub struct CachedIpBan {
    pub net: IpNet,
    pub reason: String,
    pub expires_at: Option<i64>,
}

impl CachedUserBan {
    fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(until) if until <= now)
    }
}

impl CachedIpBan {
    fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(until) if until <= now)
    }
}

#[derive(Debug, Clone)]
pub struct BanResult {
    pub reason: String,
    pub is_shadowban: bool,
}

#[derive(Default)]
pub struct BanCache {
    user_bans: DashMap<i64, CachedUserBan>,
    ip_bans: DashMap<String, CachedIpBan>,
}

impl BanCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user_ban(&self, user_id: i64, ban: CachedUserBan) {
        self.user_bans.insert(user_id, ban);
    }

    pub fn add_ip_ban(&self, cidr: &str, ban: CachedIpBan) {
        self.ip_bans.insert(cidr.to_string(), ban);
    }

    pub fn remove_user_ban(&self, user_id: i64) {
        self.user_bans.remove(&user_id);
    }

    pub fn remove_ip_ban(&self, cidr: &str) {
        self.ip_bans.remove(cidr);
    }

    pub fn check_user(&self, user_id: i64) -> Option<BanResult> {
        let now = now_unix_secs();
        let entry = self.user_bans.get(&user_id)?;
        if entry.is_expired(now) {
            return None;
        }
        Some(BanResult {
            reason: entry.reason.clone(),
            is_shadowban: entry.is_shadowban,
        })
    }

    pub fn check_ip(&self, ip: IpAddr) -> Option<BanResult> {
        let now = now_unix_secs();
        for entry in self.ip_bans.iter() {
            if entry.is_expired(now) {
                continue;
            }
            if entry.net.contains(&ip) {
                return Some(BanResult {
                    reason: entry.reason.clone(),
                    is_shadowban: false,
                });
            }
        }
        None
    }

    /// Drops expired entries; called periodically alongside the retention
    /// sweeper rather than on every lookup.
    pub fn prune_expired(&self) -> usize {
        let now = now_unix_secs();
        let mut pruned = 0;
        self.user_bans.retain(|_, b| {
            let keep = !b.is_expired(now);
            if !keep {
                pruned += 1;
            }
            keep
        });
        self.ip_bans.retain(|_, b| {
            let keep = !b.is_expired(now);
            if !keep {
                pruned += 1;
            }
            keep
        });
        pruned
    }
}

fn now_unix_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cidr_ban_matches_contained_address() {
        let cache = BanCache::new();
        cache.add_ip_ban(
            "10.0.0.0/8",
            CachedIpBan {
                net: "10.0.0.0/8".parse().unwrap(),
                reason: "spam".to_string(),
                expires_at: None,
            },
        );
        assert!(cache.check_ip("10.1.2.3".parse().unwrap()).is_some());
        assert!(cache.check_ip("192.168.1.1".parse().unwrap()).is_none());
    }

    #[test]
    fn expired_user_ban_is_not_returned() {
        let cache = BanCache::new();
        cache.add_user_ban(
            1,
            CachedUserBan {
                reason: "test".to_string(),
                expires_at: Some(0),
                is_shadowban: false,
            },
        );
        assert!(cache.check_user(1).is_none());
    }
}
