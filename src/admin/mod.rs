//! Privileged command handlers: ban/unban, user and channel deletion,
//! listing. Every entry point assumes the caller has already checked
//! `UserRow::is_admin`; this module only implements the operations
//! themselves.

use std::time::{SystemTime, UNIX_EPOCH};

use superchat_proto::payload::{
    AdminOk, BanList, BanSummary, DeleteChannel, DeleteUser, UnbanIp, UnbanUser, UserList,
    UserSummary,
};

use crate::db::bans::BanRepository;
use crate::db::channels::ChannelRepository;
use crate::db::users::UserRepository;
use crate::error::HandlerError;
use crate::security::ban_cache::{CachedIpBan, CachedUserBan};
use crate::state::AppState;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as i64
}

pub async fn ban_user(
    state: &AppState,
    admin_id: i64,
    target_user_id: u64,
    reason: &str,
    duration_secs: Option<u64>,
    shadowban: bool,
) -> Result<AdminOk, HandlerError> {
    let repo = BanRepository::new(state.db.pool());
    let now = now_ms();
    let until = duration_secs.map(|d| now + (d as i64) * 1000);
    repo.ban_user(target_user_id as i64, reason, now, until, admin_id, shadowban)
        .await?;
    state.ban_cache.add_user_ban(
        target_user_id as i64,
        CachedUserBan {
            reason: reason.to_string(),
            expires_at: until.map(|t| t / 1000),
            is_shadowban: shadowban,
        },
    );
    Ok(AdminOk {
        success: true,
        reason: None,
    })
}

pub async fn ban_ip(
    state: &AppState,
    admin_id: i64,
    cidr: &str,
    reason: &str,
    duration_secs: Option<u64>,
) -> Result<AdminOk, HandlerError> {
    let net: ipnet::IpNet = cidr
        .parse()
        .map_err(|_| HandlerError::Validation(format!("invalid CIDR: {cidr}")))?;
    let repo = BanRepository::new(state.db.pool());
    let now = now_ms();
    let until = duration_secs.map(|d| now + (d as i64) * 1000);
    repo.ban_ip(cidr, reason, now, until, admin_id).await?;
    state.ban_cache.add_ip_ban(
        cidr,
        CachedIpBan {
            net,
            reason: reason.to_string(),
            expires_at: until.map(|t| t / 1000),
        },
    );
    Ok(AdminOk {
        success: true,
        reason: None,
    })
}

pub async fn unban_user(
    state: &AppState,
    req: UnbanUser,
) -> Result<AdminOk, HandlerError> {
    let repo = BanRepository::new(state.db.pool());
    repo.unban_user(req.user_id as i64).await?;
    state.ban_cache.remove_user_ban(req.user_id as i64);
    Ok(AdminOk {
        success: true,
        reason: None,
    })
}

pub async fn unban_ip(state: &AppState, req: UnbanIp) -> Result<AdminOk, HandlerError> {
    let repo = BanRepository::new(state.db.pool());
    repo.unban_ip(&req.cidr).await?;
    state.ban_cache.remove_ip_ban(&req.cidr);
    Ok(AdminOk {
        success: true,
        reason: None,
    })
}

pub async fn list_bans(state: &AppState) -> Result<BanList, HandlerError> {
    let repo = BanRepository::new(state.db.pool());
    let rows = repo.list().await?;
    Ok(BanList {
        bans: rows
            .into_iter()
            .map(|b| BanSummary {
                user_id: b.user_id.map(|id| id as u64),
                cidr: b.cidr,
                reason: b.reason,
                banned_at: b.banned_at as u64,
                banned_until: b.banned_until.map(|t| t as u64),
                banned_by: b.banned_by.unwrap_or(0) as u64,
                is_shadowban: b.is_shadowban,
            })
            .collect(),
    })
}

pub async fn list_users(state: &AppState) -> Result<UserList, HandlerError> {
    let repo = UserRepository::new(state.db.pool());
    let rows = repo.list().await?;
    Ok(UserList {
        users: rows
            .into_iter()
            .map(|u| UserSummary {
                user_id: u.user_id as u64,
                is_admin: u.is_admin(),
                nickname: u.nickname,
                created_at: u.created_at as u64,
            })
            .collect(),
    })
}

pub async fn delete_user(state: &AppState, req: DeleteUser) -> Result<AdminOk, HandlerError> {
    let repo = UserRepository::new(state.db.pool());
    repo.delete(req.user_id as i64).await?;
    state.ban_cache.remove_user_ban(req.user_id as i64);
    state.rate_limiter.remove_user(req.user_id as i64);
    Ok(AdminOk {
        success: true,
        reason: None,
    })
}

pub async fn delete_channel(
    state: &AppState,
    req: DeleteChannel,
) -> Result<AdminOk, HandlerError> {
    let repo = ChannelRepository::new(state.db.pool());
    repo.delete(req.channel_id as i64).await?;
    Ok(AdminOk {
        success: true,
        reason: None,
    })
}
