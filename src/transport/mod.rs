//! Per-transport accept loops. Each adapter's only job is to turn a raw
//! connection into a `Box<dyn FrameCarrier>` and a peer IP, reject it at
//! accept time if banned or over the connection-rate quota, then hand it
//! off to [`crate::session::Session::run`] on its own task.

pub mod ssh;
pub mod tcp;
pub mod ws;

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{info, warn};

use crate::state::AppState;

/// Shared accept-time gate used by every transport: banned IPs are
/// refused before a [`crate::session::Session`] is even constructed, and
/// a connection-rate quota bounds how fast one address can open sockets.
pub fn admission_check(state: &AppState, peer_ip: IpAddr) -> Result<(), &'static str> {
    if let Some(ban) = state.ban_cache.check_ip(peer_ip) {
        crate::metrics::CONNECTIONS_REJECTED_BANNED.inc();
        warn!(%peer_ip, reason = %ban.reason, "connection refused, banned IP");
        return Err("banned");
    }
    if !state.rate_limiter.check_connection(peer_ip) {
        warn!(%peer_ip, "connection refused, over connection rate quota");
        return Err("rate_limited");
    }
    crate::metrics::CONNECTIONS_ACCEPTED.inc();
    Ok(())
}

pub fn spawn_session(
    state: Arc<AppState>,
    peer_ip: IpAddr,
    ssh_fingerprint: Option<String>,
    carrier: Box<dyn superchat_proto::FrameCarrier>,
) {
    spawn_session_with_preauth(
        state,
        peer_ip,
        ssh_fingerprint,
        crate::session::SshPreauth::NotSsh,
        carrier,
    )
}

pub fn spawn_session_with_preauth(
    state: Arc<AppState>,
    peer_ip: IpAddr,
    ssh_fingerprint: Option<String>,
    ssh_preauth: crate::session::SshPreauth,
    carrier: Box<dyn superchat_proto::FrameCarrier>,
) {
    crate::metrics::ACTIVE_SESSIONS.inc();
    let session =
        crate::session::Session::with_ssh_preauth(state.clone(), peer_ip, ssh_fingerprint, ssh_preauth);
    tokio::spawn(async move {
        session.run(carrier).await;
        crate::metrics::ACTIVE_SESSIONS.dec();
    });
}

pub fn log_listening(transport: &str, bind: &str) {
    info!(%transport, %bind, "transport listening");
}
