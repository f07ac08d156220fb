//! Optional periodic registration with a directory service, per §6's
//! "Directory announce". Unauthenticated POST of a `ServerInfo` blob; the
//! directory may reject it and we just log and try again next interval.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
struct ServerInfo {
    name: String,
    description: String,
    hostname: String,
    port: u16,
    user_count: u64,
    max_users: u64,
    channel_count: u64,
}

/// Runs until the process exits; a no-op loop if no announce URL is
/// configured (the caller still spawns it for simplicity).
pub async fn run(state: Arc<AppState>) {
    let Some(url) = state.config.directory.announce_url.clone() else {
        debug!("directory announce disabled, no announce_url configured");
        return;
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("reqwest client builds with static config");

    let interval = Duration::from_secs(state.config.directory.announce_interval_secs);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let info = build_server_info(&state).await;
        match client.post(&url).json(&info).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!(%url, "directory announce accepted");
            }
            Ok(resp) => {
                warn!(%url, status = %resp.status(), "directory announce rejected");
            }
            Err(e) => {
                warn!(%url, error = %e, "directory announce request failed");
            }
        }
    }
}

async fn build_server_info(state: &AppState) -> ServerInfo {
    let channel_count = crate::db::channels::ChannelRepository::new(state.db.pool())
        .list()
        .await
        .map(|rows| rows.len() as u64)
        .unwrap_or(0);
    let user_count = crate::db::users::UserRepository::new(state.db.pool())
        .list()
        .await
        .map(|rows| rows.len() as u64)
        .unwrap_or(0);

    let hostname = state
        .config
        .listen
        .tcp_bind
        .split(':')
        .next()
        .unwrap_or("0.0.0.0")
        .to_string();
    let port = state
        .config
        .listen
        .tcp_bind
        .rsplit(':')
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap_or(6465);

    ServerInfo {
        name: state.config.server.name.clone(),
        description: state.config.server.description.clone(),
        hostname,
        port,
        user_count,
        max_users: 0,
        channel_count,
    }
}
