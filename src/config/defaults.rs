//! Typed defaults for every `#[serde(default = "...")]` field in `Config`.
//!
//! Centralized here so the shape of a bare-bones `config.toml` is obvious
//! from one file instead of scattered across every sub-struct.

use rand::distributions::Alphanumeric;
use rand::Rng;

pub fn default_server_name() -> String {
    "SuperChat".to_string()
}

pub fn default_network_name() -> String {
    "superchat-net".to_string()
}

pub fn default_description() -> String {
    "A SuperChat server".to_string()
}

pub fn default_tcp_bind() -> String {
    "0.0.0.0:6465".to_string()
}

pub fn default_ssh_bind() -> String {
    "0.0.0.0:6466".to_string()
}

pub fn default_ws_bind() -> String {
    "0.0.0.0:8080".to_string()
}

pub fn default_wss_bind() -> String {
    "0.0.0.0:8443".to_string()
}

pub fn default_metrics_port() -> u16 {
    9090
}

pub fn default_db_path() -> String {
    "superchat.db".to_string()
}

pub fn default_host_key_path() -> String {
    "ssh_host_key.ed25519".to_string()
}

pub fn default_max_msg_bytes() -> u32 {
    1024 * 1024
}

pub fn default_outbound_depth() -> usize {
    256
}

pub fn default_idle_timeout_secs() -> u64 {
    300
}

pub fn default_handshake_timeout_secs() -> u64 {
    30
}

pub fn default_reply_enqueue_timeout_secs() -> u64 {
    5
}

pub fn default_retention_sweep_interval_secs() -> u64 {
    300
}

pub fn default_write_batch_interval_ms() -> u64 {
    50
}

pub fn default_user_posts_per_min() -> u32 {
    30
}

pub fn default_ip_posts_per_min() -> u32 {
    120
}

pub fn default_connections_per_min_per_ip() -> u32 {
    60
}

pub fn default_open_channel_creation() -> bool {
    true
}

pub fn default_chat_ring_limit() -> u32 {
    10_000
}

pub fn default_forum_retention_hours() -> u32 {
    24 * 30
}

pub fn default_ssh_registration_code_ttl_secs() -> u64 {
    600
}

/// Generated once at startup if no TLS is configured and none is given.
/// An ephemeral secret never persisted is a foot-gun for multi-process
/// deployments; `tracing::warn!` on use tells the operator to pin one.
pub fn default_directory_announce_interval_secs() -> u64 {
    300
}

pub fn random_admin_bootstrap_token() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    tracing::warn!("no admin_bootstrap_token configured; generated an ephemeral one for this run");
    token
}
