//! Sub-structs making up [`crate::config::Config`].

use serde::Deserialize;

use super::defaults::*;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_server_name")]
    pub name: String,
    #[serde(default = "default_network_name")]
    pub network: String,
    #[serde(default = "default_description")]
    pub description: String,
    /// First-admin bootstrap nickname; promoted to admin on first sight.
    pub admin_nickname: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenSection {
    #[serde(default = "default_tcp_bind")]
    pub tcp_bind: String,
    #[serde(default = "default_ssh_bind")]
    pub ssh_bind: String,
    #[serde(default = "default_ws_bind")]
    pub ws_bind: String,
    #[serde(default = "default_wss_bind")]
    pub wss_bind: String,
    #[serde(default)]
    pub enable_ssh: bool,
    #[serde(default)]
    pub enable_websocket: bool,
}

impl Default for ListenSection {
    fn default() -> Self {
        Self {
            tcp_bind: default_tcp_bind(),
            ssh_bind: default_ssh_bind(),
            ws_bind: default_ws_bind(),
            wss_bind: default_wss_bind(),
            enable_ssh: false,
            enable_websocket: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TlsSection {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SshSection {
    #[serde(default = "default_host_key_path")]
    pub host_key_path: String,
    #[serde(default = "default_ssh_registration_code_ttl_secs")]
    pub registration_code_ttl_secs: u64,
}

impl Default for SshSection {
    fn default() -> Self {
        Self {
            host_key_path: default_host_key_path(),
            registration_code_ttl_secs: default_ssh_registration_code_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsSection {
    #[serde(default = "default_max_msg_bytes")]
    pub max_msg_bytes: u32,
    #[serde(default = "default_outbound_depth")]
    pub outbound_queue_depth: usize,
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
    #[serde(default = "default_reply_enqueue_timeout_secs")]
    pub reply_enqueue_timeout_secs: u64,
}

impl Default for LimitsSection {
    fn default() -> Self {
        Self {
            max_msg_bytes: default_max_msg_bytes(),
            outbound_queue_depth: default_outbound_depth(),
            idle_timeout_secs: default_idle_timeout_secs(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            reply_enqueue_timeout_secs: default_reply_enqueue_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistorySection {
    #[serde(default = "default_retention_sweep_interval_secs")]
    pub retention_sweep_interval_secs: u64,
    #[serde(default = "default_write_batch_interval_ms")]
    pub write_batch_interval_ms: u64,
    #[serde(default = "default_forum_retention_hours")]
    pub default_forum_retention_hours: u32,
    #[serde(default = "default_chat_ring_limit")]
    pub default_chat_ring_limit: u32,
}

impl Default for HistorySection {
    fn default() -> Self {
        Self {
            retention_sweep_interval_secs: default_retention_sweep_interval_secs(),
            write_batch_interval_ms: default_write_batch_interval_ms(),
            default_forum_retention_hours: default_forum_retention_hours(),
            default_chat_ring_limit: default_chat_ring_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSection {
    #[serde(default = "default_user_posts_per_min")]
    pub user_posts_per_min: u32,
    #[serde(default = "default_ip_posts_per_min")]
    pub ip_posts_per_min: u32,
    #[serde(default = "default_connections_per_min_per_ip")]
    pub connections_per_min_per_ip: u32,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            user_posts_per_min: default_user_posts_per_min(),
            ip_posts_per_min: default_ip_posts_per_min(),
            connections_per_min_per_ip: default_connections_per_min_per_ip(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelsSection {
    #[serde(default = "default_open_channel_creation")]
    pub open_creation: bool,
}

impl Default for ChannelsSection {
    fn default() -> Self {
        Self {
            open_creation: default_open_channel_creation(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DirectorySection {
    pub announce_url: Option<String>,
    #[serde(default = "default_directory_announce_interval_secs")]
    pub announce_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSection {
    /// `0` disables the `/metrics` HTTP endpoint entirely.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingSection {
    #[serde(default)]
    pub format: LogFormat,
}
