//! superchatd entry point: CLI/config resolution, startup validation,
//! background task spawning, and the four transport accept loops.

mod admin;
mod auth;
mod broker;
mod config;
mod db;
mod directory;
mod error;
mod metrics;
mod security;
mod session;
mod state;
mod transport;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::state::AppState;

/// CLI overrides layered on top of the config file; any field left `None`
/// falls back to whatever `Config::load` produced.
#[derive(Debug, Default)]
struct CliArgs {
    config_path: Option<String>,
    tcp_port: Option<u16>,
    ssh_port: Option<u16>,
    ws_port: Option<u16>,
    db_path: Option<String>,
    max_msg_bytes: Option<u32>,
    retention_sweep_interval: Option<u64>,
    admin_nickname: Option<String>,
    host_key_path: Option<String>,
}

/// Hand-rolled flag parsing, matching the teacher's `resolve_config_path`
/// style (no external arg-parsing crate) but extended to cover every flag
/// spec.md lists.
fn parse_args() -> CliArgs {
    let mut out = CliArgs::default();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let mut next_string = || {
            args.next().unwrap_or_else(|| {
                eprintln!("missing value after {arg}");
                std::process::exit(1);
            })
        };
        match arg.as_str() {
            "-c" | "--config" => out.config_path = Some(next_string()),
            "--tcp-port" => out.tcp_port = Some(parse_or_exit(&next_string(), "--tcp-port")),
            "--ssh-port" => out.ssh_port = Some(parse_or_exit(&next_string(), "--ssh-port")),
            "--ws-port" => out.ws_port = Some(parse_or_exit(&next_string(), "--ws-port")),
            "--db-path" => out.db_path = Some(next_string()),
            "--max-msg-bytes" => {
                out.max_msg_bytes = Some(parse_or_exit(&next_string(), "--max-msg-bytes"))
            }
            "--retention-sweep-interval" => {
                out.retention_sweep_interval =
                    Some(parse_or_exit(&next_string(), "--retention-sweep-interval"))
            }
            "--admin-nickname" => out.admin_nickname = Some(next_string()),
            "--host-key-path" => out.host_key_path = Some(next_string()),
            other if out.config_path.is_none() && !other.starts_with('-') => {
                out.config_path = Some(other.to_string());
            }
            other => {
                eprintln!("unrecognized argument: {other}");
                std::process::exit(1);
            }
        }
    }
    out
}

fn parse_or_exit<T: std::str::FromStr>(raw: &str, flag: &str) -> T {
    raw.parse().unwrap_or_else(|_| {
        eprintln!("invalid value {raw:?} for {flag}");
        std::process::exit(1);
    })
}

fn resolve_config_path(cli: &CliArgs) -> String {
    let raw_path = cli.config_path.clone().unwrap_or_else(|| "config.toml".to_string());
    match std::fs::canonicalize(Path::new(&raw_path)) {
        Ok(p) => p.to_string_lossy().into_owned(),
        Err(_) => raw_path,
    }
}

fn apply_overrides(mut config: Config, cli: &CliArgs) -> Config {
    if let Some(port) = cli.tcp_port {
        set_port(&mut config.listen.tcp_bind, port);
    }
    if let Some(port) = cli.ssh_port {
        set_port(&mut config.listen.ssh_bind, port);
        config.listen.enable_ssh = true;
    }
    if let Some(port) = cli.ws_port {
        set_port(&mut config.listen.ws_bind, port);
        config.listen.enable_websocket = true;
    }
    if let Some(path) = &cli.db_path {
        config.database.path = path.clone();
    }
    if let Some(bytes) = cli.max_msg_bytes {
        config.limits.max_msg_bytes = bytes;
    }
    if let Some(secs) = cli.retention_sweep_interval {
        config.history.retention_sweep_interval_secs = secs;
    }
    if let Some(nick) = &cli.admin_nickname {
        config.server.admin_nickname = Some(nick.clone());
    }
    if let Some(path) = &cli.host_key_path {
        config.ssh.host_key_path = path.clone();
    }
    config
}

fn set_port(bind: &mut String, port: u16) {
    let host = bind.rsplit_once(':').map(|(h, _)| h).unwrap_or("0.0.0.0");
    *bind = format!("{host}:{port}");
}

fn init_tracing(format: crate::config::LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match format {
        crate::config::LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .json()
                .init();
        }
        crate::config::LogFormat::Pretty => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .init();
        }
    }
}

/// Promotes `admin_nickname` to admin on first sight, once, by recording a
/// ServerConfig marker so later restarts don't re-run this against a
/// nickname the operator has since demoted.
async fn bootstrap_admin(state: &AppState) {
    let Some(nickname) = state.config.server.admin_nickname.clone() else {
        return;
    };
    let server_config = crate::db::server_config::ServerConfigRepository::new(state.db.pool());
    match server_config.get("admin_bootstrap_done").await {
        Ok(Some(_)) => return,
        Ok(None) => {}
        Err(e) => {
            warn!(error = %e, "failed to check admin bootstrap marker");
            return;
        }
    }

    let users = crate::db::users::UserRepository::new(state.db.pool());
    match users.find_by_nickname(&nickname).await {
        Ok(Some(user)) => {
            if let Err(e) = users.set_admin(user.user_id, true).await {
                warn!(error = %e, %nickname, "failed to promote admin_nickname to admin");
                return;
            }
            info!(%nickname, "promoted configured admin_nickname to admin");
        }
        Ok(None) => {
            info!(%nickname, "admin_nickname not registered yet, will promote on first registration");
            return;
        }
        Err(e) => {
            warn!(error = %e, "failed to look up admin_nickname");
            return;
        }
    }

    if let Err(e) = server_config.set("admin_bootstrap_done", "1").await {
        warn!(error = %e, "failed to record admin bootstrap marker");
    }
}

/// Loads every non-expired ban into [`crate::security::ban_cache::BanCache`]
/// so the hot path never touches the database.
async fn warm_ban_cache(state: &AppState) {
    let repo = crate::db::bans::BanRepository::new(state.db.pool());
    let now = now_unix_secs();
    let bans = match repo.list_active(now).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!(error = %e, "failed to warm ban cache from database");
            return;
        }
    };
    let mut user_count = 0;
    let mut ip_count = 0;
    for ban in bans {
        let expires_at = ban.banned_until.map(|ms| ms / 1000);
        if let Some(user_id) = ban.user_id {
            state.ban_cache.add_user_ban(
                user_id,
                crate::security::ban_cache::CachedUserBan {
                    reason: ban.reason.clone(),
                    expires_at,
                    is_shadowban: ban.is_shadowban,
                },
            );
            user_count += 1;
        } else if let Some(cidr) = &ban.cidr {
            match cidr.parse::<ipnet::IpNet>() {
                Ok(net) => {
                    state.ban_cache.add_ip_ban(
                        cidr,
                        crate::security::ban_cache::CachedIpBan {
                            net,
                            reason: ban.reason.clone(),
                            expires_at,
                        },
                    );
                    ip_count += 1;
                }
                Err(e) => warn!(%cidr, error = %e, "skipping malformed CIDR ban at startup"),
            }
        }
    }
    info!(user_count, ip_count, "warmed ban cache from database");
}

fn now_unix_secs() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs() as i64
}

/// Periodically hard-deletes forum messages past their channel's retention
/// window. Chat channels use the ring-buffer eviction in
/// `MessageRepository::insert_in_tx` instead and are skipped here.
async fn run_retention_sweeper(state: Arc<AppState>, mut shutdown_rx: broadcast::Receiver<()>) {
    let interval = std::time::Duration::from_secs(state.config.history.retention_sweep_interval_secs);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_rx.recv() => {
                info!("retention sweeper shutting down");
                return;
            }
        }

        let channels = crate::db::channels::ChannelRepository::new(state.db.pool());
        let rows = match channels.list().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "retention sweep: failed to list channels");
                continue;
            }
        };

        let now = now_unix_secs() * 1000;
        let messages = crate::db::messages::MessageRepository::new(state.db.pool());
        for channel in rows {
            let Some(hours) = channel.retention_hours else {
                continue;
            };
            let cutoff = now - (hours as i64) * 3600 * 1000;
            match messages.sweep_retention(channel.channel_id, cutoff).await {
                Ok(swept) if swept > 0 => {
                    crate::metrics::RETENTION_MESSAGES_SWEPT.inc_by(swept);
                    info!(channel = %channel.name, swept, "retention sweep removed messages");
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(channel = %channel.name, error = %e, "retention sweep failed");
                }
            }
        }
    }
}

/// Periodically prunes expired entries out of the in-memory ban cache and
/// rate limiter tables so long-lived processes don't accumulate stale keys.
async fn run_cache_janitor(state: Arc<AppState>, mut shutdown_rx: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_rx.recv() => {
                info!("cache janitor shutting down");
                return;
            }
        }
        let pruned_bans = state.ban_cache.prune_expired();
        state.rate_limiter.cleanup();
        if pruned_bans > 0 {
            info!(pruned_bans, "pruned expired ban cache entries");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = parse_args();
    let config_path = resolve_config_path(&cli);

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: failed to load config from {config_path}: {e}");
            std::process::exit(1);
        }
    };
    let config = apply_overrides(config, &cli);

    init_tracing(config.logging.format);

    if let Err(errors) = crate::config::validate(&config) {
        for err in &errors {
            error!(error = %err, "configuration validation failed");
        }
        eprintln!(
            "configuration validation failed with {} error(s)",
            errors.len()
        );
        std::process::exit(1);
    }

    info!(
        server = %config.server.name,
        network = %config.server.network,
        "starting superchatd"
    );

    let db_path = config.database.path.clone();
    let db = match Database::new(&db_path).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, path = %db_path, "failed to open database");
            std::process::exit(2);
        }
    };

    let state = AppState::new(config, db);

    warm_ban_cache(&state).await;
    bootstrap_admin(&state).await;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigint =
                signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
            tokio::select! {
                _ = sigint.recv() => info!("received SIGINT, shutting down"),
                _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            }
            let _ = shutdown_tx.send(());
        });
    }

    tokio::spawn(run_retention_sweeper(state.clone(), shutdown_tx.subscribe()));
    tokio::spawn(run_cache_janitor(state.clone(), shutdown_tx.subscribe()));

    if state.config.metrics.port != 0 {
        crate::metrics::init();
        let port = state.config.metrics.port;
        tokio::spawn(crate::metrics::run_http_server(port));
    }

    tokio::spawn(crate::directory::run(state.clone()));

    spawn_listener("tcp", crate::transport::tcp::run(state.clone()));
    spawn_listener("tcp+tls", crate::transport::tcp::run_tls(state.clone()));
    spawn_listener("websocket", crate::transport::ws::run(state.clone()));
    spawn_listener("ssh", crate::transport::ssh::run(state.clone()));

    let mut shutdown_rx = shutdown_tx.subscribe();
    let _ = shutdown_rx.recv().await;
    info!("shutdown signal received, stopping accept loops");

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    info!("superchatd stopped");
    Ok(())
}

/// Runs a transport's accept loop on its own task. A bind/accept-loop
/// failure is fatal (exit code 3); a clean `Ok(())` return just means the
/// transport is disabled (e.g. `run_tls`/`ssh::run` short-circuit when
/// unconfigured) and is not itself a shutdown signal.
fn spawn_listener<F>(name: &'static str, fut: F)
where
    F: std::future::Future<Output = std::io::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            error!(transport = name, error = %e, "listener exited with error");
            std::process::exit(3);
        }
    });
}
