//! Prometheus metrics and the `/metrics` HTTP endpoint.
//!
//! Mirrors the teacher's `metrics.rs`/`http.rs` split: a `lazy_static`
//! registry of counters/gauges populated from the hot paths, and a
//! tiny axum server on its own task that just encodes and serves them.

use axum::routing::get;
use axum::Router;
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::net::SocketAddr;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref CONNECTIONS_ACCEPTED: IntCounter = IntCounter::new(
        "superchat_connections_accepted_total",
        "Total connections accepted across all transports"
    ).unwrap();

    pub static ref CONNECTIONS_REJECTED_BANNED: IntCounter = IntCounter::new(
        "superchat_connections_rejected_banned_total",
        "Connections rejected at accept time due to an active IP ban"
    ).unwrap();

    pub static ref MESSAGES_POSTED: IntCounter = IntCounter::new(
        "superchat_messages_posted_total",
        "Total messages successfully posted"
    ).unwrap();

    pub static ref BROADCASTS_DELIVERED: IntCounter = IntCounter::new(
        "superchat_broadcasts_delivered_total",
        "Total NEW_MESSAGE/MESSAGE_EDITED/MESSAGE_DELETED frames delivered"
    ).unwrap();

    pub static ref BROADCASTS_DROPPED: IntCounter = IntCounter::new(
        "superchat_broadcasts_dropped_total",
        "Total broadcasts dropped due to a full session outbound queue"
    ).unwrap();

    pub static ref RATE_LIMITED: IntCounter = IntCounter::new(
        "superchat_rate_limited_total",
        "Requests rejected by a leaky bucket"
    ).unwrap();

    pub static ref RETENTION_MESSAGES_SWEPT: IntCounter = IntCounter::new(
        "superchat_retention_messages_swept_total",
        "Messages hard-deleted by the retention sweeper"
    ).unwrap();

    pub static ref ACTIVE_SESSIONS: IntGauge = IntGauge::new(
        "superchat_active_sessions",
        "Currently connected sessions across all transports"
    ).unwrap();
}

/// Registers every metric above. Idempotent in practice since it runs once
/// at startup, but `register` itself would error on a duplicate name.
pub fn init() {
    REGISTRY.register(Box::new(CONNECTIONS_ACCEPTED.clone())).unwrap();
    REGISTRY.register(Box::new(CONNECTIONS_REJECTED_BANNED.clone())).unwrap();
    REGISTRY.register(Box::new(MESSAGES_POSTED.clone())).unwrap();
    REGISTRY.register(Box::new(BROADCASTS_DELIVERED.clone())).unwrap();
    REGISTRY.register(Box::new(BROADCASTS_DROPPED.clone())).unwrap();
    REGISTRY.register(Box::new(RATE_LIMITED.clone())).unwrap();
    REGISTRY.register(Box::new(RETENTION_MESSAGES_SWEPT.clone())).unwrap();
    REGISTRY.register(Box::new(ACTIVE_SESSIONS.clone())).unwrap();
}

fn gather() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

async fn metrics_handler() -> String {
    gather()
}

/// Serves `/metrics` until the process exits. `port = 0` means "don't
/// call this" — checked by the caller, matching the teacher's convention.
pub async fn run_http_server(port: u16) {
    let app = Router::new().route("/metrics", get(metrics_handler));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "metrics HTTP server listening");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind metrics HTTP server");
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "metrics HTTP server error");
    }
}
