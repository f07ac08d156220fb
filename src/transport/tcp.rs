//! Plain TCP and TLS-over-TCP accept loops, framed with
//! [`superchat_proto::StreamCarrier`].

use std::sync::Arc;

use superchat_proto::transport::StreamCarrier;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{error, warn};

use crate::state::AppState;

use super::{admission_check, log_listening, spawn_session};

pub async fn run(state: Arc<AppState>) -> std::io::Result<()> {
    let bind = state.config.listen.tcp_bind.clone();
    let listener = TcpListener::bind(&bind).await?;
    log_listening("tcp", &bind);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(ok) => ok,
            Err(e) => {
                error!(error = %e, "tcp accept failed");
                continue;
            }
        };
        let peer_ip = peer.ip();
        let state = state.clone();
        if let Err(reason) = admission_check(&state, peer_ip) {
            debug_reject(&peer_ip, reason);
            continue;
        }
        let max_payload = state.config.limits.max_msg_bytes;
        tokio::spawn(async move {
            let _ = stream.set_nodelay(true);
            let carrier: Box<dyn superchat_proto::FrameCarrier> =
                Box::new(StreamCarrier::new(stream, max_payload));
            spawn_session(state, peer_ip, None, carrier);
        });
    }
}

/// Runs the TLS listener if `tls.cert_path`/`tls.key_path` are configured;
/// otherwise returns immediately so the caller can treat it as an optional
/// background task, matching how `enable_ssh`/`enable_websocket` gate their
/// own transports.
pub async fn run_tls(state: Arc<AppState>) -> std::io::Result<()> {
    let (Some(cert_path), Some(key_path)) = (
        state.config.tls.cert_path.clone(),
        state.config.tls.key_path.clone(),
    ) else {
        return Ok(());
    };

    let acceptor = build_tls_acceptor(&cert_path, &key_path)?;
    let bind = wss_style_bind(&state.config.listen.tcp_bind);
    let listener = TcpListener::bind(&bind).await?;
    log_listening("tcp+tls", &bind);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(ok) => ok,
            Err(e) => {
                error!(error = %e, "tls accept failed");
                continue;
            }
        };
        let peer_ip = peer.ip();
        let state = state.clone();
        if let Err(reason) = admission_check(&state, peer_ip) {
            debug_reject(&peer_ip, reason);
            continue;
        }
        let acceptor = acceptor.clone();
        let max_payload = state.config.limits.max_msg_bytes;
        tokio::spawn(async move {
            match acceptor.accept(stream).await {
                Ok(tls_stream) => {
                    let carrier: Box<dyn superchat_proto::FrameCarrier> =
                        Box::new(StreamCarrier::new(tls_stream, max_payload));
                    spawn_session(state, peer_ip, None, carrier);
                }
                Err(e) => warn!(error = %e, %peer_ip, "tls handshake failed"),
            }
        });
    }
}

fn debug_reject(peer_ip: &std::net::IpAddr, reason: &str) {
    tracing::debug!(%peer_ip, reason, "connection rejected at accept time");
}

/// The TLS port is one above the plaintext TCP port unless a distinct
/// `wss_bind` style override is needed; kept simple since spec.md leaves
/// the exact TLS-port convention unspecified.
fn wss_style_bind(tcp_bind: &str) -> String {
    if let Some((host, port)) = tcp_bind.rsplit_once(':') {
        if let Ok(p) = port.parse::<u16>() {
            return format!("{host}:{}", p + 1);
        }
    }
    tcp_bind.to_string()
}

fn build_tls_acceptor(cert_path: &str, key_path: &str) -> std::io::Result<TlsAcceptor> {
    let certs = load_certs(cert_path)?;
    let key = load_key(key_path)?;
    let config = tokio_rustls::rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(TlsAcceptor::from(Arc::new(config)))
}

fn load_certs(path: &str) -> std::io::Result<Vec<tokio_rustls::rustls::pki_types::CertificateDer<'static>>> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    rustls_pemfile::certs(&mut reader).collect()
}

fn load_key(path: &str) -> std::io::Result<tokio_rustls::rustls::pki_types::PrivateKeyDer<'static>> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)?
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidData, "no private key found"))
}
