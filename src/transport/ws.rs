//! WebSocket accept loop: a plain TCP listener that upgrades each
//! connection to a WebSocket before handing it to
//! [`superchat_proto::transport::WebSocketCarrier`].

use std::sync::Arc;

use superchat_proto::transport::WebSocketCarrier;
use tokio::net::TcpListener;
use tracing::{error, warn};

use crate::state::AppState;

use super::{admission_check, log_listening, spawn_session};

pub async fn run(state: Arc<AppState>) -> std::io::Result<()> {
    let bind = state.config.listen.ws_bind.clone();
    let listener = TcpListener::bind(&bind).await?;
    log_listening("websocket", &bind);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(ok) => ok,
            Err(e) => {
                error!(error = %e, "websocket accept failed");
                continue;
            }
        };
        let peer_ip = peer.ip();
        let state = state.clone();
        if let Err(reason) = admission_check(&state, peer_ip) {
            tracing::debug!(%peer_ip, reason, "connection rejected at accept time");
            continue;
        }
        let max_payload = state.config.limits.max_msg_bytes;
        tokio::spawn(async move {
            let _ = stream.set_nodelay(true);
            match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => {
                    let carrier: Box<dyn superchat_proto::FrameCarrier> =
                        Box::new(WebSocketCarrier::new(ws, max_payload));
                    spawn_session(state, peer_ip, None, carrier);
                }
                Err(e) => warn!(error = %e, %peer_ip, "websocket handshake failed"),
            }
        });
    }
}
