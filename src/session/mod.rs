//! Per-connection state machine: handshake, auth, command dispatch, and the
//! outbound writer loop. One `Session` per accepted carrier, independent of
//! which transport produced it.
//!
//! ```text
//! CONNECTING -> AWAITING_NICK -> IDLE <-> AUTH_PENDING
//!                                      \-> CLOSED
//! ```
//!
//! The session owns its outbound queue and subscription set; the broker
//! only holds a session_id + sender capability (a weak handle) and drops
//! it on disconnect.

mod handlers;

use std::net::IpAddr;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use superchat_proto::payload::{ChannelCreationPolicy, ErrorPayload, ServerConfig, WireErrorCode};
use superchat_proto::{decode_payload, FrameCarrier, Frame, Payload};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::broker::{SessionHandle, SessionId};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    None,
    Anonymous,
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    AwaitingNick,
    Idle,
    Closed,
}

/// Resolution of an SSH connection's public key against `SSHKeys`,
/// decided by the SSH transport adapter at `auth_publickey` time (it's
/// the only layer that sees the raw key) and handed to the session so it
/// can either auto-authenticate or nudge the user toward `ADD_SSH_KEY`.
pub enum SshPreauth {
    NotSsh,
    Known {
        user_id: i64,
        nickname: String,
        is_admin: bool,
    },
    Unregistered {
        registration_code: String,
    },
}

/// Everything the command handlers need; separate from I/O so handlers are
/// plain async functions over shared state instead of methods tangled with
/// the carrier.
pub struct SessionCtx {
    pub session_id: SessionId,
    pub peer_ip: IpAddr,
    pub claimed_nickname: Option<String>,
    pub user_id: Option<i64>,
    pub is_admin: bool,
    pub auth_state: AuthState,
    pub phase: SessionPhase,
    pub ssh_fingerprint: Option<String>,
}

impl SessionCtx {
    fn new(session_id: SessionId, peer_ip: IpAddr, ssh_fingerprint: Option<String>) -> Self {
        Self {
            session_id,
            peer_ip,
            claimed_nickname: None,
            user_id: None,
            is_admin: false,
            auth_state: AuthState::None,
            phase: SessionPhase::Connecting,
            ssh_fingerprint,
        }
    }

    /// Display nickname as it appears in `author_nickname` snapshots:
    /// `~name` for anonymous, bare `name` for authenticated.
    pub fn display_nickname(&self) -> Option<String> {
        self.claimed_nickname.clone()
    }
}

const OUTBOUND_REPLY_TIMEOUT: Duration = Duration::from_secs(5);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Session {
    ctx: SessionCtx,
    state: Arc<AppState>,
    outbound_tx: mpsc::Sender<Arc<Frame>>,
    outbound_rx: mpsc::Receiver<Arc<Frame>>,
    ssh_preauth: SshPreauth,
}

impl Session {
    pub fn new(state: Arc<AppState>, peer_ip: IpAddr, ssh_fingerprint: Option<String>) -> Self {
        Self::with_ssh_preauth(state, peer_ip, ssh_fingerprint, SshPreauth::NotSsh)
    }

    pub fn with_ssh_preauth(
        state: Arc<AppState>,
        peer_ip: IpAddr,
        ssh_fingerprint: Option<String>,
        ssh_preauth: SshPreauth,
    ) -> Self {
        let session_id = state.next_session_id();
        let depth = state.config.limits.outbound_queue_depth;
        let (outbound_tx, outbound_rx) = mpsc::channel(depth);
        Self {
            ctx: SessionCtx::new(session_id, peer_ip, ssh_fingerprint),
            state,
            outbound_tx,
            outbound_rx,
            ssh_preauth,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.ctx.session_id
    }

    /// Drives one connection end-to-end: emits `SERVER_CONFIG`, then reads
    /// and dispatches frames until the carrier closes or the session is
    /// torn down. A dedicated writer task drains `outbound` in order while
    /// this loop reads and dispatches, matching the teacher's
    /// reader-task/writer-task split.
    #[instrument(skip(self, carrier), fields(session_id = self.ctx.session_id, peer_ip = %self.ctx.peer_ip))]
    pub async fn run(mut self, mut carrier: Box<dyn FrameCarrier>) {
        self.state.broker.register_session(SessionHandle {
            session_id: self.ctx.session_id,
            tx: self.outbound_tx.clone(),
        });

        let hello = self.server_config_frame();
        if carrier.send_frame(hello).await.is_err() {
            self.state.broker.remove_session(self.ctx.session_id);
            return;
        }
        self.ctx.phase = SessionPhase::AwaitingNick;

        match std::mem::replace(&mut self.ssh_preauth, SshPreauth::NotSsh) {
            SshPreauth::NotSsh => {}
            SshPreauth::Known {
                user_id,
                nickname,
                is_admin,
            } => {
                self.ctx.user_id = Some(user_id);
                self.ctx.is_admin = is_admin;
                self.ctx.claimed_nickname = Some(nickname);
                self.ctx.auth_state = AuthState::Authenticated;
                self.ctx.phase = SessionPhase::Idle;
            }
            SshPreauth::Unregistered { registration_code } => {
                let err = ErrorPayload {
                    code: WireErrorCode::NeedRegistration,
                    message: registration_code,
                    in_reply_to: None,
                    retry_after_secs: None,
                };
                if carrier.send_frame(Payload::Error(err).into_frame()).await.is_err() {
                    self.state.broker.remove_session(self.ctx.session_id);
                    return;
                }
            }
        }

        let handshake_deadline = tokio::time::sleep(HANDSHAKE_TIMEOUT);
        tokio::pin!(handshake_deadline);
        let idle_timeout = Duration::from_secs(self.state.config.limits.idle_timeout_secs);

        loop {
            tokio::select! {
                biased;

                outgoing = self.outbound_rx.recv() => {
                    match outgoing {
                        Some(frame) => {
                            if carrier.send_frame((*frame).clone()).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }

                incoming = timeout(idle_timeout, carrier.recv_frame()) => {
                    match incoming {
                        Err(_elapsed) => {
                            debug!("idle timeout, closing session");
                            break;
                        }
                        Ok(Err(e)) => {
                            debug!(error = %e, "carrier read error, closing session");
                            break;
                        }
                        Ok(Ok(None)) => break,
                        Ok(Ok(Some(frame))) => {
                            if self.dispatch_frame(frame, &mut carrier).await.is_break() {
                                break;
                            }
                        }
                    }
                }
            }
        }

        self.state.broker.remove_session(self.ctx.session_id);
        info!("session closed");
    }

    fn server_config_frame(&self) -> Frame {
        let policy = if self.state.config.channels.open_creation {
            ChannelCreationPolicy::Open
        } else {
            ChannelCreationPolicy::RegisteredOnly
        };
        let payload = Payload::ServerConfig(ServerConfig {
            protocol_version: superchat_proto::PROTOCOL_VERSION,
            max_message_bytes: self.state.config.limits.max_msg_bytes,
            channel_creation_policy: policy,
            directory_announce_hint: self.state.config.directory.announce_url.clone(),
            server_name: self.state.config.server.name.clone(),
        });
        payload.into_frame()
    }

    async fn dispatch_frame(
        &mut self,
        frame: Frame,
        carrier: &mut Box<dyn FrameCarrier>,
    ) -> ControlFlow<()> {
        let Some(msg_type) = frame.msg_type() else {
            // unknown type byte: silently discard and continue
            return ControlFlow::Continue(());
        };

        let payload = match decode_payload(msg_type, &frame.payload) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "malformed payload");
                let err = ErrorPayload {
                    code: WireErrorCode::MalformedFrame,
                    message: e.to_string(),
                    in_reply_to: Some(frame.raw_type),
                    retry_after_secs: None,
                };
                let _ = self.reply(carrier, Payload::Error(err)).await;
                return ControlFlow::Continue(());
            }
        };

        match handlers::handle(&mut self.ctx, &self.state, payload).await {
            Ok(Some(reply)) => {
                if self.reply(carrier, reply).await.is_err() {
                    return ControlFlow::Break(());
                }
            }
            Ok(None) => {}
            Err(e) => {
                let err = e.wire_error(Some(frame.raw_type));
                let _ = self.reply(carrier, Payload::Error(err)).await;
            }
        }

        if self.ctx.claimed_nickname.is_some() {
            self.ctx.phase = SessionPhase::Idle;
        }
        if self.ctx.phase == SessionPhase::Closed {
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    async fn reply(
        &self,
        carrier: &mut Box<dyn FrameCarrier>,
        payload: Payload,
    ) -> Result<(), ()> {
        let frame = payload.into_frame();
        match timeout(OUTBOUND_REPLY_TIMEOUT, carrier.send_frame(frame)).await {
            Ok(Ok(())) => Ok(()),
            _ => Err(()),
        }
    }
}

