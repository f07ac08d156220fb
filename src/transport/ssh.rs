//! SSH transport: a single raw data channel per connection speaks the
//! same length-prefixed frame protocol as TCP, tunneled through
//! `ssh-connection` `data` messages instead of a bare socket.
//!
//! `russh`'s `Channel` isn't `AsyncRead`/`AsyncWrite`, so this adapter
//! can't reuse `StreamCarrier`: [`SshCarrier`] below bridges the
//! `Handler::data` callback (bytes in) and a `russh::server::Handle`
//! (bytes out) through the same `SuperChatCodec` the other transports
//! share.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use bytes::BytesMut;
use russh::keys::{Algorithm, HashAlg, PrivateKey, PublicKey};
use russh::server::{Auth, Handle, Msg, Server as RusshServer, Session as RusshSession};
use russh::{Channel, ChannelId, CryptoVec};
use superchat_proto::codec::{encode_frame, SuperChatCodec};
use superchat_proto::message::Frame;
use superchat_proto::{FrameCarrier, ProtocolError};
use tokio::sync::mpsc;
use tokio_util::codec::Decoder;
use tracing::{info, warn};

use crate::db::ssh_keys::SshKeyRepository;
use crate::security::ssh_registration;
use crate::session::SshPreauth;
use crate::state::AppState;

use super::admission_check;

pub async fn run(state: Arc<AppState>) -> std::io::Result<()> {
    if !state.config.listen.enable_ssh {
        return Ok(());
    }
    let bind = state.config.listen.ssh_bind.clone();
    let host_key = load_or_generate_host_key(&state.config.ssh.host_key_path)?;

    let config = Arc::new(russh::server::Config {
        keys: vec![host_key],
        ..Default::default()
    });
    super::log_listening("ssh", &bind);
    let mut server = SuperChatServer { state };
    server
        .run_on_address(config, bind.as_str())
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
}

struct SuperChatServer {
    state: Arc<AppState>,
}

impl RusshServer for SuperChatServer {
    type Handler = SshHandler;

    fn new_client(&mut self, peer_addr: Option<SocketAddr>) -> SshHandler {
        SshHandler {
            state: self.state.clone(),
            peer_ip: peer_addr.map(|a| a.ip()).unwrap_or(IpAddr::from([0, 0, 0, 0])),
            fingerprint: None,
            preauth: SshPreauth::NotSsh,
            channel_id: None,
            data_tx: None,
        }
    }
}

struct SshHandler {
    state: Arc<AppState>,
    peer_ip: IpAddr,
    fingerprint: Option<String>,
    preauth: SshPreauth,
    channel_id: Option<ChannelId>,
    data_tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

impl russh::server::Handler for SshHandler {
    type Error = russh::Error;

    async fn auth_none(&mut self, _user: &str) -> Result<Auth, Self::Error> {
        if admission_check(&self.state, self.peer_ip).is_err() {
            return Ok(Auth::Reject { proceed_with_methods: None, partial_success: false });
        }
        Ok(Auth::Accept)
    }

    async fn auth_password(&mut self, _user: &str, _password: &str) -> Result<Auth, Self::Error> {
        // The wire protocol's own AUTH_REQUEST carries passwords end to
        // end; ssh-level password auth would mean a second credential
        // store to keep in sync, so it's rejected outright.
        Ok(Auth::Reject { proceed_with_methods: None, partial_success: false })
    }

    async fn auth_publickey(
        &mut self,
        _user: &str,
        public_key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        if admission_check(&self.state, self.peer_ip).is_err() {
            return Ok(Auth::Reject { proceed_with_methods: None, partial_success: false });
        }

        let fingerprint = public_key.fingerprint(HashAlg::Sha256).to_string();
        let key_type = public_key.algorithm().to_string();
        self.fingerprint = Some(fingerprint.clone());

        let repo = SshKeyRepository::new(self.state.db.pool());
        match repo.find_by_fingerprint(&fingerprint).await {
            Ok(Some(key)) => {
                let now = now_ms();
                let _ = repo.touch_last_used(key.key_id, now).await;
                let user_repo = crate::db::users::UserRepository::new(self.state.db.pool());
                match user_repo.find_by_id(key.user_id).await {
                    Ok(Some(user)) => {
                        self.preauth = SshPreauth::Known {
                            user_id: user.user_id,
                            is_admin: user.is_admin(),
                            nickname: user.nickname,
                        };
                    }
                    _ => {
                        warn!(fingerprint = %fingerprint, "ssh key bound to missing user");
                    }
                }
            }
            Ok(None) => {
                let code = ssh_registration::generate_code();
                let now = now_ms();
                let expires_at = now + (self.state.config.ssh.registration_code_ttl_secs as i64) * 1000;
                if let Err(e) = repo
                    .create_registration_code(&code, &fingerprint, &key_type, now, expires_at)
                    .await
                {
                    warn!(error = %e, "failed to store ssh registration code");
                } else {
                    self.preauth = SshPreauth::Unregistered { registration_code: code };
                }
            }
            Err(e) => {
                warn!(error = %e, "ssh key lookup failed");
            }
        }
        Ok(Auth::Accept)
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        session: &mut RusshSession,
    ) -> Result<bool, Self::Error> {
        let channel_id = channel.id();
        let (tx, rx) = mpsc::unbounded_channel();
        self.channel_id = Some(channel_id);
        self.data_tx = Some(tx);

        let handle = session.handle();
        let max_payload = self.state.config.limits.max_msg_bytes;
        let carrier: Box<dyn FrameCarrier> =
            Box::new(SshCarrier::new(handle, channel_id, rx, max_payload));

        let ssh_fingerprint = self.fingerprint.clone();
        let preauth = std::mem::replace(&mut self.preauth, SshPreauth::NotSsh);
        info!(%channel_id, peer_ip = %self.peer_ip, "ssh channel opened, starting session");
        super::spawn_session_with_preauth(self.state.clone(), self.peer_ip, ssh_fingerprint, preauth, carrier);
        Ok(true)
    }

    async fn data(
        &mut self,
        channel: ChannelId,
        data: &[u8],
        _session: &mut RusshSession,
    ) -> Result<(), Self::Error> {
        if Some(channel) == self.channel_id {
            if let Some(tx) = &self.data_tx {
                let _ = tx.send(data.to_vec());
            }
        }
        Ok(())
    }

    async fn channel_close(
        &mut self,
        channel: ChannelId,
        _session: &mut RusshSession,
    ) -> Result<(), Self::Error> {
        if Some(channel) == self.channel_id {
            self.data_tx = None;
        }
        Ok(())
    }

    async fn channel_eof(
        &mut self,
        channel: ChannelId,
        _session: &mut RusshSession,
    ) -> Result<(), Self::Error> {
        if Some(channel) == self.channel_id {
            self.data_tx = None;
        }
        Ok(())
    }
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_millis() as i64
}

/// [`FrameCarrier`] over one SSH channel's raw byte stream, reusing
/// `SuperChatCodec` against a manually-fed buffer instead of a
/// `Framed<T, _>` since `Channel<Msg>` has no `AsyncRead`/`AsyncWrite`.
struct SshCarrier {
    handle: Handle,
    channel_id: ChannelId,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    buf: BytesMut,
    codec: SuperChatCodec,
}

impl SshCarrier {
    fn new(
        handle: Handle,
        channel_id: ChannelId,
        rx: mpsc::UnboundedReceiver<Vec<u8>>,
        max_payload: u32,
    ) -> Self {
        Self {
            handle,
            channel_id,
            rx,
            buf: BytesMut::new(),
            codec: SuperChatCodec::new(max_payload),
        }
    }
}

#[async_trait::async_trait]
impl FrameCarrier for SshCarrier {
    async fn recv_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        loop {
            if let Some(frame) = self.codec.decode(&mut self.buf)? {
                return Ok(Some(frame));
            }
            match self.rx.recv().await {
                Some(bytes) => self.buf.extend_from_slice(&bytes),
                None => return Ok(None),
            }
        }
    }

    async fn send_frame(&mut self, frame: Frame) -> Result<(), ProtocolError> {
        let bytes = encode_frame(&frame);
        self.handle
            .data(self.channel_id, CryptoVec::from_slice(&bytes))
            .await
            .map_err(|_| ProtocolError::Closed)
    }
}

fn load_or_generate_host_key(path: &str) -> std::io::Result<PrivateKey> {
    let path_buf = std::path::Path::new(path);
    if path_buf.exists() {
        return PrivateKey::read_openssh_file(path_buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()));
    }
    if let Some(parent) = path_buf.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let key = PrivateKey::random(&mut rand::rngs::OsRng, Algorithm::Ed25519)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    key.write_openssh_file(path_buf, russh::keys::ssh_key::LineEnding::LF)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    info!(%path, "generated new ssh host key");
    Ok(key)
}
