//! Unauthenticated handshake and keepalive payloads.

use super::common::ChannelCreationPolicy;
use crate::error::ProtocolError;
use crate::wire::{WireReader, WireWriter};

/// Sent by the server immediately on connect, before any authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub protocol_version: u8,
    pub max_message_bytes: u32,
    pub channel_creation_policy: ChannelCreationPolicy,
    pub directory_announce_hint: Option<String>,
    pub server_name: String,
}

impl ServerConfig {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u8(self.protocol_version);
        w.put_u32(self.max_message_bytes);
        self.channel_creation_policy.encode(w);
        w.put_opt_str(self.directory_announce_hint.as_deref());
        w.put_str(&self.server_name);
    }

    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            protocol_version: r.get_u8()?,
            max_message_bytes: r.get_u32()?,
            channel_creation_policy: ChannelCreationPolicy::decode(r)?,
            directory_announce_hint: r.get_opt_str()?,
            server_name: r.get_str()?,
        })
    }
}

/// `PING`/`PONG` carry a nonce so a client can pair a pong with its ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub nonce: u64,
}

impl Heartbeat {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.nonce);
    }

    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self { nonce: r.get_u64()? })
    }
}
