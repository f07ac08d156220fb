//! Nested value types shared across several payloads.

use crate::error::ProtocolError;
use crate::wire::{WireReader, WireWriter};

/// `channel.type` — forum channels keep a reply tree, chat channels are
/// linear and ring-buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    Chat,
    Forum,
}

impl ChannelType {
    pub(crate) fn encode(self, w: &mut WireWriter) {
        w.put_u8(match self {
            ChannelType::Chat => 0,
            ChannelType::Forum => 1,
        });
    }

    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(match r.get_u8()? {
            0 => ChannelType::Chat,
            1 => ChannelType::Forum,
            other => return Err(ProtocolError::InvalidPresenceFlag(other)),
        })
    }
}

/// Channel creation policy advertised in `SERVER_CONFIG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelCreationPolicy {
    Open,
    RegisteredOnly,
}

impl ChannelCreationPolicy {
    pub(crate) fn encode(self, w: &mut WireWriter) {
        w.put_u8(match self {
            ChannelCreationPolicy::Open => 0,
            ChannelCreationPolicy::RegisteredOnly => 1,
        });
    }

    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(match r.get_u8()? {
            0 => ChannelCreationPolicy::Open,
            1 => ChannelCreationPolicy::RegisteredOnly,
            other => return Err(ProtocolError::InvalidPresenceFlag(other)),
        })
    }
}

/// One row of a `CHANNEL_LIST`/`JOIN_RESPONSE`/`CHANNEL_CREATED` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSummary {
    pub channel_id: u64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub channel_type: ChannelType,
    pub retention_hours: Option<u32>,
    pub message_limit: Option<u32>,
}

impl ChannelSummary {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.channel_id);
        w.put_str(&self.name);
        w.put_str(&self.display_name);
        w.put_opt_str(self.description.as_deref());
        self.channel_type.encode(w);
        w.put_opt_u32(self.retention_hours);
        w.put_opt_u32(self.message_limit);
    }

    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            channel_id: r.get_u64()?,
            name: r.get_str()?,
            display_name: r.get_str()?,
            description: r.get_opt_str()?,
            channel_type: ChannelType::decode(r)?,
            retention_hours: r.get_opt_u32()?,
            message_limit: r.get_opt_u32()?,
        })
    }
}

/// One row of a `MESSAGE_LIST`/`NEW_MESSAGE` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    pub message_id: u64,
    pub channel_id: u64,
    pub subchannel_id: Option<u64>,
    pub parent_id: Option<u64>,
    pub author_user_id: Option<u64>,
    pub author_nickname: String,
    pub content: String,
    pub created_at: u64,
    pub edited_at: Option<u64>,
    pub deleted_at: Option<u64>,
}

impl MessageSummary {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.message_id);
        w.put_u64(self.channel_id);
        w.put_opt_u64(self.subchannel_id);
        w.put_opt_u64(self.parent_id);
        w.put_opt_u64(self.author_user_id);
        w.put_str(&self.author_nickname);
        w.put_str(&self.content);
        w.put_u64(self.created_at);
        w.put_opt_u64(self.edited_at);
        w.put_opt_u64(self.deleted_at);
    }

    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            message_id: r.get_u64()?,
            channel_id: r.get_u64()?,
            subchannel_id: r.get_opt_u64()?,
            parent_id: r.get_opt_u64()?,
            author_user_id: r.get_opt_u64()?,
            author_nickname: r.get_str()?,
            content: r.get_str()?,
            created_at: r.get_u64()?,
            edited_at: r.get_opt_u64()?,
            deleted_at: r.get_opt_u64()?,
        })
    }
}

/// One row of a `USER_LIST` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub user_id: u64,
    pub nickname: String,
    pub is_admin: bool,
    pub created_at: u64,
}

impl UserSummary {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.user_id);
        w.put_str(&self.nickname);
        w.put_bool(self.is_admin);
        w.put_u64(self.created_at);
    }

    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            user_id: r.get_u64()?,
            nickname: r.get_str()?,
            is_admin: r.get_bool()?,
            created_at: r.get_u64()?,
        })
    }
}

/// One row of a `SSH_KEY_LIST` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKeySummary {
    pub key_id: u64,
    pub fingerprint: String,
    pub key_type: String,
    pub label: Option<String>,
    pub added_at: u64,
    pub last_used_at: Option<u64>,
}

impl SshKeySummary {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.key_id);
        w.put_str(&self.fingerprint);
        w.put_str(&self.key_type);
        w.put_opt_str(self.label.as_deref());
        w.put_u64(self.added_at);
        w.put_opt_u64(self.last_used_at);
    }

    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            key_id: r.get_u64()?,
            fingerprint: r.get_str()?,
            key_type: r.get_str()?,
            label: r.get_opt_str()?,
            added_at: r.get_u64()?,
            last_used_at: r.get_opt_u64()?,
        })
    }
}

/// One row of a `BAN_LIST` payload. Exactly one of `user_id`/`cidr` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanSummary {
    pub user_id: Option<u64>,
    pub cidr: Option<String>,
    pub reason: String,
    pub banned_at: u64,
    pub banned_until: Option<u64>,
    pub banned_by: u64,
    pub is_shadowban: bool,
}

impl BanSummary {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_opt_u64(self.user_id);
        w.put_opt_str(self.cidr.as_deref());
        w.put_str(&self.reason);
        w.put_u64(self.banned_at);
        w.put_opt_u64(self.banned_until);
        w.put_u64(self.banned_by);
        w.put_bool(self.is_shadowban);
    }

    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            user_id: r.get_opt_u64()?,
            cidr: r.get_opt_str()?,
            reason: r.get_str()?,
            banned_at: r.get_u64()?,
            banned_until: r.get_opt_u64()?,
            banned_by: r.get_u64()?,
            is_shadowban: r.get_bool()?,
        })
    }
}

/// One row of a `SERVER_LIST` payload (directory discovery).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSummary {
    pub name: String,
    pub description: String,
    pub hostname: String,
    pub port: u16,
    pub user_count: u32,
    pub max_users: u32,
    pub channel_count: u32,
}

impl ServerSummary {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_str(&self.name);
        w.put_str(&self.description);
        w.put_str(&self.hostname);
        w.put_u16(self.port);
        w.put_u32(self.user_count);
        w.put_u32(self.max_users);
        w.put_u32(self.channel_count);
    }

    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            name: r.get_str()?,
            description: r.get_str()?,
            hostname: r.get_str()?,
            port: r.get_u16()?,
            user_count: r.get_u32()?,
            max_users: r.get_u32()?,
            channel_count: r.get_u32()?,
        })
    }
}
