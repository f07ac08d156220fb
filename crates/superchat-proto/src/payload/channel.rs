//! Channel membership and lifecycle payloads.

use super::common::{ChannelSummary, ChannelType};
use crate::error::ProtocolError;
use crate::wire::{WireReader, WireWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinChannel {
    pub name: String,
}

impl JoinChannel {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_str(&self.name);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self { name: r.get_str()? })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinResponse {
    pub success: bool,
    pub channel: Option<ChannelSummary>,
    pub reason: Option<String>,
}

impl JoinResponse {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_bool(self.success);
        match &self.channel {
            Some(c) => {
                w.put_bool(true);
                c.encode(w);
            }
            None => {
                w.put_bool(false);
            }
        }
        w.put_opt_str(self.reason.as_deref());
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let success = r.get_bool()?;
        let channel = if r.get_bool()? {
            Some(ChannelSummary::decode(r)?)
        } else {
            None
        };
        let reason = r.get_opt_str()?;
        Ok(Self { success, channel, reason })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateChannel {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub channel_type: ChannelType,
    pub retention_hours: Option<u32>,
    pub message_limit: Option<u32>,
}

impl CreateChannel {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_str(&self.name);
        w.put_str(&self.display_name);
        w.put_opt_str(self.description.as_deref());
        self.channel_type.encode(w);
        w.put_opt_u32(self.retention_hours);
        w.put_opt_u32(self.message_limit);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            name: r.get_str()?,
            display_name: r.get_str()?,
            description: r.get_opt_str()?,
            channel_type: ChannelType::decode(r)?,
            retention_hours: r.get_opt_u32()?,
            message_limit: r.get_opt_u32()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCreated {
    pub success: bool,
    pub channel: Option<ChannelSummary>,
    pub reason: Option<String>,
}

impl ChannelCreated {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_bool(self.success);
        match &self.channel {
            Some(c) => {
                w.put_bool(true);
                c.encode(w);
            }
            None => {
                w.put_bool(false);
            }
        }
        w.put_opt_str(self.reason.as_deref());
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let success = r.get_bool()?;
        let channel = if r.get_bool()? {
            Some(ChannelSummary::decode(r)?)
        } else {
            None
        };
        let reason = r.get_opt_str()?;
        Ok(Self { success, channel, reason })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeChannel {
    pub channel_id: u64,
    /// `None` subscribes to the channel's default/main subchannel.
    pub subchannel_id: Option<u64>,
}

impl SubscribeChannel {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.channel_id);
        w.put_opt_u64(self.subchannel_id);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            channel_id: r.get_u64()?,
            subchannel_id: r.get_opt_u64()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsubscribeChannel {
    pub channel_id: u64,
    pub subchannel_id: Option<u64>,
}

impl UnsubscribeChannel {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.channel_id);
        w.put_opt_u64(self.subchannel_id);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            channel_id: r.get_u64()?,
            subchannel_id: r.get_opt_u64()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeOk {
    pub channel_id: u64,
    pub subchannel_id: Option<u64>,
    pub subscribed: bool,
}

impl SubscribeOk {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.channel_id);
        w.put_opt_u64(self.subchannel_id);
        w.put_bool(self.subscribed);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            channel_id: r.get_u64()?,
            subchannel_id: r.get_opt_u64()?,
            subscribed: r.get_bool()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeThread {
    pub thread_root_id: u64,
}

impl SubscribeThread {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.thread_root_id);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self { thread_root_id: r.get_u64()? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsubscribeThread {
    pub thread_root_id: u64,
}

impl UnsubscribeThread {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.thread_root_id);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self { thread_root_id: r.get_u64()? })
    }
}
