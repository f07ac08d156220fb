//! Message history, posting, and real-time delivery payloads.

use super::common::MessageSummary;
use crate::error::ProtocolError;
use crate::wire::{WireReader, WireWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMessages {
    pub channel_id: u64,
    pub subchannel_id: Option<u64>,
    /// Restrict to replies under this thread root; `None` lists top-level.
    pub thread_root_id: Option<u64>,
    /// List messages with `message_id` strictly before this cursor.
    pub before_id: Option<u64>,
    /// List messages with `message_id` strictly after this cursor, for
    /// incremental sync after a dropped broadcast.
    pub after_id: Option<u64>,
    pub limit: u32,
}

impl ListMessages {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.channel_id);
        w.put_opt_u64(self.subchannel_id);
        w.put_opt_u64(self.thread_root_id);
        w.put_opt_u64(self.before_id);
        w.put_opt_u64(self.after_id);
        w.put_u32(self.limit);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            channel_id: r.get_u64()?,
            subchannel_id: r.get_opt_u64()?,
            thread_root_id: r.get_opt_u64()?,
            before_id: r.get_opt_u64()?,
            after_id: r.get_opt_u64()?,
            limit: r.get_u32()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageList {
    pub channel_id: u64,
    pub subchannel_id: Option<u64>,
    pub messages: Vec<MessageSummary>,
    /// True when more messages exist before the oldest one returned.
    pub has_more: bool,
}

impl MessageList {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.channel_id);
        w.put_opt_u64(self.subchannel_id);
        w.put_u32(self.messages.len() as u32);
        for m in &self.messages {
            m.encode(w);
        }
        w.put_bool(self.has_more);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let channel_id = r.get_u64()?;
        let subchannel_id = r.get_opt_u64()?;
        let count = r.get_u32()?;
        let mut messages = Vec::with_capacity(count as usize);
        for _ in 0..count {
            messages.push(MessageSummary::decode(r)?);
        }
        let has_more = r.get_bool()?;
        Ok(Self {
            channel_id,
            subchannel_id,
            messages,
            has_more,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMessage {
    pub channel_id: u64,
    pub subchannel_id: Option<u64>,
    /// Set when replying within a forum channel's thread tree.
    pub parent_id: Option<u64>,
    pub content: String,
}

impl PostMessage {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.channel_id);
        w.put_opt_u64(self.subchannel_id);
        w.put_opt_u64(self.parent_id);
        w.put_str(&self.content);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            channel_id: r.get_u64()?,
            subchannel_id: r.get_opt_u64()?,
            parent_id: r.get_opt_u64()?,
            content: r.get_str()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePosted {
    pub success: bool,
    pub message: Option<MessageSummary>,
    pub reason: Option<String>,
}

impl MessagePosted {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_bool(self.success);
        match &self.message {
            Some(m) => {
                w.put_bool(true);
                m.encode(w);
            }
            None => {
                w.put_bool(false);
            }
        }
        w.put_opt_str(self.reason.as_deref());
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let success = r.get_bool()?;
        let message = if r.get_bool()? {
            Some(MessageSummary::decode(r)?)
        } else {
            None
        };
        let reason = r.get_opt_str()?;
        Ok(Self { success, message, reason })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditMessage {
    pub message_id: u64,
    pub content: String,
}

impl EditMessage {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.message_id);
        w.put_str(&self.content);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            message_id: r.get_u64()?,
            content: r.get_str()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEdited {
    pub success: bool,
    pub message: Option<MessageSummary>,
    pub reason: Option<String>,
}

impl MessageEdited {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_bool(self.success);
        match &self.message {
            Some(m) => {
                w.put_bool(true);
                m.encode(w);
            }
            None => {
                w.put_bool(false);
            }
        }
        w.put_opt_str(self.reason.as_deref());
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let success = r.get_bool()?;
        let message = if r.get_bool()? {
            Some(MessageSummary::decode(r)?)
        } else {
            None
        };
        let reason = r.get_opt_str()?;
        Ok(Self { success, message, reason })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteMessage {
    pub message_id: u64,
}

impl DeleteMessage {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.message_id);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self { message_id: r.get_u64()? })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDeleted {
    pub success: bool,
    pub message_id: u64,
    pub reason: Option<String>,
}

impl MessageDeleted {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_bool(self.success);
        w.put_u64(self.message_id);
        w.put_opt_str(self.reason.as_deref());
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            success: r.get_bool()?,
            message_id: r.get_u64()?,
            reason: r.get_opt_str()?,
        })
    }
}

/// Pushed to every subscriber of the channel/subchannel/thread a new message
/// lands in. Never requested directly by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub message: MessageSummary,
}

impl NewMessage {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        self.message.encode(w);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            message: MessageSummary::decode(r)?,
        })
    }
}
