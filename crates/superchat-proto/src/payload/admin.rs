//! Admin-only moderation payloads.

use super::common::{BanSummary, UserSummary};
use crate::error::ProtocolError;
use crate::wire::{WireReader, WireWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanUser {
    pub user_id: u64,
    pub reason: String,
    pub duration_secs: Option<u64>,
    pub shadowban: bool,
}

impl BanUser {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.user_id);
        w.put_str(&self.reason);
        w.put_opt_u64(self.duration_secs);
        w.put_bool(self.shadowban);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            user_id: r.get_u64()?,
            reason: r.get_str()?,
            duration_secs: r.get_opt_u64()?,
            shadowban: r.get_bool()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanIp {
    pub cidr: String,
    pub reason: String,
    pub duration_secs: Option<u64>,
}

impl BanIp {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_str(&self.cidr);
        w.put_str(&self.reason);
        w.put_opt_u64(self.duration_secs);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            cidr: r.get_str()?,
            reason: r.get_str()?,
            duration_secs: r.get_opt_u64()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnbanUser {
    pub user_id: u64,
}

impl UnbanUser {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.user_id);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self { user_id: r.get_u64()? })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnbanIp {
    pub cidr: String,
}

impl UnbanIp {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_str(&self.cidr);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self { cidr: r.get_str()? })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListBans;

impl ListBans {
    pub(crate) fn encode(&self, _w: &mut WireWriter) {}
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        r.finish()?;
        Ok(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanList {
    pub bans: Vec<BanSummary>,
}

impl BanList {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u32(self.bans.len() as u32);
        for b in &self.bans {
            b.encode(w);
        }
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let count = r.get_u32()?;
        let mut bans = Vec::with_capacity(count as usize);
        for _ in 0..count {
            bans.push(BanSummary::decode(r)?);
        }
        Ok(Self { bans })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListUsers;

impl ListUsers {
    pub(crate) fn encode(&self, _w: &mut WireWriter) {}
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        r.finish()?;
        Ok(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserList {
    pub users: Vec<UserSummary>,
}

impl UserList {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u32(self.users.len() as u32);
        for u in &self.users {
            u.encode(w);
        }
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let count = r.get_u32()?;
        let mut users = Vec::with_capacity(count as usize);
        for _ in 0..count {
            users.push(UserSummary::decode(r)?);
        }
        Ok(Self { users })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteUser {
    pub user_id: u64,
}

impl DeleteUser {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.user_id);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self { user_id: r.get_u64()? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteChannel {
    pub channel_id: u64,
}

impl DeleteChannel {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.channel_id);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self { channel_id: r.get_u64()? })
    }
}

/// Generic ack for admin operations that don't return a richer payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminOk {
    pub success: bool,
    pub reason: Option<String>,
}

impl AdminOk {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_bool(self.success);
        w.put_opt_str(self.reason.as_deref());
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            success: r.get_bool()?,
            reason: r.get_opt_str()?,
        })
    }
}
