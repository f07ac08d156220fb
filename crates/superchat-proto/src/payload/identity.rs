//! Identity, registration, and SSH-key management payloads.

use super::common::SshKeySummary;
use crate::error::ProtocolError;
use crate::wire::{WireReader, WireWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetNickname {
    pub nickname: String,
}

impl SetNickname {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_str(&self.nickname);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self { nickname: r.get_str()? })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NicknameResponse {
    pub success: bool,
    /// Populated with e.g. `"registered"` when `success` is false.
    pub reason: Option<String>,
}

impl NicknameResponse {
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

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetUserInfo {
    pub nickname: String,
}

impl GetUserInfo {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_str(&self.nickname);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self { nickname: r.get_str()? })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub user_id: Option<u64>,
    pub nickname: String,
    pub is_registered: bool,
    pub is_admin: bool,
    pub created_at: Option<u64>,
}

impl UserInfo {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_opt_u64(self.user_id);
        w.put_str(&self.nickname);
        w.put_bool(self.is_registered);
        w.put_bool(self.is_admin);
        w.put_opt_u64(self.created_at);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            user_id: r.get_opt_u64()?,
            nickname: r.get_str()?,
            is_registered: r.get_bool()?,
            is_admin: r.get_bool()?,
            created_at: r.get_opt_u64()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub nickname: String,
    pub password: String,
}

impl AuthRequest {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_str(&self.nickname);
        w.put_str(&self.password);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            nickname: r.get_str()?,
            password: r.get_str()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    pub success: bool,
    pub user_id: Option<u64>,
    pub reason: Option<String>,
}

impl AuthResponse {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_bool(self.success);
        w.put_opt_u64(self.user_id);
        w.put_opt_str(self.reason.as_deref());
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            success: r.get_bool()?,
            user_id: r.get_opt_u64()?,
            reason: r.get_opt_str()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterUser {
    pub password: String,
}

impl RegisterUser {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_str(&self.password);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self { password: r.get_str()? })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterResponse {
    pub success: bool,
    pub user_id: Option<u64>,
    pub reason: Option<String>,
}

impl RegisterResponse {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_bool(self.success);
        w.put_opt_u64(self.user_id);
        w.put_opt_str(self.reason.as_deref());
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            success: r.get_bool()?,
            user_id: r.get_opt_u64()?,
            reason: r.get_opt_str()?,
        })
    }
}

/// `code` is the one-time code a prior SSH connection was handed via
/// `ERROR(need_registration, code)`; `label` is a caller-chosen display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddSshKey {
    pub code: String,
    pub label: Option<String>,
}

impl AddSshKey {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_str(&self.code);
        w.put_opt_str(self.label.as_deref());
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            code: r.get_str()?,
            label: r.get_opt_str()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListSshKeys;

impl ListSshKeys {
    pub(crate) fn encode(&self, _w: &mut WireWriter) {}
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        r.finish()?;
        Ok(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKeyList {
    pub keys: Vec<SshKeySummary>,
}

impl SshKeyList {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u32(self.keys.len() as u32);
        for k in &self.keys {
            k.encode(w);
        }
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let count = r.get_u32()?;
        let mut keys = Vec::with_capacity(count as usize);
        for _ in 0..count {
            keys.push(SshKeySummary::decode(r)?);
        }
        Ok(Self { keys })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSshKeyLabel {
    pub key_id: u64,
    pub label: String,
}

impl UpdateSshKeyLabel {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.key_id);
        w.put_str(&self.label);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            key_id: r.get_u64()?,
            label: r.get_str()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteSshKey {
    pub key_id: u64,
}

impl DeleteSshKey {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u64(self.key_id);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self { key_id: r.get_u64()? })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePassword {
    /// Omitted when the session authenticated via SSH pubkey for this user.
    pub current_password: Option<String>,
    pub new_password: String,
}

impl ChangePassword {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_opt_str(self.current_password.as_deref());
        w.put_str(&self.new_password);
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            current_password: r.get_opt_str()?,
            new_password: r.get_str()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangePasswordResponse {
    pub success: bool,
    pub reason: Option<String>,
}

impl ChangePasswordResponse {
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

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Disconnect {
    pub reason: Option<String>,
}

impl Disconnect {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_opt_str(self.reason.as_deref());
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self { reason: r.get_opt_str()? })
    }
}
