//! Typed payloads for every [`crate::message::MessageType`], plus the
//! dispatch that ties a decoded [`crate::message::Frame`] to its payload.

pub mod admin;
pub mod channel;
pub mod common;
pub mod discovery;
pub mod error;
pub mod handshake;
pub mod identity;
pub mod messaging;

pub use admin::*;
pub use channel::*;
pub use common::*;
pub use discovery::*;
pub use error::{ErrorPayload, WireErrorCode};
pub use handshake::*;
pub use identity::*;
pub use messaging::*;

use crate::error::ProtocolError;
use crate::message::{Frame, MessageType};
use crate::wire::{WireReader, WireWriter};
use bytes::Bytes;

/// A decoded message body, tagged by the [`MessageType`] it was decoded as.
///
/// Frames whose type byte is unrecognized never reach this enum — the
/// caller checks [`Frame::msg_type`] first and discards them.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    ServerConfig(ServerConfig),
    Ping(Heartbeat),
    Pong(Heartbeat),

    SetNickname(SetNickname),
    NicknameResponse(NicknameResponse),
    GetUserInfo(GetUserInfo),
    UserInfo(UserInfo),
    AuthRequest(AuthRequest),
    AuthResponse(AuthResponse),
    RegisterUser(RegisterUser),
    RegisterResponse(RegisterResponse),
    AddSshKey(AddSshKey),
    ListSshKeys(ListSshKeys),
    SshKeyList(SshKeyList),
    UpdateSshKeyLabel(UpdateSshKeyLabel),
    DeleteSshKey(DeleteSshKey),
    ChangePassword(ChangePassword),
    ChangePasswordResponse(ChangePasswordResponse),
    Disconnect(Disconnect),

    ListChannels(ListChannels),
    ChannelList(ChannelList),
    ListServers(ListServers),
    ServerList(ServerList),

    JoinChannel(JoinChannel),
    JoinResponse(JoinResponse),
    CreateChannel(CreateChannel),
    ChannelCreated(ChannelCreated),
    SubscribeChannel(SubscribeChannel),
    UnsubscribeChannel(UnsubscribeChannel),
    SubscribeOk(SubscribeOk),
    SubscribeThread(SubscribeThread),
    UnsubscribeThread(UnsubscribeThread),

    ListMessages(ListMessages),
    MessageList(MessageList),
    PostMessage(PostMessage),
    MessagePosted(MessagePosted),
    EditMessage(EditMessage),
    MessageEdited(MessageEdited),
    DeleteMessage(DeleteMessage),
    MessageDeleted(MessageDeleted),
    NewMessage(NewMessage),

    BanUser(BanUser),
    BanIp(BanIp),
    UnbanUser(UnbanUser),
    UnbanIp(UnbanIp),
    ListBans(ListBans),
    BanList(BanList),
    ListUsers(ListUsers),
    UserList(UserList),
    DeleteUser(DeleteUser),
    DeleteChannel(DeleteChannel),
    AdminOk(AdminOk),

    Error(ErrorPayload),
}

impl Payload {
    pub fn msg_type(&self) -> MessageType {
        match self {
            Payload::ServerConfig(_) => MessageType::ServerConfig,
            Payload::Ping(_) => MessageType::Ping,
            Payload::Pong(_) => MessageType::Pong,
            Payload::SetNickname(_) => MessageType::SetNickname,
            Payload::NicknameResponse(_) => MessageType::NicknameResponse,
            Payload::GetUserInfo(_) => MessageType::GetUserInfo,
            Payload::UserInfo(_) => MessageType::UserInfo,
            Payload::AuthRequest(_) => MessageType::AuthRequest,
            Payload::AuthResponse(_) => MessageType::AuthResponse,
            Payload::RegisterUser(_) => MessageType::RegisterUser,
            Payload::RegisterResponse(_) => MessageType::RegisterResponse,
            Payload::AddSshKey(_) => MessageType::AddSshKey,
            Payload::ListSshKeys(_) => MessageType::ListSshKeys,
            Payload::SshKeyList(_) => MessageType::SshKeyList,
            Payload::UpdateSshKeyLabel(_) => MessageType::UpdateSshKeyLabel,
            Payload::DeleteSshKey(_) => MessageType::DeleteSshKey,
            Payload::ChangePassword(_) => MessageType::ChangePassword,
            Payload::ChangePasswordResponse(_) => MessageType::ChangePasswordResponse,
            Payload::Disconnect(_) => MessageType::Disconnect,
            Payload::ListChannels(_) => MessageType::ListChannels,
            Payload::ChannelList(_) => MessageType::ChannelList,
            Payload::ListServers(_) => MessageType::ListServers,
            Payload::ServerList(_) => MessageType::ServerList,
            Payload::JoinChannel(_) => MessageType::JoinChannel,
            Payload::JoinResponse(_) => MessageType::JoinResponse,
            Payload::CreateChannel(_) => MessageType::CreateChannel,
            Payload::ChannelCreated(_) => MessageType::ChannelCreated,
            Payload::SubscribeChannel(_) => MessageType::SubscribeChannel,
            Payload::UnsubscribeChannel(_) => MessageType::UnsubscribeChannel,
            Payload::SubscribeOk(_) => MessageType::SubscribeOk,
            Payload::SubscribeThread(_) => MessageType::SubscribeThread,
            Payload::UnsubscribeThread(_) => MessageType::UnsubscribeThread,
            Payload::ListMessages(_) => MessageType::ListMessages,
            Payload::MessageList(_) => MessageType::MessageList,
            Payload::PostMessage(_) => MessageType::PostMessage,
            Payload::MessagePosted(_) => MessageType::MessagePosted,
            Payload::EditMessage(_) => MessageType::EditMessage,
            Payload::MessageEdited(_) => MessageType::MessageEdited,
            Payload::DeleteMessage(_) => MessageType::DeleteMessage,
            Payload::MessageDeleted(_) => MessageType::MessageDeleted,
            Payload::NewMessage(_) => MessageType::NewMessage,
            Payload::BanUser(_) => MessageType::BanUser,
            Payload::BanIp(_) => MessageType::BanIp,
            Payload::UnbanUser(_) => MessageType::UnbanUser,
            Payload::UnbanIp(_) => MessageType::UnbanIp,
            Payload::ListBans(_) => MessageType::ListBans,
            Payload::BanList(_) => MessageType::BanList,
            Payload::ListUsers(_) => MessageType::ListUsers,
            Payload::UserList(_) => MessageType::UserList,
            Payload::DeleteUser(_) => MessageType::DeleteUser,
            Payload::DeleteChannel(_) => MessageType::DeleteChannel,
            Payload::AdminOk(_) => MessageType::AdminOk,
            Payload::Error(_) => MessageType::Error,
        }
    }

    /// Encode into a fresh [`Frame`] with this payload's matching type byte.
    pub fn into_frame(self) -> Frame {
        let msg_type = self.msg_type();
        let mut w = WireWriter::new();
        match &self {
            Payload::ServerConfig(p) => p.encode(&mut w),
            Payload::Ping(p) => p.encode(&mut w),
            Payload::Pong(p) => p.encode(&mut w),
            Payload::SetNickname(p) => p.encode(&mut w),
            Payload::NicknameResponse(p) => p.encode(&mut w),
            Payload::GetUserInfo(p) => p.encode(&mut w),
            Payload::UserInfo(p) => p.encode(&mut w),
            Payload::AuthRequest(p) => p.encode(&mut w),
            Payload::AuthResponse(p) => p.encode(&mut w),
            Payload::RegisterUser(p) => p.encode(&mut w),
            Payload::RegisterResponse(p) => p.encode(&mut w),
            Payload::AddSshKey(p) => p.encode(&mut w),
            Payload::ListSshKeys(p) => p.encode(&mut w),
            Payload::SshKeyList(p) => p.encode(&mut w),
            Payload::UpdateSshKeyLabel(p) => p.encode(&mut w),
            Payload::DeleteSshKey(p) => p.encode(&mut w),
            Payload::ChangePassword(p) => p.encode(&mut w),
            Payload::ChangePasswordResponse(p) => p.encode(&mut w),
            Payload::Disconnect(p) => p.encode(&mut w),
            Payload::ListChannels(p) => p.encode(&mut w),
            Payload::ChannelList(p) => p.encode(&mut w),
            Payload::ListServers(p) => p.encode(&mut w),
            Payload::ServerList(p) => p.encode(&mut w),
            Payload::JoinChannel(p) => p.encode(&mut w),
            Payload::JoinResponse(p) => p.encode(&mut w),
            Payload::CreateChannel(p) => p.encode(&mut w),
            Payload::ChannelCreated(p) => p.encode(&mut w),
            Payload::SubscribeChannel(p) => p.encode(&mut w),
            Payload::UnsubscribeChannel(p) => p.encode(&mut w),
            Payload::SubscribeOk(p) => p.encode(&mut w),
            Payload::SubscribeThread(p) => p.encode(&mut w),
            Payload::UnsubscribeThread(p) => p.encode(&mut w),
            Payload::ListMessages(p) => p.encode(&mut w),
            Payload::MessageList(p) => p.encode(&mut w),
            Payload::PostMessage(p) => p.encode(&mut w),
            Payload::MessagePosted(p) => p.encode(&mut w),
            Payload::EditMessage(p) => p.encode(&mut w),
            Payload::MessageEdited(p) => p.encode(&mut w),
            Payload::DeleteMessage(p) => p.encode(&mut w),
            Payload::MessageDeleted(p) => p.encode(&mut w),
            Payload::NewMessage(p) => p.encode(&mut w),
            Payload::BanUser(p) => p.encode(&mut w),
            Payload::BanIp(p) => p.encode(&mut w),
            Payload::UnbanUser(p) => p.encode(&mut w),
            Payload::UnbanIp(p) => p.encode(&mut w),
            Payload::ListBans(p) => p.encode(&mut w),
            Payload::BanList(p) => p.encode(&mut w),
            Payload::ListUsers(p) => p.encode(&mut w),
            Payload::UserList(p) => p.encode(&mut w),
            Payload::DeleteUser(p) => p.encode(&mut w),
            Payload::DeleteChannel(p) => p.encode(&mut w),
            Payload::AdminOk(p) => p.encode(&mut w),
            Payload::Error(p) => p.encode(&mut w),
        }
        Frame::new(msg_type, w.finish())
    }
}

/// Decode a frame's payload according to its recognized [`MessageType`].
/// Callers are expected to have already checked `frame.msg_type().is_some()`.
pub fn decode_payload(msg_type: MessageType, payload: &Bytes) -> Result<Payload, ProtocolError> {
    let mut r = WireReader::new(payload);
    let decoded = match msg_type {
        MessageType::ServerConfig => Payload::ServerConfig(ServerConfig::decode(&mut r)?),
        MessageType::Ping => Payload::Ping(Heartbeat::decode(&mut r)?),
        MessageType::Pong => Payload::Pong(Heartbeat::decode(&mut r)?),
        MessageType::SetNickname => Payload::SetNickname(SetNickname::decode(&mut r)?),
        MessageType::NicknameResponse => Payload::NicknameResponse(NicknameResponse::decode(&mut r)?),
        MessageType::GetUserInfo => Payload::GetUserInfo(GetUserInfo::decode(&mut r)?),
        MessageType::UserInfo => Payload::UserInfo(UserInfo::decode(&mut r)?),
        MessageType::AuthRequest => Payload::AuthRequest(AuthRequest::decode(&mut r)?),
        MessageType::AuthResponse => Payload::AuthResponse(AuthResponse::decode(&mut r)?),
        MessageType::RegisterUser => Payload::RegisterUser(RegisterUser::decode(&mut r)?),
        MessageType::RegisterResponse => Payload::RegisterResponse(RegisterResponse::decode(&mut r)?),
        MessageType::AddSshKey => Payload::AddSshKey(AddSshKey::decode(&mut r)?),
        MessageType::ListSshKeys => Payload::ListSshKeys(ListSshKeys::decode(&mut r)?),
        MessageType::SshKeyList => Payload::SshKeyList(SshKeyList::decode(&mut r)?),
        MessageType::UpdateSshKeyLabel => Payload::UpdateSshKeyLabel(UpdateSshKeyLabel::decode(&mut r)?),
        MessageType::DeleteSshKey => Payload::DeleteSshKey(DeleteSshKey::decode(&mut r)?),
        MessageType::ChangePassword => Payload::ChangePassword(ChangePassword::decode(&mut r)?),
        MessageType::ChangePasswordResponse => {
            Payload::ChangePasswordResponse(ChangePasswordResponse::decode(&mut r)?)
        }
        MessageType::Disconnect => Payload::Disconnect(Disconnect::decode(&mut r)?),
        MessageType::ListChannels => Payload::ListChannels(ListChannels::decode(&mut r)?),
        MessageType::ChannelList => Payload::ChannelList(ChannelList::decode(&mut r)?),
        MessageType::ListServers => Payload::ListServers(ListServers::decode(&mut r)?),
        MessageType::ServerList => Payload::ServerList(ServerList::decode(&mut r)?),
        MessageType::JoinChannel => Payload::JoinChannel(JoinChannel::decode(&mut r)?),
        MessageType::JoinResponse => Payload::JoinResponse(JoinResponse::decode(&mut r)?),
        MessageType::CreateChannel => Payload::CreateChannel(CreateChannel::decode(&mut r)?),
        MessageType::ChannelCreated => Payload::ChannelCreated(ChannelCreated::decode(&mut r)?),
        MessageType::SubscribeChannel => Payload::SubscribeChannel(SubscribeChannel::decode(&mut r)?),
        MessageType::UnsubscribeChannel => Payload::UnsubscribeChannel(UnsubscribeChannel::decode(&mut r)?),
        MessageType::SubscribeOk => Payload::SubscribeOk(SubscribeOk::decode(&mut r)?),
        MessageType::SubscribeThread => Payload::SubscribeThread(SubscribeThread::decode(&mut r)?),
        MessageType::UnsubscribeThread => Payload::UnsubscribeThread(UnsubscribeThread::decode(&mut r)?),
        MessageType::ListMessages => Payload::ListMessages(ListMessages::decode(&mut r)?),
        MessageType::MessageList => Payload::MessageList(MessageList::decode(&mut r)?),
        MessageType::PostMessage => Payload::PostMessage(PostMessage::decode(&mut r)?),
        MessageType::MessagePosted => Payload::MessagePosted(MessagePosted::decode(&mut r)?),
        MessageType::EditMessage => Payload::EditMessage(EditMessage::decode(&mut r)?),
        MessageType::MessageEdited => Payload::MessageEdited(MessageEdited::decode(&mut r)?),
        MessageType::DeleteMessage => Payload::DeleteMessage(DeleteMessage::decode(&mut r)?),
        MessageType::MessageDeleted => Payload::MessageDeleted(MessageDeleted::decode(&mut r)?),
        MessageType::NewMessage => Payload::NewMessage(NewMessage::decode(&mut r)?),
        MessageType::BanUser => Payload::BanUser(BanUser::decode(&mut r)?),
        MessageType::BanIp => Payload::BanIp(BanIp::decode(&mut r)?),
        MessageType::UnbanUser => Payload::UnbanUser(UnbanUser::decode(&mut r)?),
        MessageType::UnbanIp => Payload::UnbanIp(UnbanIp::decode(&mut r)?),
        MessageType::ListBans => Payload::ListBans(ListBans::decode(&mut r)?),
        MessageType::BanList => Payload::BanList(BanList::decode(&mut r)?),
        MessageType::ListUsers => Payload::ListUsers(ListUsers::decode(&mut r)?),
        MessageType::UserList => Payload::UserList(UserList::decode(&mut r)?),
        MessageType::DeleteUser => Payload::DeleteUser(DeleteUser::decode(&mut r)?),
        MessageType::DeleteChannel => Payload::DeleteChannel(DeleteChannel::decode(&mut r)?),
        MessageType::AdminOk => Payload::AdminOk(AdminOk::decode(&mut r)?),
        MessageType::Error => Payload::Error(ErrorPayload::decode(&mut r)?),
    };
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_post_message_through_a_frame() {
        let payload = Payload::PostMessage(PostMessage {
            channel_id: 7,
            subchannel_id: None,
            parent_id: Some(3),
            content: "hello".to_owned(),
        });
        let frame = payload.clone().into_frame();
        let decoded = decode_payload(frame.msg_type().unwrap(), &frame.payload).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn round_trips_error_payload() {
        let payload = Payload::Error(ErrorPayload {
            code: WireErrorCode::RateLimited,
            message: "slow down".to_owned(),
            in_reply_to: Some(MessageType::PostMessage.as_u8()),
            retry_after_secs: Some(5),
        });
        let frame = payload.clone().into_frame();
        let decoded = decode_payload(frame.msg_type().unwrap(), &frame.payload).unwrap();
        assert_eq!(decoded, payload);
    }
}
