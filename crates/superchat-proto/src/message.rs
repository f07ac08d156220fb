//! Frame header and the closed set of message type codes.

use crate::error::ProtocolError;
use bytes::Bytes;

/// Default maximum payload size (not counting the 3-byte version/type/flags
/// header) a server will accept before failing the session. Operators can
/// raise or lower this via `--max-msg-bytes`.
pub const DEFAULT_MAX_PAYLOAD: u32 = 1024 * 1024;

/// Current wire protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// The closed set of message types, grouped the way spec.md groups them.
/// Unknown type bytes are not an error at decode time — the codec passes
/// them through as [`MessageType::Unknown`] and the session discards them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    // -- Unauthenticated handshake --
    ServerConfig = 1,
    Ping = 2,
    Pong = 3,

    // -- Identity --
    SetNickname = 10,
    NicknameResponse = 11,
    GetUserInfo = 12,
    UserInfo = 13,
    AuthRequest = 14,
    AuthResponse = 15,
    RegisterUser = 16,
    RegisterResponse = 17,
    AddSshKey = 18,
    ListSshKeys = 19,
    SshKeyList = 20,
    UpdateSshKeyLabel = 21,
    DeleteSshKey = 22,
    ChangePassword = 23,
    ChangePasswordResponse = 24,
    Disconnect = 25,

    // -- Discovery --
    ListChannels = 30,
    ChannelList = 31,
    ListServers = 32,
    ServerList = 33,

    // -- Channel ops --
    JoinChannel = 40,
    JoinResponse = 41,
    CreateChannel = 42,
    ChannelCreated = 43,
    SubscribeChannel = 44,
    UnsubscribeChannel = 45,
    SubscribeOk = 46,
    SubscribeThread = 47,
    UnsubscribeThread = 48,

    // -- Messaging --
    ListMessages = 50,
    MessageList = 51,
    PostMessage = 52,
    MessagePosted = 53,
    EditMessage = 54,
    MessageEdited = 55,
    DeleteMessage = 56,
    MessageDeleted = 57,
    NewMessage = 58,

    // -- Admin --
    BanUser = 70,
    BanIp = 71,
    UnbanUser = 72,
    UnbanIp = 73,
    ListBans = 74,
    BanList = 75,
    ListUsers = 76,
    UserList = 77,
    DeleteUser = 78,
    DeleteChannel = 79,
    AdminOk = 80,

    // -- Errors --
    Error = 255,
}

impl MessageType {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, <Self as TryFrom<u8>>::Error> {
        use MessageType::*;
        Ok(match value {
            1 => ServerConfig,
            2 => Ping,
            3 => Pong,
            10 => SetNickname,
            11 => NicknameResponse,
            12 => GetUserInfo,
            13 => UserInfo,
            14 => AuthRequest,
            15 => AuthResponse,
            16 => RegisterUser,
            17 => RegisterResponse,
            18 => AddSshKey,
            19 => ListSshKeys,
            20 => SshKeyList,
            21 => UpdateSshKeyLabel,
            22 => DeleteSshKey,
            23 => ChangePassword,
            24 => ChangePasswordResponse,
            25 => Disconnect,
            30 => ListChannels,
            31 => ChannelList,
            32 => ListServers,
            33 => ServerList,
            40 => JoinChannel,
            41 => JoinResponse,
            42 => CreateChannel,
            43 => ChannelCreated,
            44 => SubscribeChannel,
            45 => UnsubscribeChannel,
            46 => SubscribeOk,
            47 => SubscribeThread,
            48 => UnsubscribeThread,
            50 => ListMessages,
            51 => MessageList,
            52 => PostMessage,
            53 => MessagePosted,
            54 => EditMessage,
            55 => MessageEdited,
            56 => DeleteMessage,
            57 => MessageDeleted,
            58 => NewMessage,
            70 => BanUser,
            71 => BanIp,
            72 => UnbanUser,
            73 => UnbanIp,
            74 => ListBans,
            75 => BanList,
            76 => ListUsers,
            77 => UserList,
            78 => DeleteUser,
            79 => DeleteChannel,
            80 => AdminOk,
            255 => Error,
            other => return Err(ProtocolError::UnknownMessageType(other)),
        })
    }
}

/// A single decoded frame: header fields plus the still-encoded payload.
///
/// Frames with an unrecognized `type` byte are represented with
/// `msg_type: None` — the session discards them per spec.md's decoding
/// rule ("unknown type ⇒ silently discard payload and continue").
#[derive(Debug, Clone)]
pub struct Frame {
    pub version: u8,
    pub raw_type: u8,
    pub flags: u8,
    pub payload: Bytes,
}

impl Frame {
    pub fn msg_type(&self) -> Option<MessageType> {
        MessageType::try_from(self.raw_type).ok()
    }

    pub fn new(msg_type: MessageType, payload: Bytes) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            raw_type: msg_type.as_u8(),
            flags: 0,
            payload,
        }
    }
}
