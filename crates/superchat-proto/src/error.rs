//! Wire-level error types for the SuperChat protocol.

use thiserror::Error;

/// Errors that can occur while framing or decoding the wire protocol.
///
/// These are distinct from [`crate::payload::WireErrorCode`], which is the
/// `ERROR` message's own `code` field sent *to a peer* — this type is for
/// local decode/encode failures that never leave the process as a value.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame payload of {got} bytes exceeds the {max} byte limit")]
    OversizePayload { got: usize, max: usize },

    #[error("frame shorter than the minimum header size")]
    TruncatedHeader,

    #[error("string field is not valid utf-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("payload ended before a required field")]
    UnexpectedEof,

    #[error("present-flag byte was neither 0 nor 1, got {0}")]
    InvalidPresenceFlag(u8),

    #[error("trailing {0} unconsumed bytes after decoding payload")]
    TrailingBytes(usize),

    #[error("unknown message type byte: {0}")]
    UnknownMessageType(u8),

    #[error("websocket carried a text frame; only binary frames are accepted")]
    UnexpectedTextFrame,

    #[error("carrier closed")]
    Closed,
}
