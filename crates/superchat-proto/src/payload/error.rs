//! The `ERROR` message payload and its closed set of error codes.

use crate::error::ProtocolError;
use crate::wire::{WireReader, WireWriter};

/// Machine-readable reason a request was refused, carried in every `ERROR`
/// reply alongside a human-readable message. Closed set, numbered per the
/// error taxonomy: handlers map their internal error type onto one of
/// these before replying to a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireErrorCode {
    MalformedFrame = 1,
    OversizePayload = 2,
    Validation = 3,
    NotAuthenticated = 4,
    Forbidden = 5,
    RateLimited = 6,
    Banned = 7,
    TryAgain = 8,
    NeedRegistration = 9,
    NotFound = 10,
    Internal = 11,
}

impl WireErrorCode {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for WireErrorCode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use WireErrorCode::*;
        Ok(match value {
            1 => MalformedFrame,
            2 => OversizePayload,
            3 => Validation,
            4 => NotAuthenticated,
            5 => Forbidden,
            6 => RateLimited,
            7 => Banned,
            8 => TryAgain,
            9 => NeedRegistration,
            10 => NotFound,
            11 => Internal,
            other => return Err(ProtocolError::UnknownMessageType(other)),
        })
    }
}

/// Reply to a request the server could not or would not satisfy.
///
/// `in_reply_to` carries the raw type byte of the request this refuses, so
/// a client that fired several commands in flight can match the error back
/// without relying on ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPayload {
    pub code: WireErrorCode,
    pub message: String,
    pub in_reply_to: Option<u8>,
    /// For `RATE_LIMITED`/`TRY_AGAIN`, a hint for how long to back off.
    pub retry_after_secs: Option<u32>,
}

impl ErrorPayload {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u8(self.code.as_u8());
        w.put_str(&self.message);
        match self.in_reply_to {
            Some(t) => {
                w.put_bool(true);
                w.put_u8(t);
            }
            None => {
                w.put_bool(false);
            }
        }
        w.put_opt_u32(self.retry_after_secs);
    }

    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let code = WireErrorCode::try_from(r.get_u8()?)?;
        let message = r.get_str()?;
        let in_reply_to = if r.get_bool()? { Some(r.get_u8()?) } else { None };
        let retry_after_secs = r.get_opt_u32()?;
        Ok(Self {
            code,
            message,
            in_reply_to,
            retry_after_secs,
        })
    }
}
