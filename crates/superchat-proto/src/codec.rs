//! Length-prefixed framing over `tokio_util::codec`.
//!
//! Wire layout: `length:u32BE` (of everything after the length field) ·
//! `version:u8` · `type:u8` · `flags:u8` · `payload`.

use crate::error::ProtocolError;
use crate::message::{Frame, DEFAULT_MAX_PAYLOAD};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// `Decoder`/`Encoder` for [`Frame`]s, shared by every stream-oriented
/// carrier (TCP, TLS, the byte-stream view of an SSH channel).
#[derive(Debug, Clone)]
pub struct SuperChatCodec {
    max_payload: u32,
}

impl SuperChatCodec {
    pub fn new(max_payload: u32) -> Self {
        Self { max_payload }
    }

    pub fn max_payload(&self) -> u32 {
        self.max_payload
    }
}

impl Default for SuperChatCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD)
    }
}

/// Header is `length(4) + version(1) + type(1) + flags(1)`; `length` covers
/// everything after itself, i.e. `3 + payload.len()`.
const HEADER_TAIL_LEN: usize = 3;

impl Decoder for SuperChatCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        if src.len() < 4 {
            return Ok(None);
        }

        let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if length < HEADER_TAIL_LEN {
            return Err(ProtocolError::TruncatedHeader);
        }
        let payload_len = length - HEADER_TAIL_LEN;
        if payload_len as u32 > self.max_payload {
            return Err(ProtocolError::OversizePayload {
                got: payload_len,
                max: self.max_payload as usize,
            });
        }

        let total_len = 4 + length;
        if src.len() < total_len {
            // Not enough data yet; reserve so the next read can fill it in
            // one shot instead of growing the buffer incrementally.
            src.reserve(total_len - src.len());
            return Ok(None);
        }

        let mut frame_bytes = src.split_to(total_len);
        frame_bytes.advance(4);
        let version = frame_bytes.get_u8();
        let raw_type = frame_bytes.get_u8();
        let flags = frame_bytes.get_u8();
        let payload = frame_bytes.freeze();

        Ok(Some(Frame {
            version,
            raw_type,
            flags,
            payload,
        }))
    }
}

impl Encoder<Frame> for SuperChatCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        if frame.payload.len() as u32 > self.max_payload {
            return Err(ProtocolError::OversizePayload {
                got: frame.payload.len(),
                max: self.max_payload as usize,
            });
        }

        let length = HEADER_TAIL_LEN + frame.payload.len();
        dst.reserve(4 + length);
        dst.put_u32(length as u32);
        dst.put_u8(frame.version);
        dst.put_u8(frame.raw_type);
        dst.put_u8(frame.flags);
        dst.put_slice(&frame.payload);
        Ok(())
    }
}

/// Encode a single frame to an owned buffer, for carriers (WebSocket) that
/// want a whole message per underlying frame instead of a byte stream.
pub fn encode_frame(frame: &Frame) -> Bytes {
    let length = HEADER_TAIL_LEN + frame.payload.len();
    let mut buf = BytesMut::with_capacity(4 + length);
    buf.put_u32(length as u32);
    buf.put_u8(frame.version);
    buf.put_u8(frame.raw_type);
    buf.put_u8(frame.flags);
    buf.put_slice(&frame.payload);
    buf.freeze()
}

/// Decode a single frame from a whole buffer (one WebSocket binary message),
/// requiring the buffer be exactly one frame with no leftover bytes.
pub fn decode_frame(buf: &[u8], max_payload: u32) -> Result<Frame, ProtocolError> {
    let mut codec = SuperChatCodec::new(max_payload);
    let mut scratch = BytesMut::from(buf);
    match codec.decode(&mut scratch)? {
        Some(frame) if scratch.is_empty() => Ok(frame),
        Some(_) => Err(ProtocolError::TrailingBytes(scratch.len())),
        None => Err(ProtocolError::TruncatedHeader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageType;

    #[test]
    fn round_trips_through_the_stream_codec() {
        let mut codec = SuperChatCodec::default();
        let frame = Frame::new(MessageType::Ping, Bytes::from_static(b"hello"));
        let mut buf = BytesMut::new();
        codec.encode(frame.clone(), &mut buf).unwrap();

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.raw_type, frame.raw_type);
        assert_eq!(decoded.payload, frame.payload);
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_returns_none_on_partial_frame() {
        let mut codec = SuperChatCodec::default();
        let frame = Frame::new(MessageType::Ping, Bytes::from_static(b"hello world"));
        let mut full = BytesMut::new();
        codec.encode(frame, &mut full).unwrap();

        let mut partial = BytesMut::from(&full[..full.len() - 2]);
        assert!(codec.decode(&mut partial).unwrap().is_none());
    }

    #[test]
    fn rejects_oversize_payload_before_buffering() {
        let mut codec = SuperChatCodec::new(4);
        let mut src = BytesMut::new();
        src.put_u32(3 + 100);
        assert!(matches!(
            codec.decode(&mut src),
            Err(ProtocolError::OversizePayload { .. })
        ));
    }
}
