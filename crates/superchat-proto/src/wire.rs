//! Primitive scalar/string/optional encoding shared by every payload.
//!
//! All scalars are big-endian. Strings are a `u16` byte length followed by
//! UTF-8 bytes (not a character count). Optional fields are a `u8` presence
//! flag (`0` or `1`) followed by the value when present — see DESIGN NOTES
//! in the spec on why we never use a sentinel value for "unset".

use crate::error::ProtocolError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Appends wire-encoded primitives to a growable buffer.
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    pub fn new() -> Self {
        Self { buf: BytesMut::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self { buf: BytesMut::with_capacity(cap) }
    }

    pub fn put_u8(&mut self, v: u8) -> &mut Self {
        self.buf.put_u8(v);
        self
    }

    pub fn put_u16(&mut self, v: u16) -> &mut Self {
        self.buf.put_u16(v);
        self
    }

    pub fn put_u32(&mut self, v: u32) -> &mut Self {
        self.buf.put_u32(v);
        self
    }

    pub fn put_u64(&mut self, v: u64) -> &mut Self {
        self.buf.put_u64(v);
        self
    }

    pub fn put_bool(&mut self, v: bool) -> &mut Self {
        self.buf.put_u8(v as u8);
        self
    }

    /// `u16` length prefix + raw UTF-8 bytes. Truncates silently past `u16::MAX`
    /// bytes is never expected in practice (content is bounded well below it
    /// at every call site) so we debug_assert instead of returning a Result.
    pub fn put_str(&mut self, s: &str) -> &mut Self {
        debug_assert!(s.len() <= u16::MAX as usize, "string field too long for u16 length prefix");
        self.buf.put_u16(s.len() as u16);
        self.buf.put_slice(s.as_bytes());
        self
    }

    pub fn put_opt_str(&mut self, s: Option<&str>) -> &mut Self {
        match s {
            Some(s) => {
                self.put_bool(true);
                self.put_str(s);
            }
            None => {
                self.put_bool(false);
            }
        }
        self
    }

    pub fn put_opt_u64(&mut self, v: Option<u64>) -> &mut Self {
        match v {
            Some(v) => {
                self.put_bool(true);
                self.put_u64(v);
            }
            None => {
                self.put_bool(false);
            }
        }
        self
    }

    pub fn put_opt_u32(&mut self, v: Option<u32>) -> &mut Self {
        match v {
            Some(v) => {
                self.put_bool(true);
                self.put_u32(v);
            }
            None => {
                self.put_bool(false);
            }
        }
        self
    }

    pub fn put_bytes(&mut self, b: &[u8]) -> &mut Self {
        self.buf.put_u32(b.len() as u32);
        self.buf.put_slice(b);
        self
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

impl Default for WireWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumes wire-encoded primitives from a payload slice, tracking position.
pub struct WireReader<'a> {
    buf: &'a [u8],
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn require(&self, n: usize) -> Result<(), ProtocolError> {
        if self.buf.len() < n {
            Err(ProtocolError::UnexpectedEof)
        } else {
            Ok(())
        }
    }

    pub fn get_u8(&mut self) -> Result<u8, ProtocolError> {
        self.require(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn get_u16(&mut self) -> Result<u16, ProtocolError> {
        self.require(2)?;
        Ok(self.buf.get_u16())
    }

    pub fn get_u32(&mut self) -> Result<u32, ProtocolError> {
        self.require(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn get_u64(&mut self) -> Result<u64, ProtocolError> {
        self.require(8)?;
        Ok(self.buf.get_u64())
    }

    pub fn get_bool(&mut self) -> Result<bool, ProtocolError> {
        match self.get_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ProtocolError::InvalidPresenceFlag(other)),
        }
    }

    pub fn get_str(&mut self) -> Result<String, ProtocolError> {
        let len = self.get_u16()? as usize;
        self.require(len)?;
        let bytes = &self.buf[..len];
        let s = std::str::from_utf8(bytes)?.to_owned();
        self.buf.advance(len);
        Ok(s)
    }

    pub fn get_opt_str(&mut self) -> Result<Option<String>, ProtocolError> {
        if self.get_bool()? {
            Ok(Some(self.get_str()?))
        } else {
            Ok(None)
        }
    }

    pub fn get_opt_u64(&mut self) -> Result<Option<u64>, ProtocolError> {
        if self.get_bool()? {
            Ok(Some(self.get_u64()?))
        } else {
            Ok(None)
        }
    }

    pub fn get_opt_u32(&mut self) -> Result<Option<u32>, ProtocolError> {
        if self.get_bool()? {
            Ok(Some(self.get_u32()?))
        } else {
            Ok(None)
        }
    }

    pub fn get_bytes(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let len = self.get_u32()? as usize;
        self.require(len)?;
        let out = self.buf[..len].to_vec();
        self.buf.advance(len);
        Ok(out)
    }

    /// Call after decoding every field: any leftover bytes means the frame
    /// carried more than this payload's schema accounts for.
    pub fn finish(&self) -> Result<(), ProtocolError> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::TrailingBytes(self.buf.len()))
        }
    }
}
