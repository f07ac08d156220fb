//! Channel and server discovery payloads.

use super::common::{ChannelSummary, ServerSummary};
use crate::error::ProtocolError;
use crate::wire::{WireReader, WireWriter};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListChannels;

impl ListChannels {
    pub(crate) fn encode(&self, _w: &mut WireWriter) {}
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        r.finish()?;
        Ok(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelList {
    pub channels: Vec<ChannelSummary>,
}

impl ChannelList {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u32(self.channels.len() as u32);
        for c in &self.channels {
            c.encode(w);
        }
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let count = r.get_u32()?;
        let mut channels = Vec::with_capacity(count as usize);
        for _ in 0..count {
            channels.push(ChannelSummary::decode(r)?);
        }
        Ok(Self { channels })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListServers;

impl ListServers {
    pub(crate) fn encode(&self, _w: &mut WireWriter) {}
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        r.finish()?;
        Ok(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerList {
    pub servers: Vec<ServerSummary>,
}

impl ServerList {
    pub(crate) fn encode(&self, w: &mut WireWriter) {
        w.put_u32(self.servers.len() as u32);
        for s in &self.servers {
            s.encode(w);
        }
    }
    pub(crate) fn decode(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let count = r.get_u32()?;
        let mut servers = Vec::with_capacity(count as usize);
        for _ in 0..count {
            servers.push(ServerSummary::decode(r)?);
        }
        Ok(Self { servers })
    }
}
