//! Test client speaking the raw wire protocol over TCP.

#![allow(dead_code)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use superchat_proto::{decode_payload, Frame, Payload, SuperChatCodec};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;

pub struct TestClient {
    framed: Framed<TcpStream, SuperChatCodec>,
}

impl TestClient {
    pub async fn connect(address: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        let framed = Framed::new(stream, SuperChatCodec::default());
        Ok(Self { framed })
    }

    pub async fn send(&mut self, payload: Payload) -> anyhow::Result<()> {
        self.framed.send(payload.into_frame()).await?;
        Ok(())
    }

    pub async fn recv_frame(&mut self) -> anyhow::Result<Frame> {
        self.recv_frame_timeout(Duration::from_secs(5)).await
    }

    pub async fn recv_frame_timeout(&mut self, dur: Duration) -> anyhow::Result<Frame> {
        match timeout(dur, self.framed.next()).await? {
            Some(frame) => Ok(frame?),
            None => anyhow::bail!("connection closed"),
        }
    }

    pub async fn recv(&mut self) -> anyhow::Result<Payload> {
        let frame = self.recv_frame().await?;
        let msg_type = frame
            .msg_type()
            .ok_or_else(|| anyhow::anyhow!("unknown message type {}", frame.raw_type))?;
        Ok(decode_payload(msg_type, &frame.payload)?)
    }

    /// Receive messages, skipping any that don't match `pred`, until one
    /// does or the timeout elapses.
    pub async fn recv_until<F>(&mut self, mut pred: F) -> anyhow::Result<Payload>
    where
        F: FnMut(&Payload) -> bool,
    {
        for _ in 0..50 {
            let payload = self.recv().await?;
            if pred(&payload) {
                return Ok(payload);
            }
        }
        anyhow::bail!("predicate never matched within 50 messages")
    }

    /// Register a nickname and drain the `SERVER_CONFIG` greeting first.
    pub async fn handshake(&mut self, nickname: &str) -> anyhow::Result<()> {
        let hello = self.recv().await?;
        if !matches!(hello, Payload::ServerConfig(_)) {
            anyhow::bail!("expected SERVER_CONFIG greeting, got {hello:?}");
        }
        self.send(Payload::SetNickname(superchat_proto::SetNickname {
            nickname: nickname.to_string(),
        }))
        .await?;
        match self.recv().await? {
            Payload::NicknameResponse(r) if r.success => Ok(()),
            other => anyhow::bail!("nickname claim failed: {other:?}"),
        }
    }
}
