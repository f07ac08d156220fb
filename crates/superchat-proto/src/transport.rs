//! Carrier-agnostic frame I/O.
//!
//! TCP/TLS and the byte-stream view of an SSH channel speak the same
//! `SuperChatCodec` over a `Framed<_, _>`. WebSocket instead frames at the
//! binary-message level, so it gets its own thin adapter that reuses
//! [`crate::codec::encode_frame`]/[`crate::codec::decode_frame`] under the
//! same trait.

use crate::codec::{decode_frame, encode_frame, SuperChatCodec};
use crate::error::ProtocolError;
use crate::message::Frame;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

/// One frame in, one frame out, independent of the underlying transport.
#[async_trait]
pub trait FrameCarrier: Send {
    async fn recv_frame(&mut self) -> Result<Option<Frame>, ProtocolError>;
    async fn send_frame(&mut self, frame: Frame) -> Result<(), ProtocolError>;
}

/// [`FrameCarrier`] over any stream-oriented duplex (TCP, TLS, SSH channel
/// byte stream) framed with [`SuperChatCodec`].
pub struct StreamCarrier<T> {
    framed: Framed<T, SuperChatCodec>,
}

impl<T> StreamCarrier<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(io: T, max_payload: u32) -> Self {
        Self {
            framed: Framed::new(io, SuperChatCodec::new(max_payload)),
        }
    }
}

#[async_trait]
impl<T> FrameCarrier for StreamCarrier<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn recv_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        self.framed.next().await.transpose()
    }

    async fn send_frame(&mut self, frame: Frame) -> Result<(), ProtocolError> {
        self.framed.send(frame).await
    }
}

/// [`FrameCarrier`] over a WebSocket connection. Only binary messages carry
/// frames; a text message is a protocol violation, not a silent skip.
#[cfg(feature = "tokio")]
pub struct WebSocketCarrier<S> {
    ws: tokio_tungstenite::WebSocketStream<S>,
    max_payload: u32,
}

#[cfg(feature = "tokio")]
impl<S> WebSocketCarrier<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(ws: tokio_tungstenite::WebSocketStream<S>, max_payload: u32) -> Self {
        Self { ws, max_payload }
    }
}

#[cfg(feature = "tokio")]
#[async_trait]
impl<S> FrameCarrier for WebSocketCarrier<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn recv_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        use tokio_tungstenite::tungstenite::Message;
        loop {
            match self.ws.next().await {
                None => return Ok(None),
                Some(Err(_)) => return Err(ProtocolError::Closed),
                Some(Ok(Message::Binary(bytes))) => {
                    return decode_frame(&bytes, self.max_payload).map(Some)
                }
                Some(Ok(Message::Text(_))) => return Err(ProtocolError::UnexpectedTextFrame),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Ok(Message::Frame(_))) => continue,
            }
        }
    }

    async fn send_frame(&mut self, frame: Frame) -> Result<(), ProtocolError> {
        use tokio_tungstenite::tungstenite::Message;
        let bytes = encode_frame(&frame);
        self.ws
            .send(Message::Binary(bytes.to_vec()))
            .await
            .map_err(|_| ProtocolError::Closed)
    }
}
