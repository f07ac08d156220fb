//! Wire protocol for SuperChat: frame header, message type codes, typed
//! payload encode/decode, and (with the `tokio` feature) the codec and
//! transport carriers that speak it over a socket.

pub mod error;
pub mod message;
pub mod payload;
pub mod wire;

#[cfg(feature = "tokio")]
pub mod codec;

#[cfg(feature = "tokio")]
pub mod transport;

pub use error::ProtocolError;
pub use message::{Frame, MessageType, DEFAULT_MAX_PAYLOAD, PROTOCOL_VERSION};
pub use payload::{decode_payload, Payload};

#[cfg(feature = "tokio")]
pub use codec::SuperChatCodec;

#[cfg(feature = "tokio")]
pub use transport::FrameCarrier;
