//! Shared black-box test harness: spawns the real `superchatd` binary per
//! test and drives it over a plain TCP socket with the wire protocol.

pub mod client;
pub mod server;

pub use client::TestClient;
pub use server::TestServer;
