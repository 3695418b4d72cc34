//! RUDP: a sliding-window, stop-and-restart reliable file transfer over UDP datagrams.

pub mod client;
pub mod error;
pub mod packet;
pub mod server;

pub use client::RudpClient;
pub use error::{RudpError, RudpResult};
pub use packet::Packet;
pub use server::{RudpServer, SessionOutcome};
