// ABOUTME: Structured errors for the RUDP server session and client

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RudpError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed packet: {0}")]
    Packet(#[from] crate::rudp::packet::PacketError),

    #[error("server reported ERROR")]
    ServerError,
}

pub type RudpResult<T> = Result<T, RudpError>;
