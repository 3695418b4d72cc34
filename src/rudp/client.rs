// ABOUTME: RUDP client: one RRQ out, DATA packets assembled in order, short datagram ends the transfer

use crate::rudp::error::{RudpError, RudpResult};
use crate::rudp::packet::{Packet, DATA_SIZE, MAX_DATA_PACKET_SIZE};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::UdpSocket;

/// Matches the reference implementation's preallocated assembly buffer:
/// 51 chunks of 512 bytes, enough headroom for a one-byte sequence space.
pub const MAX_FILE_SIZE: usize = 51 * DATA_SIZE;

pub struct RudpClient {
    socket: UdpSocket,
    server_addr: SocketAddr,
}

impl RudpClient {
    pub async fn connect(server_addr: SocketAddr) -> std::io::Result<Self> {
        let bind_addr: SocketAddr = if server_addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" }.parse().unwrap();
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(server_addr).await?;
        Ok(Self { socket, server_addr })
    }

    /// Runs the client side of the transfer end to end: send the RRQ,
    /// assemble the file in memory, and return its bytes. Writing the
    /// result to `./DST/<filename>` is the caller's job so this stays
    /// unit-testable without touching disk.
    pub async fn fetch(&self, window_size: u8, filename: &str) -> RudpResult<Vec<u8>> {
        self.send_rrq(window_size, filename).await?;

        let mut assembly = vec![0u8; MAX_FILE_SIZE];
        let mut filesize = 0usize;
        let mut ack: i32 = -1;
        let mut buf = [0u8; MAX_DATA_PACKET_SIZE];

        loop {
            let n = self.socket.recv(&mut buf).await?;
            let packet = Packet::decode(&buf[..n])?;

            match packet {
                Packet::Error => return Err(RudpError::ServerError),
                Packet::Data { seqno, payload } => {
                    let expected = (ack + 1) as u8;
                    if seqno == expected {
                        let offset = seqno as usize * DATA_SIZE;
                        assembly[offset..offset + payload.len()].copy_from_slice(&payload);
                        filesize += payload.len();
                        ack += 1;
                        self.send(&Packet::Ack { seqno: ack as u8 }).await?;
                    }
                    // out-of-order or duplicate DATA is dropped silently: no ACK,
                    // relying on the server's retransmission to catch up
                }
                other => {
                    tracing::warn!(?other, "ignoring unexpected packet");
                }
            }

            if n < MAX_DATA_PACKET_SIZE {
                break;
            }
        }

        assembly.truncate(filesize);
        Ok(assembly)
    }

    async fn send_rrq(&self, window_size: u8, filename: &str) -> RudpResult<()> {
        self.send(&Packet::Rrq { window_size, filename: filename.to_string() }).await
    }

    async fn send(&self, packet: &Packet) -> RudpResult<()> {
        let bytes = packet.encode()?;
        self.socket.send(&bytes).await?;
        Ok(())
    }
}

/// The destination path a fetched file is written to: `./DST/<filename>`.
pub fn destination_path(filename: &str) -> PathBuf {
    PathBuf::from("./DST").join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_path_is_under_dst() {
        assert_eq!(destination_path("a.bin"), PathBuf::from("./DST/a.bin"));
    }
}
