// ABOUTME: RUDP server: one session at a time, WAIT_RRQ -> LOADING -> SENDING -> {DONE, ABORTED}

use crate::rudp::error::RudpResult;
use crate::rudp::packet::{Packet, DATA_SIZE, MAX_DATA_PACKET_SIZE, RRQ_SIZE};
use bytes::Bytes;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::UdpSocket;

/// Each consecutive timeout of the ACK wait retransmits the unacknowledged
/// window; five in a row abort the session.
const ACK_TIMEOUT: Duration = Duration::from_secs(3);
const MAX_TIMEOUTS_IN_ROW: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Done,
    Aborted,
    FileNotFound,
}

pub struct RudpServer {
    socket: UdpSocket,
    root: PathBuf,
    ack_timeout: Duration,
}

impl RudpServer {
    pub fn new(socket: UdpSocket, root: PathBuf) -> Self {
        Self { socket, root, ack_timeout: ACK_TIMEOUT }
    }

    pub async fn bind(port: u16, root: PathBuf) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
        Ok(Self::new(socket, root))
    }

    /// Overrides the ACK wait so tests can drive the timeout/retransmit/abort
    /// path without waiting on the real multi-second timeout.
    #[cfg(test)]
    fn with_ack_timeout(mut self, ack_timeout: Duration) -> Self {
        self.ack_timeout = ack_timeout;
        self
    }

    /// The address the socket is bound to. Mainly useful in tests that bind
    /// to an ephemeral port (`0`) and need to learn which one was chosen.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Serves sessions forever, one at a time.
    pub async fn run(&self) -> RudpResult<()> {
        loop {
            let outcome = self.serve_one_session().await?;
            tracing::info!(?outcome, "session finished");
        }
    }

    /// WAIT_RRQ: blocks until a valid RRQ datagram arrives, then drives the
    /// session to completion before returning to waiting for the next one.
    async fn serve_one_session(&self) -> RudpResult<SessionOutcome> {
        let (window_size, filename, client_addr) = self.wait_for_rrq().await?;
        tracing::info!(%client_addr, window_size, %filename, "RRQ received");

        let file_bytes = match resolve_under(&self.root, &filename) {
            Some(path) => match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(%filename, %err, "file not accessible, sending ERROR");
                    self.send(&Packet::Error, client_addr).await?;
                    return Ok(SessionOutcome::FileNotFound);
                }
            },
            None => {
                tracing::warn!(%filename, "rejecting filename outside server root, sending ERROR");
                self.send(&Packet::Error, client_addr).await?;
                return Ok(SessionOutcome::FileNotFound);
            }
        };

        self.send_file(&file_bytes, window_size, client_addr).await
    }

    async fn wait_for_rrq(&self) -> RudpResult<(u8, String, SocketAddr)> {
        let mut buf = [0u8; RRQ_SIZE];
        loop {
            let (n, from) = self.socket.recv_from(&mut buf).await?;
            match Packet::decode(&buf[..n]) {
                Ok(Packet::Rrq { window_size, filename }) => return Ok((window_size, filename, from)),
                Ok(_) => tracing::warn!(%from, "ignoring non-RRQ packet while waiting"),
                Err(err) => tracing::warn!(%from, %err, "ignoring malformed packet while waiting"),
            }
        }
    }

    /// The sliding-window loop: resends the whole outstanding window every
    /// iteration, waits for an ACK with a timeout, and advances on progress.
    async fn send_file(&self, file_bytes: &[u8], window_size: u8, client_addr: SocketAddr) -> RudpResult<SessionOutcome> {
        let total_packets = file_bytes.len().div_ceil(DATA_SIZE);
        if total_packets == 0 {
            return Ok(SessionOutcome::Done);
        }
        let window_size = window_size.max(1) as usize;

        let mut ack: i32 = -1;
        let mut winstart: usize = 0;
        let mut timeouts_in_row: u32 = 0;
        let mut recv_buf = [0u8; MAX_DATA_PACKET_SIZE];

        loop {
            let winend = (winstart + window_size - 1).min(total_packets - 1);
            for seq in winstart..=winend {
                let chunk = chunk_of(file_bytes, seq);
                let packet = Packet::Data { seqno: seq as u8, payload: Bytes::copy_from_slice(chunk) };
                self.send(&packet, client_addr).await?;
            }

            match tokio::time::timeout(self.ack_timeout, self.socket.recv_from(&mut recv_buf)).await {
                Ok(Ok((n, _from))) => match Packet::decode(&recv_buf[..n]) {
                    Ok(Packet::Ack { seqno }) => {
                        let acked = seqno as i32;
                        if acked > ack {
                            ack = acked;
                            timeouts_in_row = 0;
                            winstart = (ack + 1) as usize;
                        }
                        // duplicate/stale ACKs are ignored and do not reset timeouts_in_row
                    }
                    _ => tracing::warn!("ignoring unexpected packet during SENDING"),
                },
                Ok(Err(err)) => return Err(err.into()),
                Err(_elapsed) => {
                    timeouts_in_row += 1;
                    tracing::warn!(timeouts_in_row, "ACK wait timed out, retransmitting window");
                    if timeouts_in_row >= MAX_TIMEOUTS_IN_ROW {
                        return Ok(SessionOutcome::Aborted);
                    }
                }
            }

            if ack == total_packets as i32 - 1 {
                return Ok(SessionOutcome::Done);
            }
        }
    }

    async fn send(&self, packet: &Packet, to: SocketAddr) -> RudpResult<()> {
        let bytes = packet.encode()?;
        self.socket.send_to(&bytes, to).await?;
        Ok(())
    }
}

fn chunk_of(file_bytes: &[u8], seq: usize) -> &[u8] {
    let start = seq * DATA_SIZE;
    let end = (start + DATA_SIZE).min(file_bytes.len());
    &file_bytes[start..end]
}

/// Resolves `filename` for path-traversal safety and existence before a
/// session reads it. Kept separate from `Path::join` so it can be unit
/// tested without a real filesystem session.
pub fn resolve_under(root: &Path, filename: &str) -> Option<PathBuf> {
    if filename.contains('/') || filename.contains('\\') || filename == ".." {
        return None;
    }
    Some(root.join(filename))
}
