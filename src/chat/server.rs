// ABOUTME: Single-threaded readiness loop multiplexing the listener and every open connection
// ABOUTME: reads are non-blocking and precede dispatch; the directory lives here and nowhere else

use crate::chat::directory::{ConnectionId, Directory};
use crate::chat::dispatcher::{self, Directive};
use crate::chat::frame::{Frame, MAX_FRAME_SIZE};
use bytes::BytesMut;
use std::collections::BTreeMap;
use std::io;
use std::net::SocketAddr;
use std::task::Poll;
use tokio::net::{TcpListener, TcpStream};

/// Implementation-defined cap on simultaneously open connections.
pub const MAX_CONNECTIONS: usize = 1024;

struct PeerConnection {
    stream: TcpStream,
    addr: SocketAddr,
    ingress: BytesMut,
}

impl PeerConnection {
    fn new(stream: TcpStream, addr: SocketAddr) -> Self {
        Self {
            stream,
            addr,
            ingress: BytesMut::with_capacity(MAX_FRAME_SIZE),
        }
    }
}

enum ReadOutcome {
    /// The kernel returned "would block"; nothing more to read this tick.
    WouldBlock,
    /// A read returned 0 bytes: the peer has closed its half of the connection.
    Closed,
}

enum Activity {
    Accepted(io::Result<(TcpStream, SocketAddr)>),
    Readable(ConnectionId, io::Result<()>),
}

/// The CHAT router: owns the listener, the directory, and every open
/// connection. Runs entirely on one task; the directory is never shared
/// across threads.
pub struct ChatRouter {
    listener: TcpListener,
    connections: BTreeMap<ConnectionId, PeerConnection>,
    directory: Directory,
    next_id: u64,
}

impl ChatRouter {
    pub fn new(listener: TcpListener) -> Self {
        Self {
            listener,
            connections: BTreeMap::new(),
            directory: Directory::new(),
            next_id: 0,
        }
    }

    pub async fn bind(port: u16) -> io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        Ok(Self::new(listener))
    }

    /// The address the listener is bound to. Mainly useful in tests that
    /// bind to an ephemeral port (`0`) and need to learn which one was chosen.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the readiness loop forever (or until a fatal I/O error occurs).
    pub async fn run(mut self) -> io::Result<()> {
        loop {
            match self.wait_for_activity().await {
                Activity::Accepted(result) => self.handle_accept(result),
                Activity::Readable(id, result) => self.handle_readable(id, result).await,
            }
        }
    }

    /// Blocks until the listener or some open connection becomes
    /// read-ready. Snapshots the active set and races it against the
    /// listener in a single hand-rolled readiness primitive built on
    /// tokio's own poll-based readiness API, since no single `select!`
    /// branch can cover a dynamic connection set.
    async fn wait_for_activity(&self) -> Activity {
        let listener = &self.listener;
        let connections = &self.connections;
        std::future::poll_fn(move |cx| {
            if let Poll::Ready(result) = listener.poll_accept(cx) {
                return Poll::Ready(Activity::Accepted(result));
            }
            for (&id, conn) in connections.iter() {
                if let Poll::Ready(result) = conn.stream.poll_read_ready(cx) {
                    return Poll::Ready(Activity::Readable(id, result));
                }
            }
            Poll::Pending
        })
        .await
    }

    fn handle_accept(&mut self, result: io::Result<(TcpStream, SocketAddr)>) {
        let (stream, addr) = match result {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(%err, "accept failed");
                return;
            }
        };

        if self.connections.len() >= MAX_CONNECTIONS {
            tracing::warn!(%addr, "refusing connection: at capacity ({MAX_CONNECTIONS})");
            return;
        }

        let id = ConnectionId::new(self.next_id);
        self.next_id += 1;
        tracing::info!(%addr, connection = %id, "accepted");
        self.connections.insert(id, PeerConnection::new(stream, addr));
    }

    async fn handle_readable(&mut self, id: ConnectionId, readiness: io::Result<()>) {
        if let Err(err) = readiness {
            tracing::warn!(connection = %id, %err, "readiness error");
            self.disconnect(id);
            return;
        }

        let Some(conn) = self.connections.get_mut(&id) else {
            return;
        };

        match Self::fill_ingress(conn) {
            Ok(ReadOutcome::WouldBlock) => {}
            Ok(ReadOutcome::Closed) => {
                tracing::info!(connection = %id, "peer closed connection");
                self.disconnect(id);
                return;
            }
            Err(err) => {
                tracing::warn!(connection = %id, %err, "read error");
                self.disconnect(id);
                return;
            }
        }

        self.drain_complete_frame(id).await;
    }

    /// Reads non-blockingly directly into the connection's ingress buffer
    /// until the kernel reports "would block" or a clean close. A single
    /// accumulating read straight into the ingress buffer, never copied
    /// through a scratch buffer first.
    fn fill_ingress(conn: &mut PeerConnection) -> io::Result<ReadOutcome> {
        loop {
            match conn.stream.try_read_buf(&mut conn.ingress) {
                Ok(0) => return Ok(ReadOutcome::Closed),
                Ok(_) => continue,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(ReadOutcome::WouldBlock),
                Err(err) => return Err(err),
            }
        }
    }

    /// For a single connection: if its ingress buffer now holds a complete
    /// frame, decode it, dispatch, and act on the result.
    async fn drain_complete_frame(&mut self, id: ConnectionId) {
        let Some(conn) = self.connections.get(&id) else {
            return;
        };

        let frame = match Frame::check(&conn.ingress) {
            Ok(_) => match Frame::parse(&conn.ingress) {
                Ok(frame) => frame,
                Err(err) => {
                    tracing::warn!(connection = %id, %err, "malformed frame");
                    self.disconnect(id);
                    return;
                }
            },
            Err(crate::chat::frame::Error::Incomplete) => {
                if conn.ingress.len() > MAX_FRAME_SIZE {
                    tracing::warn!(connection = %id, "ingress buffer exceeded max frame size without completing");
                    self.disconnect(id);
                }
                return;
            }
            Err(err) => {
                tracing::warn!(connection = %id, %err, "malformed frame");
                self.disconnect(id);
                return;
            }
        };

        self.connections.get_mut(&id).expect("checked above").ingress.clear();

        let (replies, directive) = dispatcher::dispatch(&frame, id, &mut self.directory);
        tracing::info!(connection = %id, frame_type = frame.frame_type, directory_size = self.directory.len(), "dispatched");

        for reply in replies {
            self.write_frame(reply.to, &reply.frame).await;
        }

        if directive == Directive::Disconnect {
            self.disconnect(id);
        }
    }

    async fn write_frame(&mut self, to: ConnectionId, frame: &Frame) {
        let Some(conn) = self.connections.get_mut(&to) else {
            return;
        };
        let bytes = match frame.encode() {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(connection = %to, %err, "failed to encode outbound frame");
                return;
            }
        };
        use tokio::io::AsyncWriteExt;
        if let Err(err) = conn.stream.write_all(&bytes).await {
            tracing::warn!(connection = %to, %err, "write failed");
            self.disconnect(to);
        }
    }

    fn disconnect(&mut self, id: ConnectionId) {
        if let Some(conn) = self.connections.remove(&id) {
            tracing::info!(connection = %id, addr = %conn.addr, "closing connection");
        }
        self.directory.remove_by_connection(id);
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::chat::frame::{Frame, FrameType, PeerName};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn spawn_router() -> SocketAddr {
        let router = ChatRouter::bind(0).await.unwrap();
        let addr = router.local_addr().unwrap();
        tokio::spawn(router.run());
        addr
    }

    async fn connect(addr: SocketAddr) -> TcpStream {
        TcpStream::connect(addr).await.unwrap()
    }

    async fn send_frame(stream: &mut TcpStream, frame: &Frame) {
        stream.write_all(&frame.encode().unwrap()).await.unwrap();
    }

    /// Reads exactly one frame: the fixed header, then the body it
    /// declares (the length field at offset 42), never over-reading into
    /// the next frame.
    async fn recv_frame(stream: &mut TcpStream) -> Frame {
        let mut buf = vec![0u8; crate::chat::frame::HEADER_SIZE];
        stream.read_exact(&mut buf).await.unwrap();
        let body_len = u32::from_be_bytes(buf[42..46].try_into().unwrap()) as usize;
        if body_len > 0 {
            let mut body = vec![0u8; body_len];
            stream.read_exact(&mut body).await.unwrap();
            buf.extend_from_slice(&body);
        }
        Frame::parse(&buf).unwrap()
    }

    fn name(s: &str) -> PeerName {
        PeerName::try_from(s).unwrap()
    }

    #[tokio::test]
    async fn s1_hello_then_list() {
        let addr = spawn_router().await;
        let mut alice = connect(addr).await;

        send_frame(&mut alice, &Frame::header_only(FrameType::Hello, name("alice"), name("Server"), 0)).await;

        let ack = recv_frame(&mut alice).await;
        assert_eq!(ack.kind(), Some(FrameType::HelloAck));

        let list = recv_frame(&mut alice).await;
        assert_eq!(list.kind(), Some(FrameType::ClientList));
        assert_eq!(list.data.as_ref(), b"alice\0");
    }

    #[tokio::test]
    async fn s2_duplicate_hello_is_rejected_and_closed() {
        let addr = spawn_router().await;
        let mut alice = connect(addr).await;
        send_frame(&mut alice, &Frame::header_only(FrameType::Hello, name("alice"), name("Server"), 0)).await;
        recv_frame(&mut alice).await; // HELLO_ACK
        recv_frame(&mut alice).await; // CLIENT_LIST

        let mut alice2 = connect(addr).await;
        send_frame(&mut alice2, &Frame::header_only(FrameType::Hello, name("alice"), name("Server"), 0)).await;
        let reply = recv_frame(&mut alice2).await;
        assert_eq!(reply.kind(), Some(FrameType::ClientAlreadyPresentError));

        // the server closes its end after the error; the next read sees EOF
        let mut scratch = [0u8; 1];
        assert_eq!(alice2.read(&mut scratch).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn s3_chat_relays_to_a_registered_destination() {
        let addr = spawn_router().await;
        let mut alice = connect(addr).await;
        send_frame(&mut alice, &Frame::header_only(FrameType::Hello, name("alice"), name("Server"), 0)).await;
        recv_frame(&mut alice).await;
        recv_frame(&mut alice).await;

        let mut bob = connect(addr).await;
        send_frame(&mut bob, &Frame::header_only(FrameType::Hello, name("bob"), name("Server"), 0)).await;
        recv_frame(&mut bob).await;
        recv_frame(&mut bob).await;

        let chat = Frame {
            frame_type: FrameType::Chat.into(),
            source: name("alice"),
            destination: name("bob"),
            msg_id: 7,
            data: bytes::Bytes::from_static(b"hi!"),
        };
        send_frame(&mut alice, &chat).await;

        let received = recv_frame(&mut bob).await;
        assert_eq!(received, chat);
    }

    #[tokio::test]
    async fn s4_chat_to_unknown_destination_gets_cannot_deliver() {
        let addr = spawn_router().await;
        let mut alice = connect(addr).await;
        send_frame(&mut alice, &Frame::header_only(FrameType::Hello, name("alice"), name("Server"), 0)).await;
        recv_frame(&mut alice).await;
        recv_frame(&mut alice).await;

        let chat = Frame {
            frame_type: FrameType::Chat.into(),
            source: name("alice"),
            destination: name("carol"),
            msg_id: 9,
            data: bytes::Bytes::from_static(b"?"),
        };
        send_frame(&mut alice, &chat).await;

        let reply = recv_frame(&mut alice).await;
        assert_eq!(reply.kind(), Some(FrameType::CannotDeliverError));
        assert_eq!(reply.source, name("Server"));
        assert_eq!(reply.destination, name("alice"));
        assert_eq!(reply.msg_id, 9);
    }

    #[tokio::test]
    async fn exit_closes_the_connection_with_no_reply() {
        let addr = spawn_router().await;
        let mut alice = connect(addr).await;
        send_frame(&mut alice, &Frame::header_only(FrameType::Hello, name("alice"), name("Server"), 0)).await;
        recv_frame(&mut alice).await;
        recv_frame(&mut alice).await;

        send_frame(&mut alice, &Frame::header_only(FrameType::Exit, name("alice"), name("Server"), 0)).await;

        let mut scratch = [0u8; 1];
        assert_eq!(alice.read(&mut scratch).await.unwrap(), 0);
    }
}
