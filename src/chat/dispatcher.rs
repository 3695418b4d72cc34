// ABOUTME: Pure dispatch function mapping a decoded frame to outbound replies
// ABOUTME: no I/O here so the readiness loop can batch writes and so this is trivial to test

use crate::chat::directory::{ConnectionId, Directory};
use crate::chat::frame::{client_list_body, Frame, FrameType, PeerName};

pub const SERVER_NAME: &str = "Server";

/// What the readiness loop should do with the sender's connection after
/// acting on `replies`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Keep,
    Disconnect,
}

/// An outbound frame addressed to a specific connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub to: ConnectionId,
    pub frame: Frame,
}

impl Reply {
    fn new(to: ConnectionId, frame: Frame) -> Self {
        Self { to, frame }
    }
}

fn server_name() -> PeerName {
    PeerName::try_from(SERVER_NAME).expect("SERVER_NAME fits in a PeerName")
}

fn client_list_frame(directory: &Directory, to_name: PeerName) -> Frame {
    let body = client_list_body(directory.names());
    Frame {
        frame_type: FrameType::ClientList.into(),
        source: server_name(),
        destination: to_name,
        msg_id: 0,
        data: body,
    }
}

/// Interprets `frame`, received from `sender`, against `directory`,
/// returning the frames to send and what to do with `sender` afterward.
///
/// `directory` is mutated in place (HELLO registers, DISCONNECT-triggering
/// frames do not remove the record here — the caller does that once it
/// actually closes the connection).
pub fn dispatch(frame: &Frame, sender: ConnectionId, directory: &mut Directory) -> (Vec<Reply>, Directive) {
    let Some(kind) = frame.kind() else {
        return (Vec::new(), Directive::Disconnect);
    };

    match kind {
        FrameType::Hello => {
            let requested_name = frame.source;
            match directory.register(requested_name, sender) {
                Ok(()) => {
                    let ack = Frame::header_only(FrameType::HelloAck, server_name(), requested_name, 0);
                    let list = client_list_frame(directory, requested_name);
                    (vec![Reply::new(sender, ack), Reply::new(sender, list)], Directive::Keep)
                }
                Err(_) => {
                    let error = Frame::header_only(
                        FrameType::ClientAlreadyPresentError,
                        frame.destination,
                        frame.source,
                        0,
                    );
                    (vec![Reply::new(sender, error)], Directive::Disconnect)
                }
            }
        }

        FrameType::ListRequest => {
            let requester_name = directory.name_of(sender).unwrap_or_default();
            (vec![Reply::new(sender, client_list_frame(directory, requester_name))], Directive::Keep)
        }

        FrameType::Chat => match directory.lookup(&frame.destination) {
            Some(target) => {
                let forwarded = frame.clone();
                (vec![Reply::new(target, forwarded)], Directive::Keep)
            }
            None => {
                let error = Frame {
                    frame_type: FrameType::CannotDeliverError.into(),
                    source: server_name(),
                    destination: frame.source,
                    msg_id: frame.msg_id,
                    data: bytes::Bytes::new(),
                };
                (vec![Reply::new(sender, error)], Directive::Keep)
            }
        },

        FrameType::Exit => (Vec::new(), Directive::Disconnect),

        // HELLO_ACK / CLIENT_LIST / the two error types are server-to-client
        // only; a client sending one is a protocol violation.
        FrameType::HelloAck | FrameType::ClientList | FrameType::ClientAlreadyPresentError | FrameType::CannotDeliverError => {
            (Vec::new(), Directive::Disconnect)
        }
    }
}
