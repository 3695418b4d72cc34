// ABOUTME: Wire codec for the fixed 50-byte-header CHAT frame
// ABOUTME: separates the on-wire layout from the in-memory Frame the dispatcher operates on

use crate::wire::{read_u16_be, read_u32_be, write_u16_be, write_u32_be, FixedBytes};
use bytes::Bytes;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

pub const HEADER_SIZE: usize = 50;
pub const NAME_SIZE: usize = 20;
pub const MAX_BODY_SIZE: usize = 400;
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_BODY_SIZE;

pub type PeerName = FixedBytes<NAME_SIZE>;

const TYPE_OFFSET: usize = 0;
const SOURCE_OFFSET: usize = 2;
const DESTINATION_OFFSET: usize = 22;
const LENGTH_OFFSET: usize = 42;
const MSG_ID_OFFSET: usize = 46;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum FrameType {
    Hello = 1,
    HelloAck = 2,
    ListRequest = 3,
    ClientList = 4,
    Chat = 5,
    Exit = 6,
    ClientAlreadyPresentError = 7,
    CannotDeliverError = 8,
}

/// A decoded CHAT frame. Transient: constructed by `decode`, consumed by the
/// dispatcher and the writer.
///
/// `frame_type` is kept as the raw wire value rather than rejected at decode
/// time: whether an unrecognized type is a protocol violation is a
/// dispatcher policy decision (see `Dispatcher::dispatch`), not a codec one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: u16,
    pub source: PeerName,
    pub destination: PeerName,
    pub msg_id: u32,
    pub data: Bytes,
}

impl Frame {
    pub fn header_only(frame_type: FrameType, source: PeerName, destination: PeerName, msg_id: u32) -> Self {
        Self {
            frame_type: frame_type.into(),
            source,
            destination,
            msg_id,
            data: Bytes::new(),
        }
    }

    /// The known frame kind, or `None` if `frame_type` is not one of the
    /// eight values defined by the protocol.
    pub fn kind(&self) -> Option<FrameType> {
        FrameType::try_from(self.frame_type).ok()
    }

    /// Checks whether `buf` (the current contents of an ingress buffer)
    /// holds a complete frame.
    ///
    /// Returns the total frame length on success.
    pub fn check(buf: &[u8]) -> Result<usize, Error> {
        let len = buf.len();
        if len < HEADER_SIZE {
            return Err(Error::Incomplete);
        }
        let body_len = read_u32_be(buf, LENGTH_OFFSET) as usize;
        if body_len > MAX_BODY_SIZE {
            return Err(Error::Other(
                format!("frame body length {body_len} exceeds maximum {MAX_BODY_SIZE}").into(),
            ));
        }
        let total = HEADER_SIZE + body_len;
        if len < total {
            return Err(Error::Incomplete);
        }
        Ok(total)
    }

    /// Parses a single frame out of `buf`. Callers must have already
    /// confirmed completeness with [`Frame::check`].
    pub fn parse(buf: &[u8]) -> Result<Self, Error> {
        let total = Self::check(buf)?;
        let frame_type = read_u16_be(buf, TYPE_OFFSET);
        let source = PeerName::from_array(buf[SOURCE_OFFSET..SOURCE_OFFSET + NAME_SIZE].try_into().unwrap());
        let destination =
            PeerName::from_array(buf[DESTINATION_OFFSET..DESTINATION_OFFSET + NAME_SIZE].try_into().unwrap());
        let msg_id = read_u32_be(buf, MSG_ID_OFFSET);
        let data = Bytes::copy_from_slice(&buf[HEADER_SIZE..total]);
        Ok(Frame {
            frame_type,
            source,
            destination,
            msg_id,
            data,
        })
    }

    /// Encodes this frame to exactly `50 + data.len()` bytes.
    pub fn encode(&self) -> Result<Bytes, Error> {
        if self.data.len() > MAX_BODY_SIZE {
            return Err(Error::Other(
                format!("frame body length {} exceeds maximum {MAX_BODY_SIZE}", self.data.len()).into(),
            ));
        }
        let mut buf = vec![0u8; HEADER_SIZE + self.data.len()];
        write_u16_be(&mut buf, TYPE_OFFSET, self.frame_type);
        buf[SOURCE_OFFSET..SOURCE_OFFSET + NAME_SIZE].copy_from_slice(self.source.as_array());
        buf[DESTINATION_OFFSET..DESTINATION_OFFSET + NAME_SIZE].copy_from_slice(self.destination.as_array());
        write_u32_be(&mut buf, LENGTH_OFFSET, self.data.len() as u32);
        write_u32_be(&mut buf, MSG_ID_OFFSET, self.msg_id);
        buf[HEADER_SIZE..].copy_from_slice(&self.data);
        Ok(Bytes::from(buf))
    }
}

/// Builds the `CLIENT_LIST` body: every registered name's raw bytes, each
/// NUL-terminated, concatenated in the directory's iteration order.
pub fn client_list_body(names: impl IntoIterator<Item = PeerName>) -> Bytes {
    let mut body = Vec::new();
    for name in names {
        body.extend_from_slice(name.as_str_bytes());
        body.push(0);
    }
    Bytes::from(body)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("stream ended early")]
    Incomplete,
    #[error(transparent)]
    Other(#[from] crate::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(body: &[u8]) -> Frame {
        Frame {
            frame_type: FrameType::Chat.into(),
            source: PeerName::try_from("alice").unwrap(),
            destination: PeerName::try_from("bob").unwrap(),
            msg_id: 7,
            data: Bytes::copy_from_slice(body),
        }
    }

    #[test]
    fn round_trips_a_frame_with_a_body() {
        let frame = sample(b"hi!");
        let encoded = frame.encode().unwrap();
        assert_eq!(encoded.len(), HEADER_SIZE + 3);
        let decoded = Frame::parse(&encoded).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn round_trips_a_header_only_frame() {
        let frame = Frame::header_only(FrameType::HelloAck, PeerName::default(), PeerName::default(), 0);
        let encoded = frame.encode().unwrap();
        assert_eq!(encoded.len(), HEADER_SIZE);
        assert_eq!(Frame::parse(&encoded).unwrap(), frame);
    }

    #[test]
    fn check_reports_incomplete_below_header_size() {
        let buf = vec![0u8; 49];
        assert!(matches!(Frame::check(&buf), Err(Error::Incomplete)));
    }

    #[test]
    fn check_is_exact_at_header_boundary_for_empty_body() {
        let frame = Frame::header_only(FrameType::HelloAck, PeerName::default(), PeerName::default(), 0);
        let encoded = frame.encode().unwrap();
        assert_eq!(Frame::check(&encoded).unwrap(), HEADER_SIZE);
    }

    #[test]
    fn check_reports_incomplete_until_full_body_present() {
        let frame = sample(b"hello world");
        let encoded = frame.encode().unwrap();
        assert!(matches!(Frame::check(&encoded[..HEADER_SIZE + 3]), Err(Error::Incomplete)));
        assert_eq!(Frame::check(&encoded).unwrap(), encoded.len());
    }

    #[test]
    fn client_list_body_joins_nul_terminated_names() {
        let body = client_list_body(vec![PeerName::try_from("alice").unwrap()]);
        assert_eq!(body.as_ref(), b"alice\0");
    }

    #[test]
    fn unrecognized_type_still_decodes_with_no_known_kind() {
        let mut frame = sample(b"");
        frame.frame_type = 0xBEEF;
        let encoded = frame.encode().unwrap();
        let decoded = Frame::parse(&encoded).unwrap();
        assert_eq!(decoded.kind(), None);
    }
}
