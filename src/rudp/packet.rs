// ABOUTME: Wire codec for the four RUDP packet variants
// ABOUTME: every field is a single byte or a raw payload slice; no endianness conversions needed

use bytes::Bytes;
use thiserror::Error;

pub const RRQ_SIZE: usize = 22;
pub const FILENAME_FIELD_SIZE: usize = 20;
pub const DATA_SIZE: usize = 512;
pub const MAX_DATA_PACKET_SIZE: usize = 2 + DATA_SIZE;
pub const ACK_SIZE: usize = 2;
pub const ERROR_SIZE: usize = 1;

const TYPE_RRQ: u8 = 1;
const TYPE_DATA: u8 = 2;
const TYPE_ACK: u8 = 3;
const TYPE_ERROR: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Rrq { window_size: u8, filename: String },
    Data { seqno: u8, payload: Bytes },
    Ack { seqno: u8 },
    Error,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("packet too short: {len} bytes")]
    TooShort { len: usize },
    #[error("unknown packet type byte {0}")]
    UnknownType(u8),
    #[error("filename does not fit in a {FILENAME_FIELD_SIZE}-byte field with its NUL terminator")]
    FilenameTooLong,
    #[error("filename field has no NUL terminator")]
    FilenameNotTerminated,
    #[error("DATA payload of {len} bytes exceeds the {DATA_SIZE}-byte chunk size")]
    PayloadTooLong { len: usize },
}

impl Packet {
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        if buf.is_empty() {
            return Err(PacketError::TooShort { len: 0 });
        }
        match buf[0] {
            TYPE_RRQ => {
                if buf.len() != RRQ_SIZE {
                    return Err(PacketError::TooShort { len: buf.len() });
                }
                let window_size = buf[1];
                let field = &buf[2..2 + FILENAME_FIELD_SIZE];
                let nul = field
                    .iter()
                    .position(|&b| b == 0)
                    .ok_or(PacketError::FilenameNotTerminated)?;
                let filename = std::str::from_utf8(&field[..nul])
                    .map_err(|_| PacketError::FilenameNotTerminated)?
                    .to_string();
                Ok(Packet::Rrq { window_size, filename })
            }
            TYPE_DATA => {
                if buf.len() < 3 || buf.len() > MAX_DATA_PACKET_SIZE {
                    return Err(PacketError::TooShort { len: buf.len() });
                }
                let seqno = buf[1];
                let payload = Bytes::copy_from_slice(&buf[2..]);
                Ok(Packet::Data { seqno, payload })
            }
            TYPE_ACK => {
                if buf.len() != ACK_SIZE {
                    return Err(PacketError::TooShort { len: buf.len() });
                }
                Ok(Packet::Ack { seqno: buf[1] })
            }
            TYPE_ERROR => {
                if buf.len() != ERROR_SIZE {
                    return Err(PacketError::TooShort { len: buf.len() });
                }
                Ok(Packet::Error)
            }
            other => Err(PacketError::UnknownType(other)),
        }
    }

    pub fn encode(&self) -> Result<Bytes, PacketError> {
        match self {
            Packet::Rrq { window_size, filename } => {
                if filename.len() + 1 > FILENAME_FIELD_SIZE {
                    return Err(PacketError::FilenameTooLong);
                }
                let mut buf = vec![0u8; RRQ_SIZE];
                buf[0] = TYPE_RRQ;
                buf[1] = *window_size;
                buf[2..2 + filename.len()].copy_from_slice(filename.as_bytes());
                // byte after the filename is left zero, serving as the NUL terminator
                Ok(Bytes::from(buf))
            }
            Packet::Data { seqno, payload } => {
                if payload.len() > DATA_SIZE || payload.is_empty() {
                    return Err(PacketError::PayloadTooLong { len: payload.len() });
                }
                let mut buf = Vec::with_capacity(2 + payload.len());
                buf.push(TYPE_DATA);
                buf.push(*seqno);
                buf.extend_from_slice(payload);
                Ok(Bytes::from(buf))
            }
            Packet::Ack { seqno } => Ok(Bytes::from(vec![TYPE_ACK, *seqno])),
            Packet::Error => Ok(Bytes::from(vec![TYPE_ERROR])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_rrq() {
        let pkt = Packet::Rrq { window_size: 4, filename: "a.bin".to_string() };
        let encoded = pkt.encode().unwrap();
        assert_eq!(encoded.len(), RRQ_SIZE);
        assert_eq!(Packet::decode(&encoded).unwrap(), pkt);
    }

    #[test]
    fn rrq_filename_must_leave_room_for_nul() {
        let pkt = Packet::Rrq { window_size: 1, filename: "x".repeat(19) };
        assert_eq!(pkt.encode().unwrap_err(), PacketError::FilenameTooLong);
    }

    #[test]
    fn round_trips_data() {
        let pkt = Packet::Data { seqno: 3, payload: Bytes::from_static(b"hello") };
        let encoded = pkt.encode().unwrap();
        assert_eq!(encoded.len(), 7);
        assert_eq!(Packet::decode(&encoded).unwrap(), pkt);
    }

    #[test]
    fn round_trips_ack_and_error() {
        let ack = Packet::Ack { seqno: 9 };
        assert_eq!(Packet::decode(&ack.encode().unwrap()).unwrap(), ack);
        assert_eq!(Packet::decode(&Packet::Error.encode().unwrap()).unwrap(), Packet::Error);
    }

    #[test]
    fn rejects_unknown_type_byte() {
        assert_eq!(Packet::decode(&[0xEE]).unwrap_err(), PacketError::UnknownType(0xEE));
    }

    #[test]
    fn rrq_without_nul_terminator_is_rejected() {
        let mut buf = vec![TYPE_RRQ, 1];
        buf.extend_from_slice(&[b'x'; FILENAME_FIELD_SIZE]); // no NUL anywhere in the field
        assert_eq!(Packet::decode(&buf).unwrap_err(), PacketError::FilenameNotTerminated);
    }
}
