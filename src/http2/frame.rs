//! The fixed 9-octet frame header.
//!
//! ```text
//! +-----------------------------------------------+
//! |                 Length (24)                   |
//! +---------------+---------------+---------------+
//! |   Type (8)    |   Flags (8)   |
//! +-+-------------+---------------+-------------------------------+
//! |R|                 Stream Identifier (31)                      |
//! +=+=============================================================+
//! |                   Frame Payload (0...)                      ...
//! +---------------------------------------------------------------+
//! ```

use std::fmt;

use crate::http2::registry::{describe_frame_type, flag_names, flags, FrameType};

pub const FRAME_HEADER_LEN: usize = 9;

/// Largest value the 24-bit length field can carry.
pub const MAX_LENGTH: u32 = (1 << 24) - 1;

/// Clears the reserved bit of a stream identifier.
pub const STREAM_ID_MASK: u32 = 0x7FFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub length: u32,
    pub frame_type: u8,
    pub flags: u8,
    pub stream_id: u32,
}

impl FrameHeader {
    /// Decode a header. The reserved bit is dropped.
    pub fn decode(bytes: &[u8; FRAME_HEADER_LEN]) -> Self {
        Self {
            length: read_u24(&bytes[..3]),
            frame_type: bytes[3],
            flags: bytes[4],
            stream_id: u32::from_be_bytes([bytes[5], bytes[6], bytes[7], bytes[8]]) & STREAM_ID_MASK,
        }
    }

    /// Encode a header with the reserved bit clear.
    ///
    /// `length` must fit in 24 bits.
    pub fn encode(&self) -> [u8; FRAME_HEADER_LEN] {
        debug_assert!(self.length <= MAX_LENGTH, "frame length {} exceeds 24 bits", self.length);
        let mut out = [0u8; FRAME_HEADER_LEN];
        write_u24(&mut out[..3], self.length);
        out[3] = self.frame_type;
        out[4] = self.flags;
        out[5..].copy_from_slice(&encode_stream_id(self.stream_id));
        out
    }

    pub fn kind(&self) -> Option<FrameType> {
        FrameType::from_code(self.frame_type)
    }

    pub fn is_ack(&self) -> bool {
        matches!(self.kind(), Some(FrameType::Settings | FrameType::Ping))
            && self.flags & flags::ACK != 0
    }
}

impl fmt::Display for FrameHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} length={} flags=[{}] stream={}",
            describe_frame_type(self.frame_type),
            self.length,
            flag_names(self.frame_type, self.flags).join("|"),
            self.stream_id
        )
    }
}

/// `b[0] << 16 | b[1] << 8 | b[2]`
pub fn read_u24(bytes: &[u8]) -> u32 {
    u32::from(bytes[0]) << 16 | u32::from(bytes[1]) << 8 | u32::from(bytes[2])
}

fn write_u24(out: &mut [u8], value: u32) {
    out[0] = (value >> 16) as u8;
    out[1] = (value >> 8) as u8;
    out[2] = value as u8;
}

/// Four big-endian octets with the reserved bit clear.
pub fn encode_stream_id(stream_id: u32) -> [u8; 4] {
    (stream_id & STREAM_ID_MASK).to_be_bytes()
}

/// Acknowledge a peer's SETTINGS frame on `stream_id`.
pub fn settings_ack(stream_id: u32) -> Vec<u8> {
    FrameHeader {
        length: 0,
        frame_type: FrameType::Settings.code(),
        flags: flags::ACK,
        stream_id,
    }
    .encode()
    .to_vec()
}
