//! Over-the-air packet format.
//!
//! Every packet starts with the same five-byte header:
//! ```text
//! ┌────────┬─────────┬──────────────┬───────────┬───────────┐
//! │ Length │ Source  │ Payload type │ Frame MSB │ Frame LSB │
//! └────────┴─────────┴──────────────┴───────────┴───────────┘
//! ```
//! followed by a fixed payload whose size depends on the payload type.
//! `Length` always counts the whole packet, header included.

mod codec;

pub use codec::{Packet, PacketCodec, decode};

use crate::error::CodecError;

/// Header size in bytes.
pub const HEADER_LEN: usize = 5;
/// Total size of an [`PayloadType::Event`] packet.
pub const EVENT_LEN: usize = 7;
/// Total size of a [`PayloadType::MeasureReport`] packet.
pub const REPORT_LEN: usize = 11;
/// Largest packet the node ever builds.
pub const MAX_PACKET_LEN: usize = REPORT_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PayloadType {
    Acknowledge = 0x00,
    Event = 0x01,
    MeasureReport = 0x02,
}

impl PayloadType {
    /// Name used in diagnostic output.
    pub fn name(self) -> &'static str {
        match self {
            Self::Acknowledge => "ACKNOWLEDGE",
            Self::Event => "EVENT",
            Self::MeasureReport => "MEASURE_REPORT",
        }
    }
}

impl TryFrom<u8> for PayloadType {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Acknowledge),
            0x01 => Ok(Self::Event),
            0x02 => Ok(Self::MeasureReport),
            other => Err(CodecError::UnknownPayloadType(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventType {
    Reset = 0x00,
}

impl TryFrom<u8> for EventType {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Reset),
            other => Err(CodecError::UnknownEventType(other)),
        }
    }
}

/// Node-global 16-bit packet sequence number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameCounter(u16);

impl FrameCounter {
    pub fn new(start: u16) -> Self {
        Self(start)
    }

    /// Value the next header will carry.
    pub fn value(self) -> u16 {
        self.0
    }

    /// Take the current value and advance, wrapping at 65536.
    pub fn next(&mut self) -> u16 {
        let current = self.0;
        self.0 = self.0.wrapping_add(1);
        current
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub length: u8,
    pub source_address: u8,
    pub payload_type: u8,
    pub frame_number: u16,
}

impl PacketHeader {
    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let [msb, lsb] = self.frame_number.to_be_bytes();
        [self.length, self.source_address, self.payload_type, msb, lsb]
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let Some(head) = bytes.get(..HEADER_LEN) else {
            return Err(CodecError::Truncated);
        };
        Ok(Self {
            length: head[0],
            source_address: head[1],
            payload_type: head[2],
            frame_number: u16::from_be_bytes([head[3], head[4]]),
        })
    }
}

/// One cycle's worth of sensor output.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeasurementSample {
    pub temperature_c: f32,
    /// 0-100 %.
    pub relative_humidity: f32,
    pub pressure_pa: f32,
}
