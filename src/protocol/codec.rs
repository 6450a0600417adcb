//! Packet construction and parsing.

use super::{
    EVENT_LEN, EventType, FrameCounter, HEADER_LEN, MeasurementSample, PacketHeader, PayloadType,
    REPORT_LEN,
};
use crate::error::CodecError;

/// Builds packets for one node, owning its frame counter.
///
/// Every header consumes one frame number, whether or not the packet it
/// belongs to is ever transmitted.
#[derive(Debug, Clone)]
pub struct PacketCodec {
    node_address: u8,
    frame_counter: FrameCounter,
}

impl PacketCodec {
    pub fn new(node_address: u8) -> Self {
        Self::with_counter(node_address, FrameCounter::default())
    }

    pub fn with_counter(node_address: u8, frame_counter: FrameCounter) -> Self {
        Self {
            node_address,
            frame_counter,
        }
    }

    pub fn node_address(&self) -> u8 {
        self.node_address
    }

    pub fn frame_counter(&self) -> FrameCounter {
        self.frame_counter
    }

    pub fn generate_header(&mut self, payload_type: PayloadType, length: u8) -> PacketHeader {
        PacketHeader {
            length,
            source_address: self.node_address,
            payload_type: payload_type as u8,
            frame_number: self.frame_counter.next(),
        }
    }

    pub fn build_event_packet(&mut self, event: EventType, argument: u8) -> [u8; EVENT_LEN] {
        let header = self.generate_header(PayloadType::Event, EVENT_LEN as u8);
        let mut packet = [0u8; EVENT_LEN];
        packet[..HEADER_LEN].copy_from_slice(&header.to_bytes());
        packet[5] = event as u8;
        packet[6] = argument;
        packet
    }

    /// Fixed-point report: temperature ×100 as i16, humidity and pressure
    /// truncated to whole units. Values outside a field's range wrap to
    /// its width (400 °C encodes as -25536).
    pub fn build_measurement_report(&mut self, sample: &MeasurementSample) -> [u8; REPORT_LEN] {
        let header = self.generate_header(PayloadType::MeasureReport, REPORT_LEN as u8);
        let mut packet = [0u8; REPORT_LEN];
        packet[..HEADER_LEN].copy_from_slice(&header.to_bytes());

        let centi = (sample.temperature_c * 100.0) as i32;
        packet[5..7].copy_from_slice(&(centi as i16).to_be_bytes());
        packet[7] = sample.relative_humidity as u8;
        let pressure = sample.pressure_pa as u32 & 0x00FF_FFFF;
        packet[8..11].copy_from_slice(&pressure.to_be_bytes()[1..]);
        packet
    }
}

/// A packet parsed back off the air.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet {
    Acknowledge {
        header: PacketHeader,
    },
    Event {
        header: PacketHeader,
        event: EventType,
        argument: u8,
    },
    MeasureReport {
        header: PacketHeader,
        /// Temperature in hundredths of a degree.
        temperature_centi: i16,
        humidity_pct: u8,
        pressure_pa: u32,
    },
}

impl Packet {
    pub fn header(&self) -> &PacketHeader {
        match self {
            Self::Acknowledge { header }
            | Self::Event { header, .. }
            | Self::MeasureReport { header, .. } => header,
        }
    }
}

/// Parse one packet. The length field must match both the buffer and the
/// fixed size of the payload type.
pub fn decode(bytes: &[u8]) -> Result<Packet, CodecError> {
    let header = PacketHeader::from_bytes(bytes)?;
    if usize::from(header.length) != bytes.len() {
        return Err(CodecError::LengthMismatch);
    }

    match PayloadType::try_from(header.payload_type)? {
        PayloadType::Acknowledge => {
            if bytes.len() != HEADER_LEN {
                return Err(CodecError::LengthMismatch);
            }
            Ok(Packet::Acknowledge { header })
        }
        PayloadType::Event => {
            if bytes.len() != EVENT_LEN {
                return Err(CodecError::LengthMismatch);
            }
            Ok(Packet::Event {
                header,
                event: EventType::try_from(bytes[5])?,
                argument: bytes[6],
            })
        }
        PayloadType::MeasureReport => {
            if bytes.len() != REPORT_LEN {
                return Err(CodecError::LengthMismatch);
            }
            Ok(Packet::MeasureReport {
                header,
                temperature_centi: i16::from_be_bytes([bytes[5], bytes[6]]),
                humidity_pct: bytes[7],
                pressure_pa: u32::from_be_bytes([0, bytes[8], bytes[9], bytes[10]]),
            })
        }
    }
}
