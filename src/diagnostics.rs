//! Diagnostic text lines.
//!
//! One human-readable line per measurement and per packet, written to the
//! serial console by the log adapter. The format is observational only
//! and not part of the wire contract.

use core::fmt::Write;

use heapless::String;

use crate::protocol::{MeasurementSample, PayloadType};

/// Capacity of one measurement line.
pub const MEASUREMENT_LINE_LEN: usize = 96;
/// Capacity of one packet line (header fields + raw bytes of the
/// largest packet).
pub const PACKET_LINE_LEN: usize = 128;

/// `Measurement | Temperature: 21.5 C | Humidity: 40 % | Pressure: 101325 Pa`
///
/// Temperature is truncated to hundredths, with the fraction left out
/// when it is zero. Humidity and pressure are truncated to integers.
pub fn format_measurement_line(sample: &MeasurementSample) -> String<MEASUREMENT_LINE_LEN> {
    let mut line = String::new();
    let centi = (sample.temperature_c * 100.0) as i32;
    let sign = if centi < 0 { "-" } else { "" };
    let whole = centi.unsigned_abs() / 100;
    let frac = centi.unsigned_abs() % 100;

    let _ = write!(line, "Measurement | Temperature: {}{}", sign, whole);
    if frac != 0 {
        let _ = write!(line, ".{:02}", frac);
    }
    let _ = write!(
        line,
        " C | Humidity: {} % | Pressure: {} Pa",
        sample.relative_humidity as u32, sample.pressure_pa as u32
    );
    line
}

/// Name of a payload type tag, `UNKNOWN` for anything unassigned.
pub fn payload_type_name(tag: u8) -> &'static str {
    PayloadType::try_from(tag).map_or("UNKNOWN", PayloadType::name)
}

/// `Packet | Length: 7 | Address: 1 | Type: EVENT | Frame #: 0 | Raw: 07 01 01 00 00 00 00`
pub fn format_packet_line(packet: &[u8]) -> String<PACKET_LINE_LEN> {
    let byte = |i: usize| packet.get(i).copied().unwrap_or(0);
    let frame = u16::from_be_bytes([byte(3), byte(4)]);

    let mut line = String::new();
    let _ = write!(
        line,
        "Packet | Length: {} | Address: {} | Type: {} | Frame #: {} | Raw:",
        byte(0),
        byte(1),
        payload_type_name(byte(2)),
        frame
    );
    for b in packet {
        let _ = write!(line, " {:02X}", b);
    }
    line
}
