//! SHT4x humidity / temperature sensor (I2C).
//!
//! The sensor has no registers: a single command byte starts a
//! measurement, and a plain 6-byte read returns
//! `[T_msb, T_lsb, T_crc, RH_msb, RH_lsb, RH_crc]`. While a conversion is
//! running the sensor does not acknowledge its address, so callers poll
//! [`Sht4x::read_results`] until it succeeds.

use embedded_hal::i2c::I2c;
use serde::{Deserialize, Serialize};

use crate::error::{BusError, Result};

pub const ADDRESS: u8 = 0x44;

/// Measurement command: precision, optionally preceded by a heater pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Precision {
    LowNoHeater = 0xE0,
    MediumNoHeater = 0xF6,
    HighNoHeater = 0xFD,
    High20mW100ms = 0x15,
    High20mW1s = 0x1E,
    High110mW100ms = 0x24,
    High110mW1s = 0x2F,
    High200mW100ms = 0x32,
    High200mW1s = 0x39,
}

/// Raw conversion result as read off the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReading {
    pub temperature: u16,
    pub humidity: u16,
    /// Both CRC bytes matched their data words.
    pub checksums_valid: bool,
}

impl RawReading {
    /// Decode the 6-byte response frame.
    pub fn from_frame(frame: &[u8; 6]) -> Self {
        let checksums_valid = sensirion_i2c::crc8::calculate(&frame[0..2]) == frame[2]
            && sensirion_i2c::crc8::calculate(&frame[3..5]) == frame[5];
        Self {
            temperature: u16::from_be_bytes([frame[0], frame[1]]),
            humidity: u16::from_be_bytes([frame[3], frame[4]]),
            checksums_valid,
        }
    }

    pub fn temperature_c(&self) -> f32 {
        temperature_c(self.temperature)
    }

    pub fn relative_humidity(&self) -> f32 {
        relative_humidity(self.humidity)
    }
}

pub fn temperature_c(raw: u16) -> f32 {
    f32::from(raw) / 65535.0 * 175.0 - 45.0
}

pub fn temperature_f(raw: u16) -> f32 {
    f32::from(raw) / 65535.0 * 315.0 - 49.0
}

/// Relative humidity in %, clamped to the physical range.
pub fn relative_humidity(raw: u16) -> f32 {
    (f32::from(raw) / 65535.0 * 125.0 - 6.0).clamp(0.0, 100.0)
}

pub struct Sht4x {
    address: u8,
}

impl Default for Sht4x {
    fn default() -> Self {
        Self::new()
    }
}

impl Sht4x {
    pub fn new() -> Self {
        Self { address: ADDRESS }
    }

    pub fn with_address(address: u8) -> Self {
        Self { address }
    }

    pub fn request_measurement<I2C: I2c>(&mut self, i2c: &mut I2C, precision: Precision) -> Result<()> {
        i2c.write(self.address, &[precision as u8])
            .map_err(|e| BusError::from_i2c(&e).into())
    }

    /// Read the last conversion. A NACK means the conversion is still running.
    pub fn read_results<I2C: I2c>(&mut self, i2c: &mut I2C) -> Result<RawReading> {
        let mut frame = [0u8; 6];
        i2c.read(self.address, &mut frame)
            .map_err(|e| BusError::from_i2c(&e))?;
        Ok(RawReading::from_frame(&frame))
    }
}
