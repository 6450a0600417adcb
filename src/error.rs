//! Unified error types for the sensor node firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the state
//! machine handles failures uniformly. All variants are `Copy` so they can
//! be stored in the node context and passed through events without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An I2C or SPI transaction failed.
    Bus(BusError),
    /// A sensor was not ready or never produced a result.
    Sensor(SensorError),
    /// The transceiver rejected a request or never finished transmitting.
    Radio(RadioError),
    /// A packet could not be encoded or decoded.
    Codec(CodecError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Radio(e) => write!(f, "radio: {e}"),
            Self::Codec(e) => write!(f, "codec: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The addressed device did not acknowledge the address or a data byte.
    NoAcknowledge,
    /// A peripheral status flag never cleared within the poll budget.
    Timeout,
    /// Any other failure reported by the underlying HAL.
    Transport,
}

impl BusError {
    /// Classify an `embedded-hal` I2C error.
    pub fn from_i2c<E: embedded_hal::i2c::Error>(e: &E) -> Self {
        match e.kind() {
            embedded_hal::i2c::ErrorKind::NoAcknowledge(_) => Self::NoAcknowledge,
            _ => Self::Transport,
        }
    }

    /// Classify an `embedded-hal` SPI error. SPI has no acknowledge, so
    /// every failure is a transport failure.
    pub fn from_spi<E: embedded_hal::spi::Error>(_e: &E) -> Self {
        Self::Transport
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAcknowledge => write!(f, "no acknowledge"),
            Self::Timeout => write!(f, "peripheral timeout"),
            Self::Transport => write!(f, "transport failure"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The barometer has not yet flagged its calibration coefficients ready.
    CoefficientsNotReady,
    /// A measurement never became available within the poll budget.
    ResultTimeout,
    /// The result FIFO did not hold one pressure and one temperature entry.
    FifoUnpaired,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CoefficientsNotReady => write!(f, "calibration coefficients not ready"),
            Self::ResultTimeout => write!(f, "measurement result timeout"),
            Self::FifoUnpaired => write!(f, "FIFO entries not a pressure/temperature pair"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Radio errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// The payload does not fit the transceiver FIFO.
    PayloadTooLarge,
    /// A bit rate of zero was requested.
    InvalidBitRate,
    /// The radio never reported the packet as sent.
    TransmitTimeout,
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadTooLarge => write!(f, "payload exceeds FIFO"),
            Self::InvalidBitRate => write!(f, "invalid bit rate"),
            Self::TransmitTimeout => write!(f, "transmit timeout"),
        }
    }
}

impl From<RadioError> for Error {
    fn from(e: RadioError) -> Self {
        Self::Radio(e)
    }
}

// ---------------------------------------------------------------------------
// Codec errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Fewer bytes than the packet layout requires.
    Truncated,
    /// The header length field disagrees with the packet kind.
    LengthMismatch,
    /// The payload type tag is not one this node understands.
    UnknownPayloadType(u8),
    /// The event type tag is not one this node understands.
    UnknownEventType(u8),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "packet truncated"),
            Self::LengthMismatch => write!(f, "length field mismatch"),
            Self::UnknownPayloadType(t) => write!(f, "unknown payload type 0x{t:02X}"),
            Self::UnknownEventType(t) => write!(f, "unknown event type 0x{t:02X}"),
        }
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
