//! Node configuration parameters
//!
//! Static settings for one sensor node: its address on air, how often it
//! wakes, radio and sensor setup, and the poll budgets that keep every
//! wait bounded. Values can be overridden via NVS.

use serde::{Deserialize, Serialize};

use crate::drivers::dps368::BaroSettings;
use crate::drivers::sht4x::Precision;
use crate::drivers::sx1231h::{MAX_POWER_LEVEL, Modulation};
use crate::error::{Error, Result};

/// Lowest carrier the SX1231H synthesizer covers (Hz).
pub const MIN_CARRIER_HZ: u32 = 290_000_000;
/// Highest carrier the SX1231H synthesizer covers (Hz).
pub const MAX_CARRIER_HZ: u32 = 1_020_000_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Identity ---
    /// Source address stamped into every packet header
    pub node_address: u8,
    /// Time between wake-ups (seconds)
    pub sample_interval_secs: u32,

    // --- Radio ---
    pub carrier_hz: u32,
    pub deviation_hz: u32,
    pub bit_rate_bps: u32,
    /// Transmit power level (0-23)
    pub power_level: u8,
    pub modulation: Modulation,

    // --- Sensors ---
    pub baro: BaroSettings,
    pub humidity_precision: Precision,
    /// Bring-up rounds of barometer init + calibration read
    pub calibration_attempts: u16,

    // --- Timing ---
    /// Barometer result-ready polls per measurement
    pub status_poll_attempts: u32,
    /// Humidity result polls per measurement
    pub humidity_poll_attempts: u32,
    /// Radio transmit-done polls per packet
    pub tx_poll_attempts: u32,
    /// Gap between two polls (milliseconds)
    pub poll_interval_ms: u32,
    /// Delay between starting conversions and the first poll (milliseconds)
    pub measure_settle_ms: u32,
    /// Delay after the reset event packet (milliseconds)
    pub reset_settle_ms: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Identity
            node_address: 0x01,
            sample_interval_secs: 60,

            // Radio: 432.95 MHz OOK, 2.4 kbps
            carrier_hz: 432_950_000,
            deviation_hz: 600,
            bit_rate_bps: 2_400,
            power_level: 22,
            modulation: Modulation::OokFilter2Br,

            // Sensors
            baro: BaroSettings::default(),
            humidity_precision: Precision::HighNoHeater,
            calibration_attempts: 255,

            // Timing
            status_poll_attempts: 200,
            humidity_poll_attempts: 50,
            tx_poll_attempts: 100,
            poll_interval_ms: 10,
            measure_settle_ms: 10,
            reset_settle_ms: 500,
        }
    }
}

impl NodeConfig {
    /// Range-check every field.
    pub fn validate(&self) -> Result<()> {
        if self.sample_interval_secs == 0 {
            return Err(Error::Config("sample interval must be non-zero"));
        }
        if !(MIN_CARRIER_HZ..=MAX_CARRIER_HZ).contains(&self.carrier_hz) {
            return Err(Error::Config("carrier frequency out of band"));
        }
        if self.bit_rate_bps == 0 {
            return Err(Error::Config("bit rate must be non-zero"));
        }
        if self.power_level > MAX_POWER_LEVEL {
            return Err(Error::Config("power level above 23"));
        }
        if self.calibration_attempts == 0 {
            return Err(Error::Config("calibration attempts must be non-zero"));
        }
        if self.status_poll_attempts == 0
            || self.humidity_poll_attempts == 0
            || self.tx_poll_attempts == 0
        {
            return Err(Error::Config("poll budgets must be non-zero"));
        }
        Ok(())
    }
}
