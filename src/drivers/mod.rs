//! Peripheral drivers: barometer, humidity sensor, and radio.

pub mod dps368;
pub mod sht4x;
pub mod sx1231h;
