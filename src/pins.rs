//! GPIO / peripheral pin assignments for the sensor node board.
//!
//! Single source of truth for the wiring. `main` picks the matching
//! `peripherals.pins.gpioN` fields; keep both in step.

// ---------------------------------------------------------------------------
// Sensor bus (bit-banged I2C, open drain, external 4.7 kΩ pull-ups)
// ---------------------------------------------------------------------------

/// DPS368 (0x76) and SHT4x (0x44) share this bus.
pub const I2C_SDA_GPIO: i32 = 4;
pub const I2C_SCL_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// Radio (SX1231H on SPI2, mode 0)
// ---------------------------------------------------------------------------

pub const RADIO_SCLK_GPIO: i32 = 6;
pub const RADIO_MOSI_GPIO: i32 = 7;
pub const RADIO_MISO_GPIO: i32 = 2;
/// Chip select, driven by the SPI device driver.
pub const RADIO_NSS_GPIO: i32 = 10;

/// SPI clock for register access (Hz).
pub const RADIO_SPI_HZ: u32 = 4_000_000;
