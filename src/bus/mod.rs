//! Blocking bus transport shared by every device driver.
//!
//! | Module | Provides                | Used by                       |
//! |--------|-------------------------|-------------------------------|
//! | `i2c`  | [`I2cMaster`] over any [`I2cLink`] | barometer, humidity sensor |
//! | `spi`  | [`RegisterBus`] framing | radio                         |
//!
//! Both sides are fully synchronous: the caller blocks until every byte has
//! been exchanged. Every wait on the wire is bounded and surfaces as
//! [`BusError::Timeout`](crate::error::BusError::Timeout) rather than a hang.

pub mod i2c;
pub mod spi;

pub use i2c::{I2cLink, I2cMaster, SoftI2c};
pub use spi::{Access, RegisterBus};
