//! Sub-GHz environmental sensor node firmware library.
//!
//! Exposes the node cycle, drivers and packet codec for integration
//! testing and gateway-side decoding. All ESP-IDF-specific code is
//! guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod bus;
pub mod config;
pub mod diagnostics;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod pins;
pub mod protocol;
