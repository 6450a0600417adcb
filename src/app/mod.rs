//! Application core: the node cycle, independent of any platform.
//!
//! All interaction with the platform happens through the `embedded-hal`
//! traits and the **port traits** defined in [`ports`], keeping this layer
//! fully testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
