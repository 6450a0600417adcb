//! Port traits: the boundary between the node cycle and the platform.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ NodeService (domain)
//! ```
//!
//! Buses and delays use the `embedded-hal` traits directly. The remaining
//! platform concerns (wake alarm and sleep, event output, persisted
//! configuration) are expressed here, so the whole cycle runs on the host
//! against simulated adapters.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use embedded_hal::spi::SpiDevice;

use crate::config::NodeConfig;

// ───────────────────────────────────────────────────────────────
// Board (type bundle)
// ───────────────────────────────────────────────────────────────

/// The concrete adapter set one build of the node runs on.
pub trait Board {
    /// Shared sensor bus (barometer + humidity sensor).
    type I2c: I2c;
    /// Radio chip-select device.
    type Spi: SpiDevice;
    type Delay: DelayNs;
    type Power: PowerPort;
    type Sink: EventSink;
}

/// Adapter instances handed to [`NodeService::new`](super::service::NodeService::new).
pub struct Peripherals<B: Board> {
    pub i2c: B::I2c,
    pub spi: B::Spi,
    pub delay: B::Delay,
    pub power: B::Power,
    pub sink: B::Sink,
}

// ───────────────────────────────────────────────────────────────
// Power port (domain → wake alarm / low-power mode)
// ───────────────────────────────────────────────────────────────

/// Wake alarm and low-power entry.
///
/// The alarm is programmed once per cycle by the Report (or MeasureFail)
/// handler and armed only around the actual sleep.
pub trait PowerPort {
    /// Program the alarm to fire `secs` from now.
    fn schedule_wake(&mut self, secs: u32);

    fn arm_wake_alarm(&mut self);

    /// Enter low-power mode. Returns after any wake source fires.
    fn sleep_until_interrupt(&mut self);

    fn disarm_wake_alarm(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the node configuration.
///
/// Implementations MUST validate before persisting and reject invalid
/// values with [`ConfigError::ValidationFailed`] instead of clamping.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`NodeConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<NodeConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &NodeConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
