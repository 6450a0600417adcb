//! Shared mutable context threaded through every FSM handler.
//!
//! `NodeContext` owns the buses, the drivers, the packet codec and the
//! most recent sample. Each piece of shared state has exactly one writer:
//! the Measure handler writes `sample`, the codec advances its own frame
//! counter.

use crate::app::ports::{Board, Peripherals};
use crate::config::NodeConfig;
use crate::drivers::dps368::Dps368;
use crate::drivers::sht4x::Sht4x;
use crate::drivers::sx1231h::Sx1231h;
use crate::error::Error;
use crate::protocol::{MeasurementSample, PacketCodec};

pub struct NodeContext<B: Board> {
    // -- Buses and platform --
    pub i2c: B::I2c,
    pub radio: Sx1231h<B::Spi>,
    pub delay: B::Delay,
    pub power: B::Power,
    pub sink: B::Sink,

    // -- Sensors --
    pub baro: Dps368,
    pub humidity: Sht4x,

    // -- Protocol --
    pub codec: PacketCodec,

    // -- Configuration --
    pub config: NodeConfig,

    // -- Cycle data --
    /// Latest sample, overwritten every successful Measure.
    pub sample: MeasurementSample,
    /// Why the last Measure gave up, consumed by MeasureFail.
    pub last_failure: Option<Error>,
}

impl<B: Board> NodeContext<B> {
    pub fn new(peripherals: Peripherals<B>, config: NodeConfig) -> Self {
        let Peripherals {
            i2c,
            spi,
            delay,
            power,
            sink,
        } = peripherals;
        Self {
            i2c,
            radio: Sx1231h::new(spi),
            delay,
            power,
            sink,
            baro: Dps368::new(),
            humidity: Sht4x::new(),
            codec: PacketCodec::new(config.node_address),
            config,
            sample: MeasurementSample::default(),
            last_failure: None,
        }
    }
}
