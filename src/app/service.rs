//! Application service: the hexagonal core.
//!
//! [`NodeService`] owns the FSM and the node context. It brings the
//! peripherals up once, then drives the wake/measure/report/sleep cycle
//! one handler at a time.
//!
//! ```text
//!  I2c / SpiDevice / DelayNs ──▶ ┌───────────────────────┐ ──▶ EventSink
//!                                │      NodeService      │
//!                  PowerPort  ◀──│  FSM · drivers · codec│
//!                                └───────────────────────┘
//! ```

use log::{info, warn};

use crate::config::NodeConfig;
use crate::drivers::sx1231h::DeviceMode;
use crate::error::Result;
use crate::fsm::context::NodeContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, NodeState};
use crate::protocol::MeasurementSample;

use super::events::AppEvent;
use super::ports::{Board, EventSink, Peripherals};

// ───────────────────────────────────────────────────────────────
// NodeService
// ───────────────────────────────────────────────────────────────

pub struct NodeService<B: Board> {
    fsm: Fsm<B>,
    ctx: NodeContext<B>,
}

impl<B: Board> NodeService<B> {
    /// Construct the service in the Reset state.
    ///
    /// Does **not** touch the hardware. Call [`bring_up`](Self::bring_up)
    /// and then [`start`](Self::start).
    pub fn new(peripherals: Peripherals<B>, config: NodeConfig) -> Self {
        Self {
            fsm: Fsm::new(build_state_table(), NodeState::Reset),
            ctx: NodeContext::new(peripherals, config),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Configure the radio and load the barometer calibration.
    ///
    /// Both steps are best-effort: a radio that rejects its settings or a
    /// barometer that never reports coefficients ready is logged and the
    /// node carries on. Returns whether calibration was loaded.
    pub fn bring_up(&mut self) -> bool {
        if let Err(e) = self.configure_radio() {
            warn!("Radio bring-up failed: {}", e);
            self.ctx.sink.emit(&AppEvent::RadioSetupFailed(e));
        }
        self.load_calibration()
    }

    pub fn start(&mut self) {
        self.fsm.start();
        self.ctx.sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("NodeService started in {:?}", self.fsm.current_state());
    }

    /// Run one state handler.
    pub fn step(&mut self) {
        let from = self.fsm.step(&mut self.ctx);
        let to = self.fsm.current_state();
        if to != from {
            self.ctx.sink.emit(&AppEvent::StateChanged { from, to });
        }
    }

    /// Drive the cycle forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> NodeState {
        self.fsm.current_state()
    }

    /// Handlers executed since startup.
    pub fn step_count(&self) -> u64 {
        self.fsm.steps()
    }

    pub fn last_sample(&self) -> MeasurementSample {
        self.ctx.sample
    }

    /// Frame number the next packet will carry.
    pub fn next_frame_number(&self) -> u16 {
        self.ctx.codec.frame_counter().value()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.ctx.config
    }

    pub fn context(&self) -> &NodeContext<B> {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut NodeContext<B> {
        &mut self.ctx
    }

    // ── Internal ──────────────────────────────────────────────

    fn configure_radio(&mut self) -> Result<()> {
        let cfg = &self.ctx.config;
        let radio = &mut self.ctx.radio;
        radio.initialize(cfg.modulation)?;
        radio.set_carrier_frequency(cfg.carrier_hz)?;
        radio.set_frequency_deviation(cfg.deviation_hz)?;
        radio.set_bit_rate(cfg.bit_rate_bps)?;
        radio.set_power_level(cfg.power_level)?;
        radio.set_device_mode(DeviceMode::Sleep)?;
        info!(
            "Radio: {} Hz, {} bps, power level {}",
            cfg.carrier_hz, cfg.bit_rate_bps, cfg.power_level
        );
        Ok(())
    }

    fn load_calibration(&mut self) -> bool {
        let attempts = self.ctx.config.calibration_attempts;
        let settings = self.ctx.config.baro;

        for attempt in 1..=attempts {
            let loaded = self
                .ctx
                .baro
                .initialize(&mut self.ctx.i2c, &settings)
                .and_then(|()| self.ctx.baro.read_calibration(&mut self.ctx.i2c));
            if let Ok(cal) = loaded {
                info!("Barometer calibration loaded after {} attempt(s): {:?}", attempt, cal);
                self.ctx
                    .sink
                    .emit(&AppEvent::CalibrationLoaded { attempts: attempt });
                return true;
            }
        }

        warn!(
            "Barometer calibration unavailable after {} attempts, using zeroed coefficients",
            attempts
        );
        self.ctx
            .sink
            .emit(&AppEvent::CalibrationUnavailable { attempts });
        false
    }
}
