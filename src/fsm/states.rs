//! Concrete state handler functions and table builder.
//!
//! ```text
//!  RESET ──▶ MEASURE ──[sample stored]──▶ REPORT ──▶ SLEEP
//!               ▲  │                                   │
//!               │  └──[timeout / bus error]──▶ MEASURE_FAIL
//!               │                                │     │
//!               │                                └──▶──┤
//!               └───────────────[wake]─────────────────┘
//! ```
//!
//! Every handler returns a state other than its own, so each step of the
//! engine makes progress. The only place the node waits indefinitely is
//! inside [`PowerPort::sleep_until_interrupt`].

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use super::context::NodeContext;
use super::{NodeState, StateDescriptor};
use crate::app::events::AppEvent;
use crate::app::ports::{Board, EventSink, PowerPort};
use crate::drivers::dps368::{self, Mode, ResultStatus};
use crate::drivers::sht4x::RawReading;
use crate::error::{BusError, Error, Result, SensorError};
use crate::protocol::{EventType, MeasurementSample};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table. Called once at startup.
pub fn build_state_table<B: Board>() -> [StateDescriptor<B>; NodeState::COUNT] {
    [
        // Index 0: Reset
        StateDescriptor {
            id: NodeState::Reset,
            name: "Reset",
            handler: on_reset,
        },
        // Index 1: Measure
        StateDescriptor {
            id: NodeState::Measure,
            name: "Measure",
            handler: do_measure,
        },
        // Index 2: Report
        StateDescriptor {
            id: NodeState::Report,
            name: "Report",
            handler: do_report,
        },
        // Index 3: MeasureFail
        StateDescriptor {
            id: NodeState::MeasureFail,
            name: "MeasureFail",
            handler: on_measure_fail,
        },
        // Index 4: Sleep
        StateDescriptor {
            id: NodeState::Sleep,
            name: "Sleep",
            handler: do_sleep,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  RESET state: announce the power-up on air
// ═══════════════════════════════════════════════════════════════════════════

fn on_reset<B: Board>(ctx: &mut NodeContext<B>) -> NodeState {
    let packet = ctx.codec.build_event_packet(EventType::Reset, 0x00);
    info!("RESET: announcing node 0x{:02X}", ctx.codec.node_address());
    transmit(ctx, &packet);
    ctx.delay.delay_ms(ctx.config.reset_settle_ms);
    NodeState::Measure
}

// ═══════════════════════════════════════════════════════════════════════════
//  MEASURE state: one conversion on each sensor
// ═══════════════════════════════════════════════════════════════════════════

fn do_measure<B: Board>(ctx: &mut NodeContext<B>) -> NodeState {
    match acquire(ctx) {
        Ok(sample) => {
            ctx.sample = sample;
            ctx.last_failure = None;
            NodeState::Report
        }
        Err(e) => {
            ctx.last_failure = Some(e);
            NodeState::MeasureFail
        }
    }
}

fn acquire<B: Board>(ctx: &mut NodeContext<B>) -> Result<MeasurementSample> {
    let attempts = ctx.config.status_poll_attempts;
    let interval = ctx.config.poll_interval_ms;

    ctx.humidity
        .request_measurement(&mut ctx.i2c, ctx.config.humidity_precision)?;
    if ctx.config.baro.fifo {
        ctx.baro.clear_fifo(&mut ctx.i2c)?;
    }
    ctx.baro.set_mode(&mut ctx.i2c, Mode::ContinuousBoth)?;
    ctx.delay.delay_ms(ctx.config.measure_settle_ms);

    let mut ready = false;
    for _ in 0..attempts {
        if ctx.baro.result_status(&mut ctx.i2c) == ResultStatus::BothReady {
            ready = true;
            break;
        }
        ctx.delay.delay_ms(interval);
    }
    if !ready {
        warn!("MEASURE: barometer not ready after {} polls", attempts);
        return Err(SensorError::ResultTimeout.into());
    }

    ctx.baro.set_mode(&mut ctx.i2c, Mode::Idle)?;
    let (raw_pressure, raw_temperature) = if ctx.config.baro.fifo {
        // FIFO entries arrive in conversion order, tagged by bit 0.
        ctx.baro.read_fifo_pair(&mut ctx.i2c)?
    } else {
        // PSR_B2..TMP_B0: [pressure, temperature]
        let mut raw = [0u32; 2];
        ctx.baro
            .read_results(&mut ctx.i2c, dps368::reg::PSR_B2, &mut raw)?;
        (raw[0], raw[1])
    };
    let pressure_pa = ctx.baro.compensate_pressure(raw_pressure, raw_temperature);

    let reading = poll_humidity(ctx)?;
    if !reading.checksums_valid {
        warn!("MEASURE: humidity checksum mismatch, keeping sample");
        ctx.sink.emit(&AppEvent::HumidityChecksumMismatch);
    }

    Ok(MeasurementSample {
        temperature_c: reading.temperature_c(),
        relative_humidity: reading.relative_humidity(),
        pressure_pa,
    })
}

/// The humidity sensor NACKs its address until the conversion is done.
fn poll_humidity<B: Board>(ctx: &mut NodeContext<B>) -> Result<RawReading> {
    let attempts = ctx.config.humidity_poll_attempts;
    for _ in 0..attempts {
        match ctx.humidity.read_results(&mut ctx.i2c) {
            Ok(reading) => return Ok(reading),
            Err(Error::Bus(BusError::NoAcknowledge)) => {
                ctx.delay.delay_ms(ctx.config.poll_interval_ms);
            }
            Err(e) => return Err(e),
        }
    }
    warn!("MEASURE: humidity result not ready after {} polls", attempts);
    Err(SensorError::ResultTimeout.into())
}

// ═══════════════════════════════════════════════════════════════════════════
//  REPORT state: send the sample, program the next wake-up
// ═══════════════════════════════════════════════════════════════════════════

fn do_report<B: Board>(ctx: &mut NodeContext<B>) -> NodeState {
    let packet = ctx.codec.build_measurement_report(&ctx.sample);
    ctx.sink.emit(&AppEvent::Measurement(ctx.sample));
    transmit(ctx, &packet);
    prepare_sleep(ctx);
    NodeState::Sleep
}

// ═══════════════════════════════════════════════════════════════════════════
//  MEASURE_FAIL state: abandon this cycle, try again next wake-up
// ═══════════════════════════════════════════════════════════════════════════

fn on_measure_fail<B: Board>(ctx: &mut NodeContext<B>) -> NodeState {
    let cause = ctx
        .last_failure
        .take()
        .unwrap_or(Error::Sensor(SensorError::ResultTimeout));
    warn!("MEASURE_FAIL: {}", cause);

    if let Err(e) = ctx.baro.set_mode(&mut ctx.i2c, Mode::Idle) {
        debug!("MEASURE_FAIL: barometer idle failed: {}", e);
    }
    ctx.sink.emit(&AppEvent::MeasureFailed(cause));
    prepare_sleep(ctx);
    NodeState::Sleep
}

// ═══════════════════════════════════════════════════════════════════════════
//  SLEEP state
// ═══════════════════════════════════════════════════════════════════════════

fn do_sleep<B: Board>(ctx: &mut NodeContext<B>) -> NodeState {
    ctx.power.arm_wake_alarm();
    ctx.power.sleep_until_interrupt();
    ctx.power.disarm_wake_alarm();
    NodeState::Measure
}

// ═══════════════════════════════════════════════════════════════════════════
//  Helpers
// ═══════════════════════════════════════════════════════════════════════════

/// Queue one packet and wait for the radio to finish with it.
///
/// Failures are reported and swallowed; a lost packet never stalls the
/// cycle.
fn transmit<B: Board>(ctx: &mut NodeContext<B>, packet: &[u8]) {
    if let Ok(bytes) = heapless::Vec::from_slice(packet) {
        ctx.sink.emit(&AppEvent::PacketQueued(bytes));
    }

    let sent = ctx.radio.write_packet(packet).and_then(|()| {
        ctx.radio.wait_transmit_complete(
            &mut ctx.delay,
            ctx.config.tx_poll_attempts,
            ctx.config.poll_interval_ms,
        )
    });
    if let Err(e) = sent {
        warn!("Radio: packet not sent: {}", e);
        ctx.sink.emit(&AppEvent::TransmitFailed(e));
    }
}

/// Drain diagnostics and program the wake alarm.
fn prepare_sleep<B: Board>(ctx: &mut NodeContext<B>) {
    log::logger().flush();
    ctx.power.schedule_wake(ctx.config.sample_interval_secs);
}
