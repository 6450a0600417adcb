//! End-to-end tests for the node cycle on simulated hardware.
//!
//! Each test builds a [`NodeService`] over [`SimBoard`], runs bring-up and
//! a handful of FSM steps, then inspects what went over the buses.

use subghz_node::app::events::AppEvent;
use subghz_node::app::service::NodeService;
use subghz_node::config::NodeConfig;
use subghz_node::drivers::dps368::BaroSettings;
use subghz_node::drivers::sht4x;
use subghz_node::drivers::sx1231h::reg;
use subghz_node::error::{BusError, Error, RadioError, SensorError};
use subghz_node::fsm::NodeState;
use subghz_node::protocol::{Packet, PayloadType, decode};

use crate::mock_hw::{PowerCall, SimBoard, SimI2c, SimRadio, sim_node};

fn started(config: NodeConfig, i2c: SimI2c) -> (NodeService<SimBoard>, SimRadio) {
    let (mut node, radio) = sim_node(config, i2c);
    assert!(node.bring_up(), "calibration should load");
    node.start();
    (node, radio)
}

fn events(node: &NodeService<SimBoard>) -> &[AppEvent] {
    &node.context().sink.events
}

fn power_calls(node: &NodeService<SimBoard>) -> &[PowerCall] {
    &node.context().power.calls
}

// ── Bring-up ──────────────────────────────────────────────────

#[test]
fn bring_up_programs_radio_and_parks_it_asleep() {
    let (mut node, radio) = sim_node(NodeConfig::default(), SimI2c::new());
    assert!(node.bring_up());

    assert_eq!(radio.reg(reg::OPMODE), 0x00, "radio left in Sleep");
    assert_eq!(radio.reg(reg::DATAMODUL), 0x0A);
    let frf = [radio.reg(reg::FRF_MSB), radio.reg(reg::FRF_MSB + 1), radio.reg(reg::FRF_MSB + 2)];
    assert_eq!(frf, [0x6C, 0x3C, 0xCC]);
    assert_eq!(
        [radio.reg(reg::BITRATE_MSB), radio.reg(reg::BITRATE_MSB + 1)],
        [0x34, 0x15]
    );
    assert_eq!(radio.reg(reg::PALEVEL), 0x7E);
    assert_eq!(radio.reg(reg::OCP), 0x0F);
    assert!(radio.packets().is_empty(), "bring-up transmits nothing");

    assert_eq!(events(&node), &[AppEvent::CalibrationLoaded { attempts: 1 }]);
}

#[test]
fn calibration_retries_until_coefficients_ready() {
    let mut i2c = SimI2c::new();
    i2c.baro.coef_reads_until_ready = 3;
    let (mut node, _radio) = sim_node(NodeConfig::default(), i2c);

    assert!(node.bring_up());
    assert!(events(&node).contains(&AppEvent::CalibrationLoaded { attempts: 4 }));
    assert_ne!(node.context().baro.calibration().c0, 0);
}

#[test]
fn calibration_gives_up_after_budget() {
    let mut i2c = SimI2c::new();
    i2c.baro.coef_never_ready = true;
    let config = NodeConfig {
        calibration_attempts: 5,
        ..Default::default()
    };
    let (mut node, _radio) = sim_node(config, i2c);

    assert!(!node.bring_up());
    assert!(events(&node).contains(&AppEvent::CalibrationUnavailable { attempts: 5 }));
}

#[test]
fn radio_failure_does_not_block_bring_up() {
    let (mut node, radio) = sim_node(NodeConfig::default(), SimI2c::new());
    radio.set_broken(true);

    assert!(node.bring_up());
    assert!(matches!(
        events(&node).first(),
        Some(AppEvent::RadioSetupFailed(Error::Bus(BusError::Transport)))
    ));
}

// ── Full cycle ────────────────────────────────────────────────

#[test]
fn full_cycle_announces_measures_reports_and_sleeps() {
    let (mut node, radio) = started(NodeConfig::default(), SimI2c::new());
    assert_eq!(node.state(), NodeState::Reset);

    node.step();
    assert_eq!(node.state(), NodeState::Measure);
    assert_eq!(radio.packets(), vec![vec![7, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00]]);

    node.step();
    assert_eq!(node.state(), NodeState::Report);
    let sample = node.last_sample();
    assert!((sample.temperature_c - 25.0).abs() < 0.01, "t = {}", sample.temperature_c);
    assert!((sample.relative_humidity - 56.5).abs() < 0.01);
    assert!(sample.pressure_pa > 0.0);

    node.step();
    assert_eq!(node.state(), NodeState::Sleep);
    let packets = radio.packets();
    assert_eq!(packets.len(), 2);
    match decode(&packets[1]).unwrap() {
        Packet::MeasureReport {
            header,
            temperature_centi,
            humidity_pct,
            pressure_pa,
        } => {
            assert_eq!(header.length, 11);
            assert_eq!(header.source_address, 0x01);
            assert_eq!(header.payload_type, PayloadType::MeasureReport as u8);
            assert_eq!(header.frame_number, 1);
            assert_eq!(temperature_centi, (sample.temperature_c * 100.0) as i16);
            assert_eq!(humidity_pct, 56);
            assert_eq!(pressure_pa, sample.pressure_pa as u32);
        }
        other => panic!("expected a measurement report, got {:?}", other),
    }
    assert_eq!(power_calls(&node), &[PowerCall::ScheduleWake(60)]);

    node.step();
    assert_eq!(node.state(), NodeState::Measure);
    assert_eq!(
        power_calls(&node),
        &[
            PowerCall::ScheduleWake(60),
            PowerCall::Arm,
            PowerCall::Sleep,
            PowerCall::Disarm,
        ]
    );
    assert_eq!(node.step_count(), 4);
}

#[test]
fn measure_requests_configured_precision_and_idles_barometer() {
    let (mut node, _radio) = started(NodeConfig::default(), SimI2c::new());
    node.step();
    node.step();

    let i2c = &node.context().i2c;
    assert_eq!(i2c.humidity.commands, vec![0xFD]);
    assert_eq!(i2c.baro.mode(), 0, "barometer back in Idle");
    assert!(
        i2c.writes
            .iter()
            .any(|(addr, bytes)| *addr == 0x76 && bytes == &[0x08, 0x07]),
        "continuous pressure+temperature mode was requested"
    );
}

#[test]
fn state_changes_are_reported_in_order() {
    let (mut node, _radio) = started(NodeConfig::default(), SimI2c::new());
    for _ in 0..5 {
        node.step();
    }

    let changes: Vec<(NodeState, NodeState)> = events(&node)
        .iter()
        .filter_map(|e| match e {
            AppEvent::StateChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        changes,
        vec![
            (NodeState::Reset, NodeState::Measure),
            (NodeState::Measure, NodeState::Report),
            (NodeState::Report, NodeState::Sleep),
            (NodeState::Sleep, NodeState::Measure),
            (NodeState::Measure, NodeState::Report),
        ]
    );
    assert!(matches!(events(&node)[1], AppEvent::Started(NodeState::Reset)));
}

#[test]
fn frame_numbers_advance_across_cycles() {
    let (mut node, radio) = started(NodeConfig::default(), SimI2c::new());
    // Reset, then three Measure/Report/Sleep cycles.
    for _ in 0..10 {
        node.step();
    }

    let frames: Vec<u16> = radio
        .packets()
        .iter()
        .map(|p| decode(p).unwrap().header().frame_number)
        .collect();
    assert_eq!(frames, vec![0, 1, 2, 3]);
    assert_eq!(node.next_frame_number(), 4);
}

#[test]
fn custom_node_address_is_carried_in_every_packet() {
    let config = NodeConfig {
        node_address: 0x5A,
        sample_interval_secs: 300,
        ..Default::default()
    };
    let (mut node, radio) = started(config, SimI2c::new());
    for _ in 0..3 {
        node.step();
    }

    let packets = radio.packets();
    assert_eq!(packets.len(), 2);
    assert!(packets.iter().all(|p| p[1] == 0x5A));
    assert_eq!(power_calls(&node), &[PowerCall::ScheduleWake(300)]);
}

#[test]
fn fifo_results_are_sorted_by_tag() {
    let mut i2c = SimI2c::new();
    // Temperature converts first.
    i2c.baro.fifo_script = vec![0x0A_0000, 0xF0_0001];
    let config = NodeConfig {
        baro: BaroSettings {
            fifo: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let (mut node, _radio) = started(config, i2c);
    assert!(node.context().i2c.baro.fifo_enabled());

    node.step();
    node.step();
    assert_eq!(node.state(), NodeState::Report);

    let expected = node.context().baro.compensate_pressure(0xF0_0001, 0x0A_0000);
    assert_eq!(node.last_sample().pressure_pa, expected);
    assert_ne!(
        expected,
        node.context().baro.compensate_pressure(0x0A_0000, 0xF0_0001),
        "arrival order would have swapped the fields"
    );
    assert!(
        node.context()
            .i2c
            .writes
            .iter()
            .any(|(addr, bytes)| *addr == 0x76 && bytes == &[0x0C, 0x80]),
        "FIFO flushed before the run"
    );
}

#[test]
fn fifo_without_a_pressure_entry_fails_measurement() {
    let mut i2c = SimI2c::new();
    i2c.baro.fifo_script = vec![0x0A_0000, 0x0A_0002];
    let config = NodeConfig {
        baro: BaroSettings {
            fifo: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let (mut node, radio) = started(config, i2c);

    node.step();
    node.step();
    assert_eq!(node.state(), NodeState::MeasureFail);
    node.step();
    assert!(
        events(&node).contains(&AppEvent::MeasureFailed(Error::Sensor(SensorError::FifoUnpaired)))
    );
    assert_eq!(radio.packets().len(), 1);
}

// ── Failure paths ─────────────────────────────────────────────

#[test]
fn barometer_timeout_skips_report() {
    let mut i2c = SimI2c::new();
    i2c.baro.never_ready = true;
    let (mut node, radio) = started(NodeConfig::default(), i2c);

    node.step();
    node.step();
    assert_eq!(node.state(), NodeState::MeasureFail);

    node.step();
    assert_eq!(node.state(), NodeState::Sleep);
    assert!(
        events(&node).contains(&AppEvent::MeasureFailed(Error::Sensor(SensorError::ResultTimeout)))
    );
    assert_eq!(radio.packets().len(), 1, "only the reset announcement went out");
    assert_eq!(node.context().i2c.baro.mode(), 0);
    assert_eq!(power_calls(&node), &[PowerCall::ScheduleWake(60)]);

    node.step();
    assert_eq!(node.state(), NodeState::Measure, "next cycle is attempted");
}

#[test]
fn missing_humidity_sensor_fails_measurement() {
    let mut i2c = SimI2c::new();
    i2c.humidity.absent = true;
    let (mut node, _radio) = started(NodeConfig::default(), i2c);

    node.step();
    node.step();
    node.step();
    assert_eq!(node.state(), NodeState::Sleep);
    assert!(
        events(&node).contains(&AppEvent::MeasureFailed(Error::Bus(BusError::NoAcknowledge)))
    );
}

#[test]
fn humidity_busy_within_budget_still_reports() {
    let mut i2c = SimI2c::new();
    i2c.humidity.busy_reads = 10;
    let (mut node, _radio) = started(NodeConfig::default(), i2c);

    node.step();
    node.step();
    assert_eq!(node.state(), NodeState::Report);
}

#[test]
fn humidity_busy_beyond_budget_times_out() {
    let mut i2c = SimI2c::new();
    i2c.humidity.busy_reads = 60;
    let config = NodeConfig {
        humidity_poll_attempts: 50,
        ..Default::default()
    };
    let (mut node, _radio) = started(config, i2c);

    node.step();
    node.step();
    assert_eq!(node.state(), NodeState::MeasureFail);
    node.step();
    assert!(
        events(&node).contains(&AppEvent::MeasureFailed(Error::Sensor(SensorError::ResultTimeout)))
    );
}

#[test]
fn humidity_checksum_mismatch_keeps_sample() {
    let mut i2c = SimI2c::new();
    i2c.humidity.frame[5] ^= 0xFF;
    let (mut node, radio) = started(NodeConfig::default(), i2c);

    node.step();
    node.step();
    assert_eq!(node.state(), NodeState::Report);
    assert!(events(&node).contains(&AppEvent::HumidityChecksumMismatch));

    node.step();
    assert_eq!(radio.packets().len(), 2);
    assert!((node.last_sample().relative_humidity - sht4x::relative_humidity(0x8000)).abs() < 1e-6);
}

#[test]
fn stuck_transmitter_is_forced_to_sleep_and_cycle_continues() {
    let (mut node, radio) = started(NodeConfig::default(), SimI2c::new());
    radio.set_stuck(true);
    radio.0.borrow_mut().regs[usize::from(reg::OPMODE)] = 0x0C;

    node.step();
    assert_eq!(node.state(), NodeState::Measure);
    assert!(events(&node).contains(&AppEvent::TransmitFailed(Error::Radio(
        RadioError::TransmitTimeout
    ))));
    assert_eq!(radio.reg(reg::OPMODE), 0x00, "transmitter parked in Sleep");

    node.step();
    node.step();
    assert_eq!(node.state(), NodeState::Sleep);
    assert_eq!(radio.packets().len(), 2, "report still handed to the radio");
}

#[test]
fn queued_packets_match_radio_traffic() {
    let (mut node, radio) = started(NodeConfig::default(), SimI2c::new());
    for _ in 0..3 {
        node.step();
    }

    let queued: Vec<Vec<u8>> = events(&node)
        .iter()
        .filter_map(|e| match e {
            AppEvent::PacketQueued(bytes) => Some(bytes.to_vec()),
            _ => None,
        })
        .collect();
    assert_eq!(queued, radio.packets());
}
