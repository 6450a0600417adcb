//! Simulated hardware for integration tests.
//!
//! A DPS368 + SHT4x I2C bus model, an SX1231H SPI register file, a delay
//! that only counts, and recording power / event adapters. Everything the
//! node does on the wire can be asserted afterwards.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{self, ErrorKind, NoAcknowledgeSource};
use embedded_hal::spi::{self, SpiDevice};

use subghz_node::app::events::AppEvent;
use subghz_node::app::ports::{Board, EventSink, Peripherals, PowerPort};
use subghz_node::app::service::NodeService;
use subghz_node::config::NodeConfig;
use subghz_node::drivers::{dps368, sht4x, sx1231h};

/// Factory calibration block used by the barometer model.
pub const CALIBRATION_BLOCK: [u8; 18] = [
    0x0D, 0x8F, 0xD1, 0xFF, 0x3A, 0x5F, 0x5B, 0xD4, 0xF5, 0x39, 0x09, 0x73, 0xF6, 0x87, 0x00,
    0x72, 0xFE, 0xFF,
];

const NACK: ErrorKind = ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address);

// ── Barometer model ───────────────────────────────────────────

pub struct SimBaro {
    pub regs: [u8; 0x40],
    /// MEAS_CFG reads that still report coefficients not ready.
    pub coef_reads_until_ready: u32,
    /// Coefficients never become ready.
    pub coef_never_ready: bool,
    /// MEAS_CFG reads in continuous mode before both results are ready.
    pub polls_before_ready: u32,
    /// Results never become ready.
    pub never_ready: bool,
    /// Entries queued into the FIFO by each continuous-mode start, in order.
    pub fifo_script: Vec<u32>,
    countdown: u32,
    fifo: VecDeque<u32>,
    fifo_entry: [u8; 3],
}

impl SimBaro {
    pub fn new() -> Self {
        let mut regs = [0u8; 0x40];
        regs[usize::from(dps368::reg::COEF)..usize::from(dps368::reg::COEF) + 18]
            .copy_from_slice(&CALIBRATION_BLOCK);
        regs[usize::from(dps368::reg::COEF_SRCE)] = 0x80;
        let mut baro = Self {
            regs,
            coef_reads_until_ready: 0,
            coef_never_ready: false,
            polls_before_ready: 2,
            never_ready: false,
            fifo_script: Vec::new(),
            countdown: 0,
            fifo: VecDeque::new(),
            fifo_entry: [0; 3],
        };
        baro.set_raw(0xF0_0000, 0x0A_0000);
        baro
    }

    pub fn set_raw(&mut self, pressure: u32, temperature: u32) {
        self.regs[0..3].copy_from_slice(&pressure.to_be_bytes()[1..]);
        self.regs[3..6].copy_from_slice(&temperature.to_be_bytes()[1..]);
    }

    pub fn mode(&self) -> u8 {
        self.regs[usize::from(dps368::reg::MEAS_CFG)] & 0x07
    }

    pub fn fifo_enabled(&self) -> bool {
        self.regs[usize::from(dps368::reg::CFG_REG)] & 0x02 != 0
    }

    fn write_reg(&mut self, addr: u8, value: u8) {
        if addr == dps368::reg::MEAS_CFG {
            self.regs[usize::from(addr)] = value & 0x07;
            if value & 0x07 == 7 {
                self.countdown = self.polls_before_ready;
                if self.fifo_enabled() {
                    self.fifo.extend(self.fifo_script.iter().copied());
                }
            }
        } else if addr == dps368::reg::RESET && value & 0x80 != 0 {
            self.fifo.clear();
        } else if usize::from(addr) < self.regs.len() {
            self.regs[usize::from(addr)] = value;
        }
    }

    fn read_reg(&mut self, addr: u8) -> u8 {
        // With the FIFO on, the result registers stream queued entries.
        if self.fifo_enabled() && addr < 6 {
            let i = usize::from(addr % 3);
            if i == 0 {
                let entry = self.fifo.pop_front().unwrap_or(0x80_0000);
                self.fifo_entry.copy_from_slice(&entry.to_be_bytes()[1..]);
            }
            return self.fifo_entry[i];
        }
        if addr != dps368::reg::MEAS_CFG {
            return self.regs.get(usize::from(addr)).copied().unwrap_or(0);
        }
        let mut v = self.mode();
        if self.coef_reads_until_ready > 0 {
            self.coef_reads_until_ready -= 1;
        } else if !self.coef_never_ready {
            v |= 0xC0;
        }
        if v & 0x07 == 7 && !self.never_ready {
            if self.countdown == 0 {
                v |= 0x30;
            } else {
                self.countdown -= 1;
            }
        }
        v
    }
}

// ── Humidity sensor model ─────────────────────────────────────

pub struct SimHumidity {
    pub frame: [u8; 6],
    /// Reads NACKed after each command.
    pub busy_reads: u32,
    /// The sensor does not answer at all.
    pub absent: bool,
    pub commands: Vec<u8>,
    busy_left: u32,
    pending: bool,
}

impl SimHumidity {
    pub fn new() -> Self {
        let mut h = Self {
            frame: [0; 6],
            busy_reads: 1,
            absent: false,
            commands: Vec::new(),
            busy_left: 0,
            pending: false,
        };
        h.set_raw(0x6666, 0x8000);
        h
    }

    pub fn set_raw(&mut self, temperature: u16, humidity: u16) {
        let t = temperature.to_be_bytes();
        let rh = humidity.to_be_bytes();
        self.frame = [
            t[0],
            t[1],
            sensirion_i2c::crc8::calculate(&t),
            rh[0],
            rh[1],
            sensirion_i2c::crc8::calculate(&rh),
        ];
    }
}

// ── Shared I2C bus ────────────────────────────────────────────

pub struct SimI2c {
    pub baro: SimBaro,
    pub humidity: SimHumidity,
    /// Every write as (address, bytes).
    pub writes: Vec<(u8, Vec<u8>)>,
}

impl SimI2c {
    pub fn new() -> Self {
        Self {
            baro: SimBaro::new(),
            humidity: SimHumidity::new(),
            writes: Vec::new(),
        }
    }
}

impl i2c::ErrorType for SimI2c {
    type Error = ErrorKind;
}

impl i2c::I2c for SimI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        match address {
            dps368::ADDRESS => {
                let mut pointer = 0u8;
                for op in operations.iter_mut() {
                    match op {
                        i2c::Operation::Write(bytes) => {
                            self.writes.push((address, bytes.to_vec()));
                            if let Some((&first, rest)) = bytes.split_first() {
                                pointer = first;
                                for &b in rest {
                                    self.baro.write_reg(pointer, b);
                                    pointer = pointer.wrapping_add(1);
                                }
                            }
                        }
                        i2c::Operation::Read(buf) => {
                            for slot in buf.iter_mut() {
                                *slot = self.baro.read_reg(pointer);
                                pointer = pointer.wrapping_add(1);
                            }
                        }
                    }
                }
                Ok(())
            }
            sht4x::ADDRESS => {
                let h = &mut self.humidity;
                if h.absent {
                    return Err(NACK);
                }
                for op in operations.iter_mut() {
                    match op {
                        i2c::Operation::Write(bytes) => {
                            self.writes.push((address, bytes.to_vec()));
                            h.commands.extend_from_slice(bytes);
                            h.pending = true;
                            h.busy_left = h.busy_reads;
                        }
                        i2c::Operation::Read(buf) => {
                            if !h.pending || h.busy_left > 0 {
                                h.busy_left = h.busy_left.saturating_sub(1);
                                return Err(NACK);
                            }
                            buf.copy_from_slice(&h.frame[..buf.len()]);
                            h.pending = false;
                        }
                    }
                }
                Ok(())
            }
            _ => Err(NACK),
        }
    }
}

// ── Radio model ───────────────────────────────────────────────

pub struct RadioState {
    pub regs: [u8; 0x80],
    /// One entry per FIFO burst.
    pub packets: Vec<Vec<u8>>,
    /// Transmission never completes.
    pub stuck: bool,
    /// Every transfer fails.
    pub broken: bool,
}

/// SX1231H register file behind an `SpiDevice`. Clones share state.
#[derive(Clone)]
pub struct SimRadio(pub Rc<RefCell<RadioState>>);

impl SimRadio {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(RadioState {
            regs: [0; 0x80],
            packets: Vec::new(),
            stuck: false,
            broken: false,
        })))
    }

    pub fn packets(&self) -> Vec<Vec<u8>> {
        self.0.borrow().packets.clone()
    }

    pub fn reg(&self, addr: u8) -> u8 {
        self.0.borrow().regs[usize::from(addr)]
    }

    pub fn set_stuck(&self, stuck: bool) {
        self.0.borrow_mut().stuck = stuck;
    }

    pub fn set_broken(&self, broken: bool) {
        self.0.borrow_mut().broken = broken;
    }
}

impl spi::ErrorType for SimRadio {
    type Error = spi::ErrorKind;
}

impl SpiDevice for SimRadio {
    fn transaction(&mut self, operations: &mut [spi::Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut st = self.0.borrow_mut();
        if st.broken {
            return Err(spi::ErrorKind::Other);
        }
        let mut addr: Option<usize> = None;
        for op in operations.iter_mut() {
            match op {
                spi::Operation::Write(data) => {
                    let mut bytes = data.iter().copied();
                    if addr.is_none() {
                        addr = bytes.next().map(|c| usize::from(c & 0x7F));
                    }
                    let Some(a) = addr.as_mut() else { continue };
                    if *a == usize::from(sx1231h::reg::FIFO) {
                        let burst: Vec<u8> = bytes.collect();
                        if !burst.is_empty() {
                            st.packets.push(burst);
                        }
                    } else {
                        for b in bytes {
                            st.regs[*a] = b;
                            *a += 1;
                        }
                    }
                }
                spi::Operation::Read(buf) => {
                    let Some(a) = addr.as_mut() else { continue };
                    for slot in buf.iter_mut() {
                        *slot = if *a == usize::from(sx1231h::reg::IRQFLAGS2) {
                            if st.stuck {
                                sx1231h::irq2::FIFO_NOT_EMPTY
                            } else {
                                sx1231h::irq2::PACKET_SENT
                            }
                        } else {
                            st.regs[*a]
                        };
                        *a += 1;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

// ── Delay, power, sink ────────────────────────────────────────

/// Counts requested delay without sleeping.
#[derive(Default)]
pub struct SimDelay {
    pub total_ns: u64,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerCall {
    ScheduleWake(u32),
    Arm,
    Sleep,
    Disarm,
}

#[derive(Default)]
pub struct RecordingPower {
    pub calls: Vec<PowerCall>,
}

impl PowerPort for RecordingPower {
    fn schedule_wake(&mut self, secs: u32) {
        self.calls.push(PowerCall::ScheduleWake(secs));
    }

    fn arm_wake_alarm(&mut self) {
        self.calls.push(PowerCall::Arm);
    }

    fn sleep_until_interrupt(&mut self) {
        self.calls.push(PowerCall::Sleep);
    }

    fn disarm_wake_alarm(&mut self) {
        self.calls.push(PowerCall::Disarm);
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Board ─────────────────────────────────────────────────────

pub struct SimBoard;

impl Board for SimBoard {
    type I2c = SimI2c;
    type Spi = SimRadio;
    type Delay = SimDelay;
    type Power = RecordingPower;
    type Sink = RecordingSink;
}

/// A node on simulated hardware, plus a handle on its radio.
pub fn sim_node(config: NodeConfig, i2c: SimI2c) -> (NodeService<SimBoard>, SimRadio) {
    let radio = SimRadio::new();
    let service = NodeService::new(
        Peripherals {
            i2c,
            spi: radio.clone(),
            delay: SimDelay::default(),
            power: RecordingPower::default(),
            sink: RecordingSink::default(),
        },
        config,
    );
    (service, radio)
}
