//! SX1231H sub-GHz FSK/OOK transceiver (SPI).
//!
//! The radio is configured once at bring-up and then only ever sees FIFO
//! bursts. The packet engine defaults put it in auto-mode: writing the
//! FIFO raises `FifoNotEmpty`, which moves the radio into TX on its own,
//! and `PacketSent` drops it back to the parked mode.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::bus::{Access, RegisterBus};
use crate::error::{RadioError, Result};

/// Register map (subset used by the node plus the AES key slots).
pub mod reg {
    pub const FIFO: u8 = 0x00;
    pub const OPMODE: u8 = 0x01;
    pub const DATAMODUL: u8 = 0x02;
    pub const BITRATE_MSB: u8 = 0x03;
    pub const BITRATE_LSB: u8 = 0x04;
    pub const FDEV_MSB: u8 = 0x05;
    pub const FDEV_LSB: u8 = 0x06;
    pub const FRF_MSB: u8 = 0x07;
    pub const FRF_MID: u8 = 0x08;
    pub const FRF_LSB: u8 = 0x09;
    pub const PALEVEL: u8 = 0x11;
    pub const OCP: u8 = 0x13;
    pub const IRQFLAGS1: u8 = 0x27;
    pub const IRQFLAGS2: u8 = 0x28;
    pub const PREAMBLE_MSB: u8 = 0x2C;
    pub const SYNC_VALUE1: u8 = 0x2F;
    pub const PACKET_CONFIG1: u8 = 0x37;
    pub const AUTO_MODES: u8 = 0x3B;
    pub const AES_KEY1: u8 = 0x3E;
    pub const AES_KEY16: u8 = 0x4D;
    pub const TESTPA1: u8 = 0x5A;
    pub const TESTPA2: u8 = 0x5C;
}

/// IRQFLAGS2 bits.
pub mod irq2 {
    pub const FIFO_FULL: u8 = 0x80;
    pub const FIFO_NOT_EMPTY: u8 = 0x40;
    pub const FIFO_OVERRUN: u8 = 0x10;
    pub const PACKET_SENT: u8 = 0x08;
}

/// Crystal frequency.
pub const F_XOSC_HZ: u64 = 32_000_000;
/// Synthesizer step, `F_XOSC / 2^19` (61.03515625 Hz).
pub const F_STEP_HZ: f64 = F_XOSC_HZ as f64 / (1u64 << 19) as f64;
/// Transmit FIFO size in bytes.
pub const FIFO_SIZE: usize = 66;

/// Highest accepted power level; larger requests are clamped.
pub const MAX_POWER_LEVEL: u8 = 23;

/// Packet engine block written from `PREAMBLE_MSB` (0x2C) through
/// `PACKET_CONFIG2` (0x3D).
pub const PACKET_ENGINE_DEFAULTS: [u8; 18] = [
    0x00, 0x07, // preamble: 7 bytes
    0xA8, // sync on, 6 sync bytes, no tolerated errors
    0x59, 0x45, 0x4C, 0x4C, 0x4F, 0x57, 0x00, 0x00, // sync word "YELLOW"
    0x80, // variable length, no DC-free, no CRC, no address filter
    0x40, // max payload length
    0x00, 0x00, // node / broadcast address
    0x3B, // auto-mode: FifoNotEmpty -> TX -> PacketSent
    0x8F, // TX start on FIFO not empty, threshold 15
    0x02, // auto RX restart
];

/// Modulation and data shaping, as written to DATAMODUL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Modulation {
    FskNoShaping = 0x00,
    FskGaussianBt1_0 = 0x01,
    FskGaussianBt0_5 = 0x02,
    FskGaussianBt0_3 = 0x03,
    OokNoShaping = 0x08,
    OokFilterBr = 0x09,
    OokFilter2Br = 0x0A,
}

/// Transceiver operating mode (OPMODE bits 4:2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceMode {
    Sleep = 0,
    Standby = 1,
    FrequencySynth = 2,
    Transmit = 3,
    Receive = 4,
    /// Any value above 4 read back from OPMODE.
    Reserved = 5,
}

impl DeviceMode {
    fn from_opmode(value: u8) -> Self {
        match (value & 0x1C) >> 2 {
            0 => Self::Sleep,
            1 => Self::Standby,
            2 => Self::FrequencySynth,
            3 => Self::Transmit,
            4 => Self::Receive,
            _ => Self::Reserved,
        }
    }
}

// ---------------------------------------------------------------------------
// Register value math
// ---------------------------------------------------------------------------

/// Carrier frequency to the 24-bit FRF value.
pub fn frf_register(hz: u32) -> u32 {
    (((u64::from(hz)) << 19) / F_XOSC_HZ) as u32 & 0x00FF_FFFF
}

/// Frequency deviation to the 16-bit FDEV value.
pub fn fdev_register(hz: u32) -> u16 {
    ((u64::from(hz) << 19) / F_XOSC_HZ) as u16
}

/// Bit rate to the 16-bit BITRATE divider.
pub fn bitrate_register(bps: u32) -> core::result::Result<u16, RadioError> {
    if bps == 0 {
        return Err(RadioError::InvalidBitRate);
    }
    Ok((F_XOSC_HZ / u64::from(bps)) as u16)
}

/// Amplifier register set for one power level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaSettings {
    pub pa_level: u8,
    pub ocp: u8,
    pub test_pa1: u8,
    pub test_pa2: u8,
}

/// Amplifier tier for `level`, clamped to [`MAX_POWER_LEVEL`].
///
/// | level | tier                  | PALEVEL     | OCP  | TESTPA1/2   |
/// |-------|-----------------------|-------------|------|-------------|
/// | 0..=4 | PA1                   | 0x4F + lvl  | 0x19 | 0x55 / 0x70 |
/// | 5..=7 | PA1 + PA2             | 0x6B + lvl  | 0x19 | 0x55 / 0x70 |
/// | 8..   | PA1 + PA2, high power | 0x68 + lvl  | 0x0F | 0x5D / 0x7C |
pub fn pa_settings(level: u8) -> PaSettings {
    let level = level.min(MAX_POWER_LEVEL);
    match level {
        8.. => PaSettings {
            pa_level: 0x68 + level,
            ocp: 0x0F,
            test_pa1: 0x5D,
            test_pa2: 0x7C,
        },
        5..=7 => PaSettings {
            pa_level: 0x6B + level,
            ocp: 0x19,
            test_pa1: 0x55,
            test_pa2: 0x70,
        },
        _ => PaSettings {
            pa_level: 0x4F + level,
            ocp: 0x19,
            test_pa1: 0x55,
            test_pa2: 0x70,
        },
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

pub struct Sx1231h<SPI> {
    bus: RegisterBus<SPI>,
}

impl<SPI: SpiDevice> Sx1231h<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self {
            bus: RegisterBus::new(spi),
        }
    }

    pub fn release(self) -> SPI {
        self.bus.release()
    }

    /// Standby + modulation, then the packet engine block.
    pub fn initialize(&mut self, modulation: Modulation) -> Result<()> {
        let opmode = (DeviceMode::Standby as u8) << 2;
        self.bus
            .write_registers(reg::OPMODE, &[opmode, modulation as u8])?;
        self.bus
            .write_registers(reg::PREAMBLE_MSB, &PACKET_ENGINE_DEFAULTS)?;
        Ok(())
    }

    pub fn set_carrier_frequency(&mut self, hz: u32) -> Result<()> {
        let frf = frf_register(hz).to_be_bytes();
        self.bus.write_registers(reg::FRF_MSB, &frf[1..])?;
        Ok(())
    }

    pub fn set_frequency_deviation(&mut self, hz: u32) -> Result<()> {
        self.bus
            .write_registers(reg::FDEV_MSB, &fdev_register(hz).to_be_bytes())?;
        Ok(())
    }

    pub fn set_bit_rate(&mut self, bps: u32) -> Result<()> {
        let divider = bitrate_register(bps)?;
        self.bus
            .write_registers(reg::BITRATE_MSB, &divider.to_be_bytes())?;
        Ok(())
    }

    pub fn set_power_level(&mut self, level: u8) -> Result<()> {
        let pa = pa_settings(level);
        self.bus.write_register(reg::PALEVEL, pa.pa_level)?;
        self.bus.write_register(reg::OCP, pa.ocp)?;
        self.bus.write_register(reg::TESTPA1, pa.test_pa1)?;
        self.bus.write_register(reg::TESTPA2, pa.test_pa2)?;
        Ok(())
    }

    /// Switch operating mode. [`DeviceMode::Reserved`] is ignored.
    pub fn set_device_mode(&mut self, mode: DeviceMode) -> Result<()> {
        if mode == DeviceMode::Reserved {
            return Ok(());
        }
        self.bus.write_register(reg::OPMODE, (mode as u8) << 2)?;
        Ok(())
    }

    pub fn device_mode(&mut self) -> Result<DeviceMode> {
        let value = self.bus.read_register(reg::OPMODE)?;
        Ok(DeviceMode::from_opmode(value))
    }

    /// Burst the payload into the FIFO. Transmission starts on its own.
    pub fn write_packet(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > FIFO_SIZE {
            return Err(RadioError::PayloadTooLarge.into());
        }
        self.bus.write_registers(reg::FIFO, payload)?;
        Ok(())
    }

    pub fn irq_flags2(&mut self) -> Result<u8> {
        Ok(self.bus.read_register(reg::IRQFLAGS2)?)
    }

    /// Poll until the packet is out or the FIFO has drained.
    ///
    /// On timeout the radio is parked in Sleep so it never stays in TX.
    pub fn wait_transmit_complete<D: DelayNs>(
        &mut self,
        delay: &mut D,
        attempts: u32,
        interval_ms: u32,
    ) -> Result<()> {
        for _ in 0..attempts {
            let flags = self.irq_flags2()?;
            if flags & irq2::PACKET_SENT != 0 || flags & irq2::FIFO_NOT_EMPTY == 0 {
                return Ok(());
            }
            delay.delay_ms(interval_ms);
        }
        warn!("Radio: transmit did not complete, forcing sleep");
        self.set_device_mode(DeviceMode::Sleep)?;
        Err(RadioError::TransmitTimeout.into())
    }

    /// Raw register access for anything the typed API does not cover.
    pub fn access_registers(&mut self, start: u8, buf: &mut [u8], access: Access) -> Result<()> {
        self.bus.access_registers(start, buf, access)?;
        Ok(())
    }
}
