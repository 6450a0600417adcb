//! DPS368 barometric pressure / temperature sensor (I2C).
//!
//! Register summary:
//!
//! | Reg  | Name       | Use                                               |
//! |------|------------|---------------------------------------------------|
//! | 0x00 | PSR_B2..B0 | 24-bit pressure result (also the FIFO read port)  |
//! | 0x03 | TMP_B2..B0 | 24-bit temperature result                         |
//! | 0x06 | PRS_CFG    | pressure rate [6:4], oversampling [3:0]           |
//! | 0x07 | TMP_CFG    | TMP_EXT [7], rate [6:4], oversampling [3:0]       |
//! | 0x08 | MEAS_CFG   | COEF_RDY [7], TMP_RDY [5], PRS_RDY [4], mode [2:0]|
//! | 0x09 | CFG_REG    | T_SHIFT [3], P_SHIFT [2], FIFO_EN [1]             |
//! | 0x0C | RESET      | FIFO_FLUSH [7]                                    |
//! | 0x10 | COEF       | 18-byte calibration block                         |
//! | 0x28 | COEF_SRCE  | temperature coefficient source [7]                |
//!
//! The driver does not own the bus; every call borrows it, so the
//! barometer and the humidity sensor share one I2C master.

use embedded_hal::i2c::I2c;
use serde::{Deserialize, Serialize};

use crate::error::{BusError, Result, SensorError};

/// 7-bit address with SDO tied low.
pub const ADDRESS: u8 = 0x76;

/// Register addresses.
pub mod reg {
    pub const PSR_B2: u8 = 0x00;
    pub const TMP_B2: u8 = 0x03;
    pub const PRS_CFG: u8 = 0x06;
    pub const MEAS_CFG: u8 = 0x08;
    pub const CFG_REG: u8 = 0x09;
    pub const RESET: u8 = 0x0C;
    pub const COEF: u8 = 0x10;
    pub const COEF_SRCE: u8 = 0x28;
}

const COEF_RDY: u8 = 0x80;
const TMP_EXT: u8 = 0x80;
const FIFO_FLUSH: u8 = 0x80;
const RESULT_READY_MASK: u8 = 0x30;

const CFG_FIFO_EN: u8 = 0x02;
const CFG_P_SHIFT: u8 = 0x04;
const CFG_T_SHIFT: u8 = 0x08;

/// Size of the calibration coefficient block.
pub const CALIBRATION_LEN: usize = 18;
/// Depth of the on-chip result FIFO.
pub const FIFO_DEPTH: usize = 32;

// ---------------------------------------------------------------------------
// Configuration enums
// ---------------------------------------------------------------------------

/// Samples averaged per reported result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Oversampling {
    X1 = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
    X32 = 5,
    X64 = 6,
    X128 = 7,
}

impl Oversampling {
    /// Decode a 3-bit selector; upper bits are ignored.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Self::X1,
            1 => Self::X2,
            2 => Self::X4,
            3 => Self::X8,
            4 => Self::X16,
            5 => Self::X32,
            6 => Self::X64,
            _ => Self::X128,
        }
    }

    /// Compensation scale factor (kP / kT) for this setting.
    pub fn scaling_factor(self) -> u32 {
        SCALING_FACTORS[self as usize]
    }

    /// Results no longer fit the result registers unshifted at 16x and above.
    pub fn requires_result_shift(self) -> bool {
        self as u8 >= Self::X16 as u8
    }
}

/// Compensation scale factors indexed by oversampling selector.
pub const SCALING_FACTORS: [u32; 8] = [
    0x0008_0000, // 1x   524288
    0x0018_0000, // 2x  1572864
    0x0038_0000, // 4x  3670016
    0x0078_0000, // 8x  7864320
    0x0003_E000, // 16x  253952
    0x0007_E000, // 32x  516096
    0x000F_E000, // 64x 1040384
    0x001F_E000, // 128x 2088960
];

/// Background measurement rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MeasureRate {
    Hz1 = 0,
    Hz2 = 1,
    Hz4 = 2,
    Hz8 = 3,
    Hz16 = 4,
    Hz32 = 5,
    Hz64 = 6,
    Hz128 = 7,
}

/// Operating mode written to MEAS_CFG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    Idle = 0,
    SinglePressure = 1,
    SingleTemperature = 2,
    ContinuousPressure = 5,
    ContinuousTemperature = 6,
    ContinuousBoth = 7,
}

/// Which results are waiting in the result registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStatus {
    None,
    PressureReady,
    TemperatureReady,
    BothReady,
}

impl ResultStatus {
    fn from_meas_cfg(value: u8) -> Self {
        match (value & RESULT_READY_MASK) >> 4 {
            0 => Self::None,
            1 => Self::PressureReady,
            2 => Self::TemperatureReady,
            _ => Self::BothReady,
        }
    }
}

/// Settings applied by [`Dps368::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaroSettings {
    pub pressure_oversampling: Oversampling,
    pub pressure_rate: MeasureRate,
    pub temperature_oversampling: Oversampling,
    pub temperature_rate: MeasureRate,
    pub fifo: bool,
}

impl Default for BaroSettings {
    fn default() -> Self {
        Self {
            pressure_oversampling: Oversampling::X32,
            pressure_rate: MeasureRate::Hz1,
            temperature_oversampling: Oversampling::X8,
            temperature_rate: MeasureRate::Hz1,
            fifo: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Calibration coefficients
// ---------------------------------------------------------------------------

/// One packed coefficient inside the calibration block.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationField {
    pub name: &'static str,
    /// Bit offset from the MSB of byte 0.
    pub offset: usize,
    pub width: u32,
}

/// Layout of the 18-byte block, in storage order.
pub const CALIBRATION_FIELDS: [CalibrationField; 9] = [
    CalibrationField { name: "c0", offset: 0, width: 12 },
    CalibrationField { name: "c1", offset: 12, width: 12 },
    CalibrationField { name: "c00", offset: 24, width: 20 },
    CalibrationField { name: "c10", offset: 44, width: 20 },
    CalibrationField { name: "c01", offset: 64, width: 16 },
    CalibrationField { name: "c11", offset: 80, width: 16 },
    CalibrationField { name: "c20", offset: 96, width: 16 },
    CalibrationField { name: "c21", offset: 112, width: 16 },
    CalibrationField { name: "c30", offset: 128, width: 16 },
];

/// Read `width` bits (at most 32) starting `offset` bits into a big-endian
/// bit stream.
pub fn extract_bits(block: &[u8], offset: usize, width: u32) -> u32 {
    let mut value = 0u32;
    for bit in offset..offset + width as usize {
        let byte = block.get(bit / 8).copied().unwrap_or(0);
        let set = (byte >> (7 - bit % 8)) & 1;
        value = (value << 1) | u32::from(set);
    }
    value
}

/// Interpret the low `width` bits of `value` as two's complement.
pub fn sign_extend(value: u32, width: u32) -> i32 {
    if width == 0 || width >= 32 {
        return value as i32;
    }
    let value = value & ((1u32 << width) - 1);
    let half = 1i64 << (width - 1);
    if i64::from(value) & half != 0 {
        (i64::from(value) - 2 * half) as i32
    } else {
        value as i32
    }
}

/// The nine factory coefficients of the compensation polynomial.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calibration {
    pub c0: i32,
    pub c1: i32,
    pub c00: i32,
    pub c10: i32,
    pub c01: i32,
    pub c11: i32,
    pub c20: i32,
    pub c21: i32,
    pub c30: i32,
}

impl Calibration {
    /// Unpack and sign-extend every field of a raw coefficient block.
    pub fn from_block(block: &[u8; CALIBRATION_LEN]) -> Self {
        let mut v = [0i32; 9];
        for (slot, field) in v.iter_mut().zip(CALIBRATION_FIELDS.iter()) {
            *slot = sign_extend(extract_bits(block, field.offset, field.width), field.width);
        }
        let [c0, c1, c00, c10, c01, c11, c20, c21, c30] = v;
        Self { c0, c1, c00, c10, c01, c11, c20, c21, c30 }
    }
}

/// FIFO entries carry a pressure result when bit 0 is set.
pub fn is_pressure_sample(raw: u32) -> bool {
    raw & 0x01 != 0
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

pub struct Dps368 {
    address: u8,
    calibration: Calibration,
    pressure_scale: u32,
    temperature_scale: u32,
}

impl Default for Dps368 {
    fn default() -> Self {
        Self::new()
    }
}

impl Dps368 {
    pub fn new() -> Self {
        Self::with_address(ADDRESS)
    }

    pub fn with_address(address: u8) -> Self {
        Self {
            address,
            calibration: Calibration::default(),
            pressure_scale: Oversampling::X1.scaling_factor(),
            temperature_scale: Oversampling::X1.scaling_factor(),
        }
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Current (pressure, temperature) scale factors.
    pub fn scaling_factors(&self) -> (u32, u32) {
        (self.pressure_scale, self.temperature_scale)
    }

    /// Apply oversampling, rates and FIFO mode.
    ///
    /// Writes PRS_CFG, TMP_CFG, MEAS_CFG and CFG_REG in one burst. The
    /// coefficient source bit is read first and mirrored into TMP_EXT so the
    /// temperature path matches the sensor the coefficients were trimmed on.
    pub fn initialize<I2C: I2c>(&mut self, i2c: &mut I2C, settings: &BaroSettings) -> Result<()> {
        let p_os = settings.pressure_oversampling;
        let t_os = settings.temperature_oversampling;
        self.pressure_scale = p_os.scaling_factor();
        self.temperature_scale = t_os.scaling_factor();

        let mut source = [0u8];
        i2c.write_read(self.address, &[reg::COEF_SRCE], &mut source)
            .map_err(|e| BusError::from_i2c(&e))?;

        let mut cfg_reg = 0u8;
        if settings.fifo {
            cfg_reg |= CFG_FIFO_EN;
        }
        if p_os.requires_result_shift() {
            cfg_reg |= CFG_P_SHIFT;
        }
        if t_os.requires_result_shift() {
            cfg_reg |= CFG_T_SHIFT;
        }

        let block = [
            reg::PRS_CFG,
            ((settings.pressure_rate as u8 & 0x07) << 4) | p_os as u8,
            ((settings.temperature_rate as u8 & 0x07) << 4) | t_os as u8 | (source[0] & TMP_EXT),
            Mode::Idle as u8,
            cfg_reg,
        ];
        self.write(i2c, &block)
    }

    pub fn set_mode<I2C: I2c>(&mut self, i2c: &mut I2C, mode: Mode) -> Result<()> {
        self.write(i2c, &[reg::MEAS_CFG, mode as u8 & 0x07])
    }

    /// Poll MEAS_CFG. A bus failure reads as [`ResultStatus::None`].
    pub fn result_status<I2C: I2c>(&mut self, i2c: &mut I2C) -> ResultStatus {
        let mut value = [0u8];
        match i2c.write_read(self.address, &[reg::MEAS_CFG], &mut value) {
            Ok(()) => ResultStatus::from_meas_cfg(value[0]),
            Err(_) => ResultStatus::None,
        }
    }

    /// Load and retain the calibration coefficients.
    ///
    /// Fails with [`SensorError::CoefficientsNotReady`] until the sensor has
    /// finished copying its coefficients out of fuses.
    pub fn read_calibration<I2C: I2c>(&mut self, i2c: &mut I2C) -> Result<Calibration> {
        let mut status = [0u8];
        i2c.write_read(self.address, &[reg::MEAS_CFG], &mut status)
            .map_err(|e| BusError::from_i2c(&e))?;
        if status[0] & COEF_RDY == 0 {
            return Err(SensorError::CoefficientsNotReady.into());
        }

        let mut block = [0u8; CALIBRATION_LEN];
        i2c.write_read(self.address, &[reg::COEF], &mut block)
            .map_err(|e| BusError::from_i2c(&e))?;
        self.calibration = Calibration::from_block(&block);
        Ok(self.calibration)
    }

    /// Flush every queued FIFO entry.
    pub fn clear_fifo<I2C: I2c>(&mut self, i2c: &mut I2C) -> Result<()> {
        self.write(i2c, &[reg::RESET, FIFO_FLUSH])
    }

    /// Read `out.len()` consecutive 24-bit big-endian results starting at `start`.
    pub fn read_results<I2C: I2c>(&mut self, i2c: &mut I2C, start: u8, out: &mut [u32]) -> Result<()> {
        let mut raw = [0u8; FIFO_DEPTH * 3];
        for chunk in out.chunks_mut(FIFO_DEPTH) {
            let bytes = &mut raw[..chunk.len() * 3];
            i2c.write_read(self.address, &[start], bytes)
                .map_err(|e| BusError::from_i2c(&e))?;
            for (value, b) in chunk.iter_mut().zip(bytes.chunks_exact(3)) {
                *value = u32::from(b[0]) << 16 | u32::from(b[1]) << 8 | u32::from(b[2]);
            }
        }
        Ok(())
    }

    pub fn read_pressure_raw<I2C: I2c>(&mut self, i2c: &mut I2C) -> Result<u32> {
        let mut v = [0u32];
        self.read_results(i2c, reg::PSR_B2, &mut v)?;
        Ok(v[0])
    }

    pub fn read_temperature_raw<I2C: I2c>(&mut self, i2c: &mut I2C) -> Result<u32> {
        let mut v = [0u32];
        self.read_results(i2c, reg::TMP_B2, &mut v)?;
        Ok(v[0])
    }

    /// Drain `out.len()` entries from the FIFO read port.
    pub fn read_fifo<I2C: I2c>(&mut self, i2c: &mut I2C, out: &mut [u32]) -> Result<()> {
        self.read_results(i2c, reg::PSR_B2, out)
    }

    /// Drain one pressure and one temperature entry from the FIFO, sorted
    /// by tag bit rather than by arrival order. Returns `(pressure, temperature)`.
    pub fn read_fifo_pair<I2C: I2c>(&mut self, i2c: &mut I2C) -> Result<(u32, u32)> {
        let mut raw = [0u32; 2];
        self.read_fifo(i2c, &mut raw)?;
        match (is_pressure_sample(raw[0]), is_pressure_sample(raw[1])) {
            (true, false) => Ok((raw[0], raw[1])),
            (false, true) => Ok((raw[1], raw[0])),
            _ => Err(SensorError::FifoUnpaired.into()),
        }
    }

    fn scaled(raw: u32, scale: u32) -> f32 {
        sign_extend(raw, 24) as f32 / scale as f32
    }

    /// Compensated temperature in °C.
    pub fn compensate_temperature(&self, raw_temperature: u32) -> f32 {
        let c = &self.calibration;
        let t = Self::scaled(raw_temperature, self.temperature_scale);
        t * c.c1 as f32 + c.c0 as f32 * 0.5
    }

    /// Compensated pressure in Pa.
    pub fn compensate_pressure(&self, raw_pressure: u32, raw_temperature: u32) -> f32 {
        let c = &self.calibration;
        let p = Self::scaled(raw_pressure, self.pressure_scale);
        let t = Self::scaled(raw_temperature, self.temperature_scale);
        (((p * c.c30 as f32 + c.c20 as f32) * p + c.c10 as f32) * p)
            + ((p * c.c21 as f32 + c.c11 as f32) * p * t)
            + (t + c.c01 as f32)
            + c.c00 as f32
    }

    fn write<I2C: I2c>(&mut self, i2c: &mut I2C, bytes: &[u8]) -> Result<()> {
        i2c.write(self.address, bytes)
            .map_err(|e| BusError::from_i2c(&e).into())
    }
}
