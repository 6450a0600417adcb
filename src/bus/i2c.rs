//! Polled I2C master.
//!
//! The master speaks the bus one condition and one byte at a time through
//! an [`I2cLink`], checking the acknowledge bit after every byte it sends.
//! A missing acknowledge aborts the transfer immediately. On that and on
//! every other failure (clock-stretch timeout, pin error) the master still
//! tries a STOP, so the bus is left idle for the next caller.
//!
//! ```text
//!  write:  S | addr+W | A | b0 | A | b1 | A | ... | P
//!  read:   S | addr+W | A | reg | A | Sr | addr+R | A | d0 A | d1 A | ... | dn N | P
//! ```
//!
//! [`I2cMaster`] implements [`embedded_hal::i2c::I2c`], so the sensor
//! drivers are written against the standard trait and run unchanged on a
//! hardware controller or on this bit-level master.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use crate::error::BusError;

impl embedded_hal::i2c::Error for BusError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NoAcknowledge => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            Self::Timeout | Self::Transport => ErrorKind::Other,
        }
    }
}

// ---------------------------------------------------------------------------
// Link: the byte-level bus primitives
// ---------------------------------------------------------------------------

/// Byte-level access to an I2C bus.
///
/// Implementors generate the bus conditions and shift single bytes. They
/// do not interpret acknowledges; that is the master's job.
pub trait I2cLink {
    /// Generate a START (or repeated START when the bus is already owned).
    fn start(&mut self) -> Result<(), BusError>;

    /// Shift one byte out. Returns `true` if the target acknowledged it.
    fn write_byte(&mut self, byte: u8) -> Result<bool, BusError>;

    /// Shift one byte in, answering with ACK (`true`) or NACK (`false`).
    fn read_byte(&mut self, ack: bool) -> Result<u8, BusError>;

    /// Generate a STOP and release the bus.
    fn stop(&mut self) -> Result<(), BusError>;
}

// ---------------------------------------------------------------------------
// Master
// ---------------------------------------------------------------------------

/// Blocking I2C master over an [`I2cLink`].
pub struct I2cMaster<L> {
    link: L,
}

impl<L: I2cLink> I2cMaster<L> {
    pub fn new(link: L) -> Self {
        Self { link }
    }

    /// Give the link back (e.g. to re-purpose the pins).
    pub fn release(self) -> L {
        self.link
    }

    /// Send `bytes` to the 7-bit `address` as one write transfer.
    pub fn write_bytes(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        self.transaction(address, &mut [Operation::Write(bytes)])
    }

    /// Fill `buf` from the 7-bit `address`.
    ///
    /// When `prefix` is non-empty it is written first (typically the
    /// register address), followed by a repeated START into the read phase.
    pub fn read_bytes(&mut self, address: u8, prefix: &[u8], buf: &mut [u8]) -> Result<(), BusError> {
        if prefix.is_empty() {
            self.transaction(address, &mut [Operation::Read(buf)])
        } else {
            self.transaction(address, &mut [Operation::Write(prefix), Operation::Read(buf)])
        }
    }

    /// Send a byte and abort the transfer if it is not acknowledged.
    fn send_checked(&mut self, byte: u8) -> Result<(), BusError> {
        if self.link.write_byte(byte)? {
            Ok(())
        } else {
            Err(BusError::NoAcknowledge)
        }
    }

    fn transfer(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), BusError> {
        // Direction of the previous operation; a change (or the first
        // operation) needs a (repeated) START and a fresh address byte.
        let mut previous_read: Option<bool> = None;

        for i in 0..operations.len() {
            let is_read = matches!(operations[i], Operation::Read(_));
            let read_continues = matches!(operations.get(i + 1), Some(Operation::Read(_)));

            if previous_read != Some(is_read) {
                self.link.start()?;
                self.send_checked((address << 1) | u8::from(is_read))?;
            }

            match &mut operations[i] {
                Operation::Write(bytes) => {
                    for &byte in bytes.iter() {
                        self.send_checked(byte)?;
                    }
                }
                Operation::Read(buf) => {
                    let len = buf.len();
                    for (n, slot) in buf.iter_mut().enumerate() {
                        // The very last byte before STOP / Sr is answered with NACK.
                        let ack = read_continues || n + 1 < len;
                        *slot = self.link.read_byte(ack)?;
                    }
                }
            }
            previous_read = Some(is_read);
        }
        Ok(())
    }
}

impl<L> ErrorType for I2cMaster<L> {
    type Error = BusError;
}

impl<L: I2cLink> I2c for I2cMaster<L> {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        match self.transfer(address, operations) {
            Ok(()) => self.link.stop(),
            Err(e) => {
                // Release the bus whatever went wrong; the first error wins.
                let _ = self.link.stop();
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Bit-banged link over two open-drain GPIOs
// ---------------------------------------------------------------------------

/// Default half clock period, giving roughly 100 kHz SCL.
pub const DEFAULT_HALF_PERIOD_US: u32 = 5;
/// Default number of microseconds a target may stretch the clock.
pub const DEFAULT_STRETCH_BUDGET_US: u32 = 1_000;

/// [`I2cLink`] driving SDA and SCL as open-drain GPIOs.
///
/// Both pins must be configured open-drain with pull-ups: `set_high`
/// releases the line and `set_low` pulls it down. SCL is read back to
/// honour clock stretching, bounded by the stretch budget.
pub struct SoftI2c<SDA, SCL, D> {
    sda: SDA,
    scl: SCL,
    delay: D,
    half_period_us: u32,
    stretch_budget_us: u32,
}

impl<SDA, SCL, D> SoftI2c<SDA, SCL, D>
where
    SDA: InputPin + OutputPin,
    SCL: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(sda: SDA, scl: SCL, delay: D) -> Self {
        Self {
            sda,
            scl,
            delay,
            half_period_us: DEFAULT_HALF_PERIOD_US,
            stretch_budget_us: DEFAULT_STRETCH_BUDGET_US,
        }
    }

    /// Override the bus timing.
    pub fn with_timing(mut self, half_period_us: u32, stretch_budget_us: u32) -> Self {
        self.half_period_us = half_period_us.max(1);
        self.stretch_budget_us = stretch_budget_us;
        self
    }

    fn half(&mut self) {
        self.delay.delay_us(self.half_period_us);
    }

    fn sda(&mut self, high: bool) -> Result<(), BusError> {
        if high {
            self.sda.set_high()
        } else {
            self.sda.set_low()
        }
        .map_err(|_| BusError::Transport)
    }

    fn sda_is_high(&mut self) -> Result<bool, BusError> {
        self.sda.is_high().map_err(|_| BusError::Transport)
    }

    fn scl_low(&mut self) -> Result<(), BusError> {
        self.scl.set_low().map_err(|_| BusError::Transport)
    }

    /// Release SCL and wait for the target to stop stretching it.
    fn scl_release(&mut self) -> Result<(), BusError> {
        self.scl.set_high().map_err(|_| BusError::Transport)?;
        for _ in 0..=self.stretch_budget_us {
            if self.scl.is_high().map_err(|_| BusError::Transport)? {
                return Ok(());
            }
            self.delay.delay_us(1);
        }
        Err(BusError::Timeout)
    }

    /// One clock pulse with SDA already set up; returns SDA sampled while SCL is high.
    fn clock(&mut self) -> Result<bool, BusError> {
        self.half();
        self.scl_release()?;
        self.half();
        let bit = self.sda_is_high()?;
        self.scl_low()?;
        Ok(bit)
    }
}

impl<SDA, SCL, D> I2cLink for SoftI2c<SDA, SCL, D>
where
    SDA: InputPin + OutputPin,
    SCL: InputPin + OutputPin,
    D: DelayNs,
{
    fn start(&mut self) -> Result<(), BusError> {
        self.sda(true)?;
        self.scl_release()?;
        self.half();
        self.sda(false)?;
        self.half();
        self.scl_low()
    }

    fn write_byte(&mut self, byte: u8) -> Result<bool, BusError> {
        for bit in (0..8).rev() {
            self.sda(byte & (1 << bit) != 0)?;
            self.clock()?;
        }
        // Release SDA; the target pulls it low to acknowledge.
        self.sda(true)?;
        let nack = self.clock()?;
        Ok(!nack)
    }

    fn read_byte(&mut self, ack: bool) -> Result<u8, BusError> {
        self.sda(true)?;
        let mut byte = 0u8;
        for _ in 0..8 {
            byte = (byte << 1) | u8::from(self.clock()?);
        }
        self.sda(!ack)?;
        self.clock()?;
        self.sda(true)?;
        Ok(byte)
    }

    fn stop(&mut self) -> Result<(), BusError> {
        self.sda(false)?;
        self.half();
        self.scl_release()?;
        self.half();
        self.sda(true)?;
        self.half();
        Ok(())
    }
}
