//! SPI register access.
//!
//! Every transfer is one command byte followed by `n` data bytes, with
//! chip-select held for the whole exchange. Bit 7 of the command byte
//! selects the direction: set for a write, clear for a read. Registers
//! auto-increment on the device side, so a burst covers consecutive
//! addresses.

use embedded_hal::spi::{Operation, SpiDevice};

use crate::error::BusError;

const WRITE_FLAG: u8 = 0x80;

/// Direction of a register burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl Access {
    /// Command byte for a burst starting at `start`.
    pub fn command(self, start: u8) -> u8 {
        match self {
            Self::Write => start | WRITE_FLAG,
            Self::Read => start & !WRITE_FLAG,
        }
    }
}

/// Register-oriented wrapper around an SPI device.
pub struct RegisterBus<SPI> {
    spi: SPI,
}

impl<SPI: SpiDevice> RegisterBus<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    pub fn release(self) -> SPI {
        self.spi
    }

    /// Exchange `buf.len()` bytes with the registers starting at `start`.
    ///
    /// For [`Access::Write`] the buffer is sent unchanged; for
    /// [`Access::Read`] it is overwritten with the register contents.
    pub fn access_registers(
        &mut self,
        start: u8,
        buf: &mut [u8],
        access: Access,
    ) -> Result<(), BusError> {
        let cmd = [access.command(start)];
        let result = match access {
            Access::Write => self
                .spi
                .transaction(&mut [Operation::Write(&cmd), Operation::Write(&*buf)]),
            Access::Read => self
                .spi
                .transaction(&mut [Operation::Write(&cmd), Operation::Read(buf)]),
        };
        result.map_err(|e| BusError::from_spi(&e))
    }

    /// Burst-write `data` starting at `start`.
    pub fn write_registers(&mut self, start: u8, data: &[u8]) -> Result<(), BusError> {
        let cmd = [Access::Write.command(start)];
        self.spi
            .transaction(&mut [Operation::Write(&cmd), Operation::Write(data)])
            .map_err(|e| BusError::from_spi(&e))
    }

    pub fn write_register(&mut self, addr: u8, value: u8) -> Result<(), BusError> {
        self.write_registers(addr, &[value])
    }

    pub fn read_register(&mut self, addr: u8) -> Result<u8, BusError> {
        let mut value = [0u8];
        self.access_registers(addr, &mut value, Access::Read)?;
        Ok(value[0])
    }
}
