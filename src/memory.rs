//! ARM memory transport
//!
//! Block reads and writes of ARM program and data memory through the
//! DMA window. Every transfer programs the DMA control and address
//! registers itself, since any other call may have left them changed.
//!
//! # Memory Map
//! - Code region: `0x0100_0000..=0x0101_7FFF`
//! - Data region: `0x2000_0000..=0x2001_3FFF`
//!
//! A transfer must start and end inside the same region.

use crate::interface::{RegisterAccess, Timer};
use crate::registers::{ArmDmaAddress, ArmDmaControl, DmaFlags, ARM_DMA_DATA0, ARM_DMA_WINDOW};
use crate::{Device, Error};

/// First byte of ARM program memory
pub const ARM_CODE_START: u32 = 0x0100_0000;
/// Last byte of ARM program memory
pub const ARM_CODE_END: u32 = 0x0101_7FFF;
/// First byte of ARM data memory
pub const ARM_DATA_START: u32 = 0x2000_0000;
/// Last byte of ARM data memory
pub const ARM_DATA_END: u32 = 0x2001_3FFF;

/// ARM memory region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Region {
    /// Program memory
    Code,
    /// Data memory
    Data,
}

impl Region {
    /// Finds the region holding every byte of `[address, address + length)`.
    ///
    /// Zero-length accesses are checked as if they covered one byte.
    ///
    /// # Errors
    /// * `Error::AddressOutOfRange` - The access leaves its region or
    ///   lies outside ARM memory
    pub fn of(address: u32, length: usize) -> Result<Self, Error> {
        let out_of_range = Error::AddressOutOfRange { address, length };

        let last = u64::from(address) + length.max(1) as u64 - 1;
        let region = Self::containing(address).ok_or(out_of_range)?;
        let (_, end) = region.bounds();

        if last > u64::from(end) {
            return Err(out_of_range);
        }
        Ok(region)
    }

    fn containing(address: u32) -> Option<Self> {
        [Region::Code, Region::Data].into_iter().find(|region| {
            let (start, end) = region.bounds();
            (start..=end).contains(&address)
        })
    }

    /// First and last byte address of the region.
    pub const fn bounds(self) -> (u32, u32) {
        match self {
            Region::Code => (ARM_CODE_START, ARM_CODE_END),
            Region::Data => (ARM_DATA_START, ARM_DATA_END),
        }
    }

    fn dma_flags(self) -> DmaFlags {
        match self {
            Region::Code => DmaFlags::empty(),
            Region::Data => DmaFlags::DATA_REGION,
        }
    }
}

impl<B, T> Device<B, T>
where
    B: RegisterAccess,
    T: Timer,
{
    /// Reads ARM memory into `buf`.
    ///
    /// With `auto_increment` the DMA engine advances the address itself
    /// every 4 bytes; without it the address is rewritten at every window
    /// boundary.
    ///
    /// # Errors
    /// * `Error::AddressOutOfRange` - Checked before any register access
    /// * `Error::Bus` - SPI communication failed
    pub fn read_arm_memory(
        &mut self,
        address: u32,
        buf: &mut [u8],
        auto_increment: bool,
    ) -> Result<(), Error> {
        let region = Region::of(address, buf.len())?;
        if buf.is_empty() {
            return Ok(());
        }

        trace!(
            "ARM read {} bytes at {:#x} ({:?})",
            buf.len(),
            address,
            region
        );

        let mut flags = DmaFlags::READ | region.dma_flags();
        if auto_increment {
            flags |= DmaFlags::AUTO_INCREMENT;
        }
        self.bus.write_register(ArmDmaControl { flags })?;
        self.bus.write_register(ArmDmaAddress { address })?;

        for (offset, byte) in buf.iter_mut().enumerate() {
            let current = address + offset as u32;
            let index = current as usize % ARM_DMA_WINDOW;

            if !auto_increment && offset > 0 && index == 0 {
                self.bus.write_register(ArmDmaAddress { address: current })?;
            }

            *byte = self.bus.read_byte(ARM_DMA_DATA0 + index as u16)?;
        }

        Ok(())
    }

    /// Writes `data` to ARM memory.
    ///
    /// Writes always use auto-increment.
    ///
    /// # Errors
    /// * `Error::AddressOutOfRange` - Checked before any register access
    /// * `Error::Bus` - SPI communication failed
    pub fn write_arm_memory(&mut self, address: u32, data: &[u8]) -> Result<(), Error> {
        let region = Region::of(address, data.len())?;
        if data.is_empty() {
            return Ok(());
        }

        trace!(
            "ARM write {} bytes at {:#x} ({:?})",
            data.len(),
            address,
            region
        );

        let flags = DmaFlags::AUTO_INCREMENT | region.dma_flags();
        self.bus.write_register(ArmDmaControl { flags })?;
        self.bus.write_register(ArmDmaAddress { address })?;

        for (offset, byte) in data.iter().enumerate() {
            let index = (address as usize + offset) % ARM_DMA_WINDOW;
            self.bus.write_byte(ARM_DMA_DATA0 + index as u16, *byte)?;
        }

        Ok(())
    }
}
