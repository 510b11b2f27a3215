//! ARM memory DMA registers
//!
//! The host reaches ARM program and data memory through a small DMA
//! engine: a control register selecting direction, region and address
//! auto-increment, a 32-bit address register, and a 4-byte data window.
//!
//! # Access Window
//! - Data byte `n` of the window maps to ARM address `(addr & !3) + n`
//! - With auto-increment, touching `DATA3` advances the address by 4
//! - Without auto-increment the address must be rewritten for each word

use core::convert::Infallible;

use bitflags::bitflags;
use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// First byte of the 4-byte DMA data window (`DATA0`)
pub const ARM_DMA_DATA0: u16 = 0x0D45;

/// Number of bytes in the DMA data window
pub const ARM_DMA_WINDOW: usize = 4;

bitflags! {
    /// DMA control bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DmaFlags: u8 {
        /// Transfer direction: set for ARM-to-host reads
        const READ = 1 << 7;
        /// Advance the address after each access to `DATA3`
        const AUTO_INCREMENT = 1 << 4;
        /// Region select: set for data memory, clear for program memory
        const DATA_REGION = 1 << 3;
    }
}

/// DMA control register (address: 0x0D40)
///
/// # Important Notes
/// - Must be written before every transfer; other API calls may have
///   left it in any state
/// - Region select must match the region of the address being accessed
#[register(0x0D40u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct ArmDmaControl {
    /// Control bits
    pub flags: DmaFlags,
}

/// DMA address register (address: 0x0D41..=0x0D44)
///
/// 32-bit ARM address, least significant byte at the lowest register
/// address. The DMA engine latches the address when the most significant
/// byte is written.
#[register(0x0D41u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister, Default)]
pub struct ArmDmaAddress {
    /// ARM memory address
    pub address: u32,
}

impl FromByteArray for ArmDmaControl {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            flags: DmaFlags::from_bits_truncate(bytes[0]),
        })
    }
}

impl ToByteArray for ArmDmaControl {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.flags.bits()])
    }
}

impl FromByteArray for ArmDmaAddress {
    type Error = Infallible;
    type Array = [u8; 4];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            address: u32::from_le_bytes(bytes),
        })
    }
}

impl ToByteArray for ArmDmaAddress {
    type Error = Infallible;
    type Array = [u8; 4];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.address.to_le_bytes())
    }
}
