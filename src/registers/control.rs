//! ARM core control register

use core::convert::Infallible;

use bitflags::bitflags;
use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

bitflags! {
    /// ARM core control bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ArmControlFlags: u8 {
        /// Hold the ARM core in reset
        const RESET = 1 << 0;
        /// Release the core to execute from program memory
        const RUN = 1 << 1;
        /// ARM clock enable
        const CLOCK_ENABLE = 1 << 4;
    }
}

/// ARM control register (address: 0x0D00)
///
/// # Important Notes
/// - Program memory may only be loaded while the core is held in reset
/// - Setting `RUN` with `RESET` clear boots the firmware, which then
///   verifies its own checksum and moves to READY
#[register(0x0D00u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister)]
pub struct ArmControl {
    pub flags: ArmControlFlags,
}

impl FromByteArray for ArmControl {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            flags: ArmControlFlags::from_bits_truncate(bytes[0]),
        })
    }
}

impl ToByteArray for ArmControl {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.flags.bits()])
    }
}
