//! ARM mailbox registers
//!
//! The mailbox is the only command path into the ARM:
//! - Up to 4 extended payload bytes are written to `EXT_CMD_BYTE_1..4`
//! - Writing the opcode to `ARM_COMMAND` triggers execution
//! - The ARM reports per-opcode progress in 8 command status bytes
//!
//! These addresses are a wire contract with the ARM firmware image and
//! must not change.

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

use crate::commands::Opcode;
use crate::radio::RadioState;
use crate::tracking_cal::PendingTrackingCals;

/// First extended command payload byte (`EXT_CMD_BYTE_1`)
pub const ARM_EXT_CMD_BYTE_1: u16 = 0x0D4A;

/// Number of extended command payload bytes
pub const ARM_EXT_CMD_BYTES: usize = 4;

/// First command status byte (`CMD_STATUS_0`)
pub const ARM_CMD_STATUS_0: u16 = 0x0D51;

/// Number of command status bytes
pub const ARM_CMD_STATUS_BYTES: usize = 8;

/// ARM command register (address: 0x0D49)
///
/// Writing an opcode triggers its execution using whatever is currently
/// held in the extended payload bytes.
///
/// # Important Notes
/// - Bit 7 reads back as the mailbox busy flag
/// - A new opcode must not be written while busy is set
#[register(0x0D49u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, WritableRegister, Default)]
pub struct ArmCommand {
    /// Mailbox busy flag (read only)
    pub busy: bool,
    /// Opcode of the last command written
    pub opcode: u8,
}

/// ARM command status registers (address: 0x0D51..=0x0D58)
///
/// Sixteen 4-bit slots, two per byte. Each slot belongs to one even
/// opcode and holds a pending flag in bit 0 and a 3-bit error code in
/// bits 3:1. The slot of opcode `n` lives in byte `n / 4`, in the high
/// nibble when `(n / 2) % 2 == 1`.
#[register(0x0D51u16)]
#[derive(Debug, Clone, Copy, ReadableRegister, Default, PartialEq, Eq)]
pub struct ArmCommandStatusRegister {
    /// Raw status bytes
    pub bytes: [u8; ARM_CMD_STATUS_BYTES],
}

impl ArmCommandStatusRegister {
    /// Returns the raw 4-bit slot belonging to `opcode`.
    pub fn nibble(&self, opcode: Opcode) -> u8 {
        opcode.status_slot().extract(self.bytes)
    }
}

/// Radio state register (address: 0x0D59)
///
/// Reports the coarse lifecycle state of the ARM firmware.
#[register(0x0D59u16)]
#[derive(Debug, Clone, Copy, ReadableRegister)]
pub struct RadioStatus {
    /// Decoded state
    pub state: RadioState,
}

/// Tracking calibration pending register (address: 0x0D5A..=0x0D5D)
///
/// 28 bits of interleaved pending/error flags for seven tracking
/// calibration families on two channels each.
#[register(0x0D5Au16)]
#[derive(Debug, Clone, Copy, ReadableRegister)]
pub struct TrackingCalPending {
    /// Decoded pending/error flags
    pub pending: PendingTrackingCals,
}

impl FromByteArray for ArmCommand {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            busy: bytes[0] & 0x80 != 0,
            opcode: bytes[0] & 0x7F,
        })
    }
}

impl ToByteArray for ArmCommand {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.opcode])
    }
}

impl FromByteArray for ArmCommandStatusRegister {
    type Error = Infallible;
    type Array = [u8; ARM_CMD_STATUS_BYTES];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self { bytes })
    }
}

impl FromByteArray for RadioStatus {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            state: RadioState::from(bytes[0]),
        })
    }
}

impl FromByteArray for TrackingCalPending {
    type Error = Infallible;
    type Array = [u8; 4];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            pending: PendingTrackingCals::from_bits(u32::from_le_bytes(bytes)),
        })
    }
}
