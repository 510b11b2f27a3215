//! Command status decoding
//!
//! This module turns raw command status register contents into typed
//! values:
//! - [`CommandStatus`]: one opcode's pending flag and error code
//! - [`ArmCommandStatus`]: collapsed pending/error words for all opcodes
//!
//! Decoding is pure; reading the registers is done by
//! [`Device::read_command_status`](crate::Device::read_command_status)
//! and [`Device::read_command_status_byte`](crate::Device::read_command_status_byte).

use crate::registers::{ArmCommandStatusRegister, ARM_CMD_STATUS_BYTES};

/// Error code the ARM reports when an init calibration failed
pub const CALIBRATION_FAILED_CODE: u8 = 7;

/// Status of a single opcode
///
/// # Nibble Format
/// - Bit 0: Pending
/// - Bits 3:1: Error code
///
/// An error code may be left over from a previous run of the same opcode
/// until the opcode is triggered again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandStatus {
    /// ARM has not finished executing the opcode
    pub pending: bool,
    /// 3-bit error code, 0 on success
    pub error_code: u8,
}

impl CommandStatus {
    /// Decodes a status nibble (upper bits are ignored).
    pub const fn from_nibble(nibble: u8) -> Self {
        Self {
            pending: nibble & 0x01 != 0,
            error_code: (nibble >> 1) & 0x07,
        }
    }

    /// Re-encodes the status as a nibble.
    pub const fn nibble(self) -> u8 {
        ((self.error_code & 0x07) << 1) | self.pending as u8
    }

    /// Opcode finished without error.
    pub const fn is_complete(self) -> bool {
        !self.pending && self.error_code == 0
    }
}

/// Collapsed view of all command status slots
///
/// Bit `n` of each word belongs to opcode `2 * n`. An error bit is set
/// when the slot's error code is non-zero; the code itself is not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ArmCommandStatus {
    /// One bit per opcode with a non-zero error code
    pub error_mask: u16,
    /// One bit per opcode still pending
    pub pending_mask: u16,
}

impl From<[u8; ARM_CMD_STATUS_BYTES]> for ArmCommandStatus {
    fn from(bytes: [u8; ARM_CMD_STATUS_BYTES]) -> Self {
        let mut status = Self::default();

        for (i, byte) in bytes.iter().enumerate() {
            let weight = 2 * i as u32;

            let pending = (((byte & 0x10) >> 3) | (byte & 0x01)) as u16;
            status.pending_mask |= pending << weight;

            if byte & 0x0E != 0 {
                status.error_mask |= 0x0001 << weight;
            }
            if byte & 0xE0 != 0 {
                status.error_mask |= 0x0002 << weight;
            }
        }

        status
    }
}

impl From<ArmCommandStatusRegister> for ArmCommandStatus {
    fn from(register: ArmCommandStatusRegister) -> Self {
        Self::from(register.bytes)
    }
}
