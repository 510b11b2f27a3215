//! Driver error type
//!
//! Errors fall into four groups:
//!
//! - Argument errors ([`Error::InvalidOpcode`], [`Error::InvalidPayloadLength`],
//!   [`Error::AddressOutOfRange`], [`Error::InvalidFirmwareSize`],
//!   [`Error::CalibrationNotEnabled`],
//!   [`Error::NotIdle`], [`Error::InvalidRadioState`]) are raised before
//!   any register is touched and are safe to retry with corrected input.
//! - Transport errors ([`Error::Bus`], [`Error::MailboxBusyTimeout`],
//!   [`Error::CommandTimeout`], [`Error::WaitTimeout`],
//!   [`Error::ChecksumTimeout`]) mean the device did not answer in time or
//!   the SPI transfer failed.
//! - [`Error::ChecksumMismatch`] means the loaded firmware image is
//!   corrupt and the ARM must be reloaded.
//! - Command errors ([`Error::CommandError`], [`Error::ArmCommandError`],
//!   [`Error::CalibrationFailed`], [`Error::ConfigWriteFailed`],
//!   [`Error::ConfigReadFailed`]) carry the ARM's error code untouched.
//! - State errors ([`Error::ProfileError`], [`Error::CalError`],
//!   [`Error::Exception`]) persist until the ARM is reset.

use core::fmt;

use crate::commands::Opcode;
use crate::radio::RadioState;

/// Errors returned by the ARM mailbox driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// SPI communication failed
    Bus,
    /// Response bytes were rejected while decoding
    Deserialization,
    /// Opcode is odd or above 30
    InvalidOpcode(u8),
    /// Extended payload is longer than the opcode accepts
    InvalidPayloadLength(usize),
    /// Access does not lie entirely inside one ARM memory region
    AddressOutOfRange {
        /// First byte of the rejected access
        address: u32,
        /// Number of bytes requested
        length: usize,
    },
    /// Firmware image is not exactly the size of ARM program memory
    InvalidFirmwareSize(usize),
    /// Requested tracking calibrations are not enabled (offending bits)
    CalibrationNotEnabled(u32),
    /// Operation requires the ARM to be in the IDLE state
    NotIdle(RadioState),
    /// Operation is not permitted in the current radio state
    InvalidRadioState(RadioState),
    /// ARM mailbox stayed busy past the configured timeout
    MailboxBusyTimeout,
    /// Opcode's pending bit did not clear before the timeout
    CommandTimeout(Opcode),
    /// Radio state did not reach an accepted state before the timeout
    WaitTimeout,
    /// ARM did not publish its firmware checksum before the timeout
    ChecksumTimeout,
    /// Checksum computed by the ARM differs from the one in the image
    ChecksumMismatch {
        /// Checksum stored in the firmware image
        expected: u32,
        /// Checksum computed by the ARM over program memory
        calculated: u32,
    },
    /// Completion nibble reported a non-zero error code
    CommandError {
        /// Opcode that failed
        opcode: Opcode,
        /// 3-bit error code from the status nibble
        code: u8,
    },
    /// ARM rejected a calibration or object command
    ArmCommandError(u8),
    /// An init calibration failed
    CalibrationFailed {
        /// Id of the failing calibration
        cal_id: u8,
        /// ARM internal error code of the failing calibration
        code: u8,
    },
    /// WRITECFG completed with an error code
    ConfigWriteFailed(u8),
    /// READCFG completed with an error code
    ConfigReadFailed(u8),
    /// ARM rejected the loaded profile
    ProfileError,
    /// ARM latched a calibration error
    CalError,
    /// ARM firmware raised an exception
    Exception,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Bus => f.write_str("SPI bus error"),
            Error::Deserialization => f.write_str("failed to decode response"),
            Error::InvalidOpcode(op) => write!(f, "invalid ARM opcode {op}"),
            Error::InvalidPayloadLength(len) => {
                write!(f, "invalid extended payload length {len}")
            }
            Error::AddressOutOfRange { address, length } => write!(
                f,
                "ARM memory access of {length} bytes at {address:#010x} is out of range"
            ),
            Error::InvalidFirmwareSize(len) => write!(f, "invalid ARM firmware size {len}"),
            Error::CalibrationNotEnabled(mask) => {
                write!(f, "tracking calibrations {mask:#x} are not enabled")
            }
            Error::NotIdle(state) => write!(f, "ARM is not idle (state {state:?})"),
            Error::InvalidRadioState(state) => {
                write!(f, "operation not allowed in radio state {state:?}")
            }
            Error::MailboxBusyTimeout => f.write_str("timed out waiting for ARM mailbox"),
            Error::CommandTimeout(op) => write!(f, "ARM command {op:?} timed out"),
            Error::WaitTimeout => f.write_str("timed out waiting for radio state"),
            Error::ChecksumTimeout => f.write_str("timed out waiting for ARM checksum"),
            Error::ChecksumMismatch {
                expected,
                calculated,
            } => write!(
                f,
                "ARM checksum mismatch: expected {expected:#010x}, calculated {calculated:#010x}"
            ),
            Error::CommandError { opcode, code } => {
                write!(f, "ARM command {opcode:?} failed with code {code}")
            }
            Error::ArmCommandError(code) => write!(f, "ARM command error {code}"),
            Error::CalibrationFailed { cal_id, code } => {
                write!(f, "init calibration {cal_id} failed with code {code}")
            }
            Error::ConfigWriteFailed(code) => write!(f, "ARM config write failed ({code})"),
            Error::ConfigReadFailed(code) => write!(f, "ARM config read failed ({code})"),
            Error::ProfileError => f.write_str("ARM profile error"),
            Error::CalError => f.write_str("ARM calibration error"),
            Error::Exception => f.write_str("ARM exception"),
        }
    }
}
