//! Init calibration and radio control commands
//!
//! This module contains the commands that drive the ARM's one-shot
//! calibrations and its radio on/off transitions:
//! - RUNINIT with a calibration mask
//! - ABORT, which also serves as radio off
//! - RADIOON
//! - GET of the init calibration status object
//!
//! RUNINIT does not block; completion is observed through the RUNINIT
//! status slot.

use core::convert::Infallible;

use regiface::{Command, FromByteArray, NoParameters, ToByteArray};

use super::object::{object_id, ObjectSelect};
use crate::init_cal::InitCalibrations;

/// Little-endian 32-bit calibration mask payload
#[derive(Debug, Clone, Copy)]
pub struct CalMask(pub u32);

impl ToByteArray for CalMask {
    type Error = Infallible;
    type Array = [u8; 4];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok(self.0.to_le_bytes())
    }
}

/// RunInitCals command (RUNINIT, 0x02)
///
/// Starts the selected init calibrations.
///
/// # Important Notes
/// - ARM must be in IDLE
/// - Returns as soon as the command is accepted
/// - Completion is reported through the RUNINIT status slot
/// - Error code 7 means a calibration failed; details are in the
///   init calibration status object
#[derive(Debug, Clone)]
pub struct RunInitCals {
    /// Calibrations to run
    pub cals: InitCalibrations,
}

impl Command for RunInitCals {
    type IdType = u8;
    type CommandParameters = CalMask;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        0x02
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        CalMask(self.cals.bits())
    }
}

/// Abort command (ABORT, 0x00)
///
/// Stops a running init calibration, or moves the ARM from RADIO_ON
/// back to IDLE.
#[derive(Debug, Clone)]
pub struct Abort;

impl Command for Abort {
    type IdType = u8;
    type CommandParameters = NoParameters;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        0x00
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// RadioOn command (RADIOON, 0x04)
///
/// Moves the ARM from IDLE to RADIO_ON, starting enabled tracking
/// calibrations.
#[derive(Debug, Clone)]
pub struct RadioOn;

impl Command for RadioOn {
    type IdType = u8;
    type CommandParameters = NoParameters;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        0x04
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        NoParameters::default()
    }
}

/// Init calibration status object
///
/// # Layout (14 bytes, little-endian)
/// - Bytes 0-3: Calibrations completed since power up
/// - Bytes 4-7: Calibrations completed by the last RUNINIT
/// - Bytes 8-11: Calibrations the ARM requires before RADIO_ON
/// - Byte 12: Id of the failing calibration
/// - Byte 13: ARM error code of the failing calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitCalStatus {
    /// Calibrations completed since power up
    pub lifetime: InitCalibrations,
    /// Calibrations completed by the most recent run
    pub last_run: InitCalibrations,
    /// Calibrations required before the radio may be enabled
    pub minimum_required: InitCalibrations,
    /// Id of the calibration that failed
    pub failing_cal_id: u8,
    /// ARM internal error code of the failing calibration
    pub failing_cal_code: u8,
}

impl FromByteArray for InitCalStatus {
    type Error = Infallible;
    type Array = [u8; 14];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        let mask = |at: usize| {
            InitCalibrations::from_bits_retain(u32::from_le_bytes([
                bytes[at],
                bytes[at + 1],
                bytes[at + 2],
                bytes[at + 3],
            ]))
        };

        Ok(Self {
            lifetime: mask(0),
            last_run: mask(4),
            minimum_required: mask(8),
            failing_cal_id: bytes[12],
            failing_cal_code: bytes[13],
        })
    }
}

/// GetInitCalStatus command (GET, 0x0C)
///
/// Places the 14-byte init calibration status object in the scratch
/// area.
#[derive(Debug, Clone)]
pub struct GetInitCalStatus;

impl Command for GetInitCalStatus {
    type IdType = u8;
    type CommandParameters = ObjectSelect;
    type ResponseParameters = InitCalStatus;

    fn id() -> Self::IdType {
        0x0C
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        ObjectSelect {
            object_id: object_id::INIT_CAL_DONE,
        }
    }
}

/// Leading completed-calibration mask of the init calibration status object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitCalsCompleted {
    /// Calibrations completed
    pub cals: InitCalibrations,
}

impl FromByteArray for InitCalsCompleted {
    type Error = Infallible;
    type Array = [u8; 4];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            cals: InitCalibrations::from_bits_retain(u32::from_le_bytes(bytes)),
        })
    }
}

/// GetInitCalsCompleted command (GET, 0x0C)
///
/// Same object as [`GetInitCalStatus`], reading back only the
/// completed-calibration mask. Used after an abort.
#[derive(Debug, Clone)]
pub struct GetInitCalsCompleted;

impl Command for GetInitCalsCompleted {
    type IdType = u8;
    type CommandParameters = ObjectSelect;
    type ResponseParameters = InitCalsCompleted;

    fn id() -> Self::IdType {
        0x0C
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        ObjectSelect {
            object_id: object_id::INIT_CAL_DONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_init_payload_is_little_endian_mask() {
        let cmd = RunInitCals {
            cals: InitCalibrations::from_bits_retain(0x0001_0207),
        };
        let payload = cmd.invoking_parameters().to_bytes().unwrap();
        assert_eq!(payload, [0x07, 0x02, 0x01, 0x00]);
        assert_eq!(RunInitCals::id(), 0x02);
    }

    #[test]
    fn init_cal_status_decodes_all_fields() {
        let bytes = [
            0xFF, 0x00, 0x00, 0x00, // lifetime
            0x07, 0x00, 0x00, 0x00, // last run
            0x03, 0x00, 0x00, 0x00, // minimum required
            0x05, // failing cal id
            0x2A, // failing cal code
        ];
        let status = InitCalStatus::from_bytes(bytes).unwrap();
        assert_eq!(status.lifetime.bits(), 0xFF);
        assert_eq!(status.last_run.bits(), 0x07);
        assert_eq!(status.minimum_required.bits(), 0x03);
        assert_eq!(status.failing_cal_id, 5);
        assert_eq!(status.failing_cal_code, 0x2A);
    }
}
