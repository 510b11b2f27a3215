//! Config object and tracking calibration commands
//!
//! ARM data memory is organised into objects addressed by an 8-bit id
//! and a byte offset rather than by raw address:
//! - WRITECFG/READCFG move bytes between the scratch area and a config
//!   object
//! - SET/GET apply or query control and status objects
//!
//! Tracking calibrations are controlled exclusively through SET/GET of
//! dedicated objects.

use core::convert::Infallible;

use regiface::{Command, FromByteArray, NoParameters, ToByteArray};

use crate::tracking_cal::{TrackingCal, TrackingCalibrations};

/// ARM object ids
///
/// These ids are fixed by the ARM firmware image.
pub mod object_id {
    /// Init calibration status/done object
    pub const INIT_CAL_DONE: u8 = 0x43;
    /// Tracking calibration suspend/resume control
    pub const TRACKING_CAL_SUSPEND_RESUME: u8 = 0x4F;
    /// Tracking calibration reschedule request
    pub const TRACKING_CAL_PENDING: u8 = 0x4D;
    /// Calibration scheduler config (tracking calibration enable mask)
    pub const CAL_SCHEDULER: u8 = 0x83;
    /// DPD config object
    pub const DPD_CONFIG: u8 = 0x24;
    /// CLGC config object
    pub const CLGC_CONFIG: u8 = 0x25;

    /// Rx QEC tracking calibration
    pub const RXQEC_TRACKING: u8 = 0x20;
    /// ORx QEC tracking calibration
    pub const ORXQEC_TRACKING: u8 = 0x21;
    /// Tx LO leakage tracking calibration
    pub const TXLOL_TRACKING: u8 = 0x22;
    /// Tx QEC tracking calibration
    pub const TXQEC_TRACKING: u8 = 0x23;
    /// DPD tracking calibration
    pub const DPD_TRACKING: u8 = 0x24;
    /// CLGC tracking calibration
    pub const CLGC_TRACKING: u8 = 0x25;
    /// VSWR tracking calibration
    pub const VSWR_TRACKING: u8 = 0x26;
    /// ORx QEC with sniffer LO tracking calibration
    pub const ORXQEC_SNLO_TRACKING: u8 = 0x27;
    /// Sniffer Rx QEC tracking calibration
    pub const SRXQEC_TRACKING: u8 = 0x28;
}

/// Byte offset of the per-channel tracking enable flags inside the DPD
/// and CLGC config objects
pub const TRACKING_ENABLE_OFFSET: u16 = 0x0000;

/// Suspend/resume payload bit: set to resume, clear to suspend
pub const RESUME_BIT: u8 = 1 << 6;

/// Suspend/resume payload bit: set for channel 2
pub const CHANNEL_2_BIT: u8 = 1 << 7;

/// Single object id payload
#[derive(Debug, Clone, Copy)]
pub struct ObjectSelect {
    /// Object to act on
    pub object_id: u8,
}

impl ToByteArray for ObjectSelect {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.object_id])
    }
}

/// WRITECFG/READCFG payload
///
/// # Payload Format
/// - Byte 0: Object id
/// - Bytes 1-2: Byte offset within the object (little-endian)
/// - Byte 3: Number of bytes to transfer
#[derive(Debug, Clone, Copy)]
pub struct ConfigAccess {
    /// Config object id
    pub object_id: u8,
    /// Byte offset within the object
    pub offset: u16,
    /// Number of bytes to transfer
    pub length: u8,
}

impl ToByteArray for ConfigAccess {
    type Error = Infallible;
    type Array = [u8; 4];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let [offset_low, offset_high] = self.offset.to_le_bytes();
        Ok([self.object_id, offset_low, offset_high, self.length])
    }
}

/// WriteConfig command (WRITECFG, 0x06)
///
/// Copies `length` bytes from the scratch area into a config object.
/// The caller must have written the bytes to the scratch area first.
#[derive(Debug, Clone)]
pub struct WriteConfig {
    /// Object, offset and length to write
    pub access: ConfigAccess,
}

impl Command for WriteConfig {
    type IdType = u8;
    type CommandParameters = ConfigAccess;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        0x06
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.access
    }
}

/// ReadConfig command (READCFG, 0x08)
///
/// Copies `length` bytes of a config object into the scratch area.
#[derive(Debug, Clone)]
pub struct ReadConfig {
    /// Object, offset and length to read
    pub access: ConfigAccess,
}

impl Command for ReadConfig {
    type IdType = u8;
    type CommandParameters = ConfigAccess;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        0x08
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        self.access
    }
}

/// Object id followed by one argument byte
#[derive(Debug, Clone, Copy)]
pub struct ObjectArgument {
    /// Object to act on
    pub object_id: u8,
    /// Argument byte
    pub argument: u8,
}

impl ToByteArray for ObjectArgument {
    type Error = Infallible;
    type Array = [u8; 2];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.object_id, self.argument])
    }
}

/// Suspend/resume selector byte for a single tracking calibration
fn cal_selector(cal: TrackingCal) -> u8 {
    let mut selector = cal.object_id();
    if cal.channel() == 2 {
        selector |= CHANNEL_2_BIT;
    }
    selector
}

/// SetTrackingCalState command (SET, 0x0A)
///
/// Suspends or resumes a single tracking calibration.
///
/// # Payload Format
/// - Byte 0: Suspend/resume object id
/// - Byte 1: Calibration object id | resume bit (6) | channel 2 bit (7)
///
/// # Important Notes
/// - The calibration must be enabled
/// - A suspended calibration keeps its enable bit
#[derive(Debug, Clone)]
pub struct SetTrackingCalState {
    /// Calibration to control
    pub cal: TrackingCal,
    /// Resume when true, suspend when false
    pub resumed: bool,
}

impl Command for SetTrackingCalState {
    type IdType = u8;
    type CommandParameters = ObjectArgument;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        0x0A
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        let mut argument = cal_selector(self.cal);
        if self.resumed {
            argument |= RESUME_BIT;
        }
        ObjectArgument {
            object_id: object_id::TRACKING_CAL_SUSPEND_RESUME,
            argument,
        }
    }
}

/// Suspend/resume state of one tracking calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrackingCalState {
    /// Calibration is running
    pub resumed: bool,
}

impl FromByteArray for TrackingCalState {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            resumed: bytes[0] != 0,
        })
    }
}

/// GetTrackingCalState command (GET, 0x0C)
///
/// Reads the suspend/resume state of a single tracking calibration.
#[derive(Debug, Clone)]
pub struct GetTrackingCalState {
    /// Calibration to query
    pub cal: TrackingCal,
}

impl Command for GetTrackingCalState {
    type IdType = u8;
    type CommandParameters = ObjectArgument;
    type ResponseParameters = TrackingCalState;

    fn id() -> Self::IdType {
        0x0C
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        ObjectArgument {
            object_id: object_id::TRACKING_CAL_SUSPEND_RESUME,
            argument: cal_selector(self.cal),
        }
    }
}

/// Bulk suspend/resume payload
///
/// # Payload Format
/// - Byte 0: Suspend/resume object id
/// - Bytes 1-3: Low 24 bits of the tracking calibration mask
///   (little-endian), set bits resume and clear bits suspend
#[derive(Debug, Clone, Copy)]
pub struct SuspendResumeMask {
    /// Calibrations to leave running
    pub resumed: TrackingCalibrations,
}

impl ToByteArray for SuspendResumeMask {
    type Error = Infallible;
    type Array = [u8; 4];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        let [b0, b1, b2, _] = self.resumed.bits().to_le_bytes();
        Ok([object_id::TRACKING_CAL_SUSPEND_RESUME, b0, b1, b2])
    }
}

/// SetAllTrackingCalStates command (SET, 0x0A)
///
/// Resumes every calibration in the mask and suspends every other
/// enabled calibration.
#[derive(Debug, Clone)]
pub struct SetAllTrackingCalStates {
    /// Calibrations to leave running
    pub resumed: TrackingCalibrations,
}

impl Command for SetAllTrackingCalStates {
    type IdType = u8;
    type CommandParameters = SuspendResumeMask;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        0x0A
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        SuspendResumeMask {
            resumed: self.resumed,
        }
    }
}

/// Tracking calibration mask read back from the scratch area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingCalMask {
    /// Calibrations in the mask
    pub cals: TrackingCalibrations,
}

impl FromByteArray for TrackingCalMask {
    type Error = Infallible;
    type Array = [u8; 4];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            cals: TrackingCalibrations::from_bits_retain(u32::from_le_bytes(bytes)),
        })
    }
}

/// GetAllTrackingCalStates command (GET, 0x0C)
///
/// Reads the mask of currently resumed tracking calibrations.
#[derive(Debug, Clone)]
pub struct GetAllTrackingCalStates;

impl Command for GetAllTrackingCalStates {
    type IdType = u8;
    type CommandParameters = ObjectSelect;
    type ResponseParameters = TrackingCalMask;

    fn id() -> Self::IdType {
        0x0C
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        ObjectSelect {
            object_id: object_id::TRACKING_CAL_SUSPEND_RESUME,
        }
    }
}

/// Reschedule payload
///
/// # Payload Format
/// - Byte 0: Tracking calibration pending object id
/// - Byte 1: Calibration object id
/// - Byte 2: Channel selector (0 = channel 1, 1 = channel 2)
#[derive(Debug, Clone, Copy)]
pub struct RescheduleRequest {
    /// Calibration to reschedule
    pub cal: TrackingCal,
}

impl ToByteArray for RescheduleRequest {
    type Error = Infallible;
    type Array = [u8; 3];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([
            object_id::TRACKING_CAL_PENDING,
            self.cal.object_id(),
            self.cal.channel() - 1,
        ])
    }
}

/// RescheduleTrackingCal command (SET, 0x0A)
///
/// Asks the scheduler to run a tracking calibration again as soon as
/// possible. The request shows up as a pending bit until it runs.
#[derive(Debug, Clone)]
pub struct RescheduleTrackingCal {
    /// Calibration to reschedule
    pub cal: TrackingCal,
}

impl Command for RescheduleTrackingCal {
    type IdType = u8;
    type CommandParameters = RescheduleRequest;
    type ResponseParameters = NoParameters;

    fn id() -> Self::IdType {
        0x0A
    }

    fn invoking_parameters(self) -> Self::CommandParameters {
        RescheduleRequest { cal: self.cal }
    }
}
