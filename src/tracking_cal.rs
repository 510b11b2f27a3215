//! Tracking calibrations
//!
//! Tracking calibrations run continuously while the radio is on. They
//! are scheduled by the ARM according to:
//! - The enable mask in the calibration scheduler config object, which
//!   may only be changed in IDLE
//! - A suspend/resume state per calibration, changed with SET at any
//!   time for enabled calibrations
//! - Reschedule requests, which show up in the pending register until
//!   the calibration runs
//!
//! ```text
//! Disabled --enable (IDLE)--> Resumed <--suspend/resume--> Suspended
//! ```

use bitflags::bitflags;

use crate::commands::{
    object_id, GetAllTrackingCalStates, GetTrackingCalState, RescheduleTrackingCal,
    SetAllTrackingCalStates, SetTrackingCalState, TRACKING_ENABLE_OFFSET,
};
use crate::interface::{RegisterAccess, Timer};
use crate::radio::RadioState;
use crate::registers::TrackingCalPending;
use crate::{Device, Error};

bitflags! {
    /// Tracking calibration mask
    ///
    /// Bit order is fixed by the ARM firmware.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TrackingCalibrations: u32 {
        const RX1_QEC = 1 << 0;
        const RX2_QEC = 1 << 1;
        const ORX1_QEC = 1 << 2;
        const ORX2_QEC = 1 << 3;
        const TX1_LOL = 1 << 4;
        const TX2_LOL = 1 << 5;
        const TX1_QEC = 1 << 6;
        const TX2_QEC = 1 << 7;
        const TX1_DPD = 1 << 8;
        const TX2_DPD = 1 << 9;
        const TX1_CLGC = 1 << 10;
        const TX2_CLGC = 1 << 11;
        const TX1_VSWR = 1 << 12;
        const TX2_VSWR = 1 << 13;
        const ORX1_QEC_SNLO = 1 << 16;
        const ORX2_QEC_SNLO = 1 << 17;
        const SRX_QEC = 1 << 18;
    }
}

impl TrackingCalibrations {
    /// Calibrations enabled by a standard bring-up
    pub const DEFAULT: Self = Self::RX1_QEC
        .union(Self::RX2_QEC)
        .union(Self::TX1_QEC)
        .union(Self::TX2_QEC)
        .union(Self::ORX1_QEC)
        .union(Self::ORX2_QEC);
}

/// A single tracking calibration on one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrackingCal {
    Rx1Qec,
    Rx2Qec,
    ORx1Qec,
    ORx2Qec,
    Tx1Lol,
    Tx2Lol,
    Tx1Qec,
    Tx2Qec,
    Tx1Dpd,
    Tx2Dpd,
    Tx1Clgc,
    Tx2Clgc,
    Tx1Vswr,
    Tx2Vswr,
    ORx1QecSnlo,
    ORx2QecSnlo,
    SRxQec,
}

impl TrackingCal {
    /// Every tracking calibration, in mask bit order
    pub const ALL: [TrackingCal; 17] = [
        Self::Rx1Qec,
        Self::Rx2Qec,
        Self::ORx1Qec,
        Self::ORx2Qec,
        Self::Tx1Lol,
        Self::Tx2Lol,
        Self::Tx1Qec,
        Self::Tx2Qec,
        Self::Tx1Dpd,
        Self::Tx2Dpd,
        Self::Tx1Clgc,
        Self::Tx2Clgc,
        Self::Tx1Vswr,
        Self::Tx2Vswr,
        Self::ORx1QecSnlo,
        Self::ORx2QecSnlo,
        Self::SRxQec,
    ];

    /// ARM object id of the calibration.
    pub const fn object_id(self) -> u8 {
        match self {
            Self::Rx1Qec | Self::Rx2Qec => object_id::RXQEC_TRACKING,
            Self::ORx1Qec | Self::ORx2Qec => object_id::ORXQEC_TRACKING,
            Self::Tx1Lol | Self::Tx2Lol => object_id::TXLOL_TRACKING,
            Self::Tx1Qec | Self::Tx2Qec => object_id::TXQEC_TRACKING,
            Self::Tx1Dpd | Self::Tx2Dpd => object_id::DPD_TRACKING,
            Self::Tx1Clgc | Self::Tx2Clgc => object_id::CLGC_TRACKING,
            Self::Tx1Vswr | Self::Tx2Vswr => object_id::VSWR_TRACKING,
            Self::ORx1QecSnlo | Self::ORx2QecSnlo => object_id::ORXQEC_SNLO_TRACKING,
            Self::SRxQec => object_id::SRXQEC_TRACKING,
        }
    }

    /// Channel the calibration runs on (1 or 2).
    pub const fn channel(self) -> u8 {
        match self {
            Self::Rx2Qec
            | Self::ORx2Qec
            | Self::Tx2Lol
            | Self::Tx2Qec
            | Self::Tx2Dpd
            | Self::Tx2Clgc
            | Self::Tx2Vswr
            | Self::ORx2QecSnlo => 2,
            _ => 1,
        }
    }

    /// Enable mask bit of the calibration.
    pub const fn mask(self) -> TrackingCalibrations {
        match self {
            Self::Rx1Qec => TrackingCalibrations::RX1_QEC,
            Self::Rx2Qec => TrackingCalibrations::RX2_QEC,
            Self::ORx1Qec => TrackingCalibrations::ORX1_QEC,
            Self::ORx2Qec => TrackingCalibrations::ORX2_QEC,
            Self::Tx1Lol => TrackingCalibrations::TX1_LOL,
            Self::Tx2Lol => TrackingCalibrations::TX2_LOL,
            Self::Tx1Qec => TrackingCalibrations::TX1_QEC,
            Self::Tx2Qec => TrackingCalibrations::TX2_QEC,
            Self::Tx1Dpd => TrackingCalibrations::TX1_DPD,
            Self::Tx2Dpd => TrackingCalibrations::TX2_DPD,
            Self::Tx1Clgc => TrackingCalibrations::TX1_CLGC,
            Self::Tx2Clgc => TrackingCalibrations::TX2_CLGC,
            Self::Tx1Vswr => TrackingCalibrations::TX1_VSWR,
            Self::Tx2Vswr => TrackingCalibrations::TX2_VSWR,
            Self::ORx1QecSnlo => TrackingCalibrations::ORX1_QEC_SNLO,
            Self::ORx2QecSnlo => TrackingCalibrations::ORX2_QEC_SNLO,
            Self::SRxQec => TrackingCalibrations::SRX_QEC,
        }
    }

    /// Index of the calibration's pending/error bit pair in the pending
    /// register. Sniffer calibrations are not reported there.
    pub const fn pending_pair(self) -> Option<u8> {
        let family = match self {
            Self::Rx1Qec | Self::Rx2Qec => 0,
            Self::ORx1Qec | Self::ORx2Qec => 1,
            Self::Tx1Lol | Self::Tx2Lol => 2,
            Self::Tx1Qec | Self::Tx2Qec => 3,
            Self::Tx1Dpd | Self::Tx2Dpd => 4,
            Self::Tx1Clgc | Self::Tx2Clgc => 5,
            Self::Tx1Vswr | Self::Tx2Vswr => 6,
            Self::ORx1QecSnlo | Self::ORx2QecSnlo | Self::SRxQec => return None,
        };
        Some(2 * family + self.channel() - 1)
    }
}

/// Tracking calibration pending register contents
///
/// Seven calibration families on two channels each, one bit pair per
/// calibration: bit `2k` is pending and bit `2k + 1` is error, with
/// `k = 2 * family + channel - 1` in the order Rx QEC, ORx QEC, Tx LOL,
/// Tx QEC, DPD, CLGC, VSWR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PendingTrackingCals(u32);

impl PendingTrackingCals {
    const VALID_BITS: u32 = 0x0FFF_FFFF;

    /// Wraps a raw register value; bits above 27 are dropped.
    pub const fn from_bits(raw: u32) -> Self {
        Self(raw & Self::VALID_BITS)
    }

    /// Raw 28-bit value.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Calibration has a reschedule request waiting to run.
    pub fn is_pending(self, cal: TrackingCal) -> bool {
        cal.pending_pair()
            .is_some_and(|k| self.0 & (1 << (2 * k)) != 0)
    }

    /// Calibration reported an error on its last run.
    pub fn has_error(self, cal: TrackingCal) -> bool {
        cal.pending_pair()
            .is_some_and(|k| self.0 & (1 << (2 * k + 1)) != 0)
    }
}

impl<B, T> Device<B, T>
where
    B: RegisterAccess,
    T: Timer,
{
    /// Enables tracking calibrations.
    ///
    /// Writes the per-channel DPD and CLGC enable flags, then the
    /// scheduler enable mask. A failure after the first write leaves the
    /// earlier writes in place.
    ///
    /// # Errors
    /// * `Error::NotIdle` - ARM is not in IDLE; nothing is written
    /// * `Error::ConfigWriteFailed` - ARM rejected one of the writes
    pub fn enable_tracking_cals(&mut self, cals: TrackingCalibrations) -> Result<(), Error> {
        let state = self.radio_state()?;
        if state != RadioState::Idle {
            return Err(Error::NotIdle(state));
        }

        debug!("ARM enable tracking cals {:#x}", cals.bits());

        let dpd = channel_flags(cals, TrackingCal::Tx1Dpd, TrackingCal::Tx2Dpd);
        self.write_config(object_id::DPD_CONFIG, TRACKING_ENABLE_OFFSET, &[dpd])?;

        let clgc = channel_flags(cals, TrackingCal::Tx1Clgc, TrackingCal::Tx2Clgc);
        self.write_config(object_id::CLGC_CONFIG, TRACKING_ENABLE_OFFSET, &[clgc])?;

        self.write_config(object_id::CAL_SCHEDULER, 0, &cals.bits().to_le_bytes())
    }

    /// Reads the enabled tracking calibrations from the scheduler config.
    pub fn enabled_tracking_cals(&mut self) -> Result<TrackingCalibrations, Error> {
        let mut raw = [0u8; 4];
        self.read_config(object_id::CAL_SCHEDULER, 0, &mut raw)?;
        Ok(TrackingCalibrations::from_bits_retain(u32::from_le_bytes(raw)))
    }

    fn require_enabled(&mut self, cals: TrackingCalibrations) -> Result<(), Error> {
        let missing = cals - self.enabled_tracking_cals()?;
        if !missing.is_empty() {
            warn!("ARM tracking cals {:#x} not enabled", missing.bits());
            return Err(Error::CalibrationNotEnabled(missing.bits()));
        }
        Ok(())
    }

    /// Resumes the calibrations in `resumed` and suspends all others.
    ///
    /// # Errors
    /// * `Error::CalibrationNotEnabled` - `resumed` holds calibrations
    ///   that are not enabled; nothing is sent
    /// * `Error::ArmCommandError` - ARM rejected the SET
    pub fn set_all_tracking_cal_states(
        &mut self,
        resumed: TrackingCalibrations,
    ) -> Result<(), Error> {
        self.require_enabled(resumed)?;
        self.execute_command(SetAllTrackingCalStates { resumed })?;
        Ok(())
    }

    /// Reads the mask of resumed tracking calibrations.
    pub fn all_tracking_cal_states(&mut self) -> Result<TrackingCalibrations, Error> {
        Ok(self.execute_command(GetAllTrackingCalStates)?.cals)
    }

    /// Suspends or resumes a single tracking calibration.
    ///
    /// # Errors
    /// * `Error::CalibrationNotEnabled` - `cal` is not enabled; nothing
    ///   is sent
    /// * `Error::ArmCommandError` - ARM rejected the SET
    pub fn set_tracking_cal_state(&mut self, cal: TrackingCal, resumed: bool) -> Result<(), Error> {
        self.require_enabled(cal.mask())?;
        self.execute_command(SetTrackingCalState { cal, resumed })?;
        Ok(())
    }

    /// Returns true when `cal` is resumed.
    pub fn tracking_cal_state(&mut self, cal: TrackingCal) -> Result<bool, Error> {
        Ok(self.execute_command(GetTrackingCalState { cal })?.resumed)
    }

    /// Asks the ARM to run `cal` again as soon as possible.
    ///
    /// # Errors
    /// * `Error::InvalidRadioState` - ARM is neither IDLE nor RADIO_ON
    /// * `Error::ArmCommandError` - ARM rejected the SET
    pub fn reschedule_tracking_cal(&mut self, cal: TrackingCal) -> Result<(), Error> {
        let state = self.radio_state()?;
        if !matches!(state, RadioState::Idle | RadioState::RadioOn) {
            return Err(Error::InvalidRadioState(state));
        }

        debug!("ARM reschedule tracking cal {:?}", cal);
        self.execute_command(RescheduleTrackingCal { cal })?;
        Ok(())
    }

    /// Reads the tracking calibration pending register.
    pub fn pending_tracking_cals(&mut self) -> Result<PendingTrackingCals, Error> {
        let register: TrackingCalPending = self.bus.read_register()?;
        Ok(register.pending)
    }
}

/// Per-channel enable byte: bit 0 for channel 1, bit 1 for channel 2
fn channel_flags(cals: TrackingCalibrations, ch1: TrackingCal, ch2: TrackingCal) -> u8 {
    u8::from(cals.contains(ch1.mask())) | (u8::from(cals.contains(ch2.mask())) << 1)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;
    use crate::commands::{Opcode, CHANNEL_2_BIT, RESUME_BIT};
    use crate::sim;

    const SCHEDULED: [u8; 4] = [0x41, 0x00, 0x00, 0x00];

    fn enabled_device() -> crate::Device<sim::Sim, sim::FakeTimer> {
        let mut device = sim::device();
        device
            .bus_mut()
            .set_object(object_id::CAL_SCHEDULER, 0, &SCHEDULED);
        device
    }

    #[test]
    fn pending_pairs_follow_family_and_channel() {
        assert_eq!(TrackingCal::Rx1Qec.pending_pair(), Some(0));
        assert_eq!(TrackingCal::Rx2Qec.pending_pair(), Some(1));
        assert_eq!(TrackingCal::Tx2Vswr.pending_pair(), Some(13));
        assert_eq!(TrackingCal::SRxQec.pending_pair(), None);
    }

    #[test]
    fn masks_match_declaration_order() {
        let all = TrackingCal::ALL
            .iter()
            .fold(TrackingCalibrations::empty(), |acc, cal| acc | cal.mask());
        assert_eq!(all, TrackingCalibrations::all());
    }

    #[test]
    fn first_pending_bit_is_rx1_qec() {
        let mut device = sim::device();
        device.bus_mut().set_pending_register([0x01, 0x00, 0x00, 0x00]);

        let pending = device.pending_tracking_cals().unwrap();

        assert_eq!(pending.bits(), 0x01);
        for cal in TrackingCal::ALL {
            assert_eq!(pending.is_pending(cal), cal == TrackingCal::Rx1Qec);
            assert!(!pending.has_error(cal));
        }
    }

    #[test]
    fn pending_register_keeps_28_bits() {
        let pending = PendingTrackingCals::from_bits(0xF000_0008);
        assert_eq!(pending.bits(), 0x08);
        assert!(pending.has_error(TrackingCal::Rx2Qec));
        assert!(!pending.is_pending(TrackingCal::Rx2Qec));
    }

    #[test]
    fn enable_outside_idle_leaves_scheduler_untouched() {
        let mut device = enabled_device();
        device.bus_mut().set_radio_state(3);

        assert_eq!(
            device.enable_tracking_cals(TrackingCalibrations::DEFAULT),
            Err(Error::NotIdle(RadioState::RadioOn))
        );
        assert!(device.bus().issued_with(Opcode::WriteConfig).is_empty());
        assert_eq!(
            device.enabled_tracking_cals().unwrap().bits(),
            u32::from_le_bytes(SCHEDULED)
        );
    }

    #[test]
    fn enable_writes_channel_flags_before_scheduler_mask() {
        let mut device = sim::device();
        let cals = TrackingCalibrations::RX1_QEC
            | TrackingCalibrations::TX1_DPD
            | TrackingCalibrations::TX2_CLGC;

        device.enable_tracking_cals(cals).unwrap();

        let targets: Vec<u8> = device
            .bus()
            .issued_with(Opcode::WriteConfig)
            .iter()
            .map(|cmd| cmd.payload[0])
            .collect();
        assert_eq!(
            targets,
            [
                object_id::DPD_CONFIG,
                object_id::CLGC_CONFIG,
                object_id::CAL_SCHEDULER
            ]
        );
        assert_eq!(device.bus().object(object_id::DPD_CONFIG), [0x01]);
        assert_eq!(device.bus().object(object_id::CLGC_CONFIG), [0x02]);
        assert_eq!(device.enabled_tracking_cals().unwrap(), cals);
    }

    #[test]
    fn bulk_resume_requires_enabled_cals() {
        let mut device = enabled_device();

        assert_eq!(
            device.set_all_tracking_cal_states(
                TrackingCalibrations::RX1_QEC | TrackingCalibrations::TX1_LOL
            ),
            Err(Error::CalibrationNotEnabled(
                TrackingCalibrations::TX1_LOL.bits()
            ))
        );
        assert!(device.bus().issued_with(Opcode::Set).is_empty());

        device
            .set_all_tracking_cal_states(TrackingCalibrations::TX1_QEC)
            .unwrap();
        let issued = device.bus().issued_with(Opcode::Set);
        assert_eq!(
            issued[0].payload,
            [object_id::TRACKING_CAL_SUSPEND_RESUME, 0x40, 0x00, 0x00]
        );
    }

    #[test]
    fn single_state_change_requires_enabled_cal() {
        let mut device = enabled_device();

        assert_eq!(
            device.set_tracking_cal_state(TrackingCal::Rx2Qec, true),
            Err(Error::CalibrationNotEnabled(
                TrackingCalibrations::RX2_QEC.bits()
            ))
        );

        device
            .set_tracking_cal_state(TrackingCal::Rx1Qec, false)
            .unwrap();
        let issued = device.bus().issued_with(Opcode::Set);
        assert_eq!(issued.len(), 1);
        assert_eq!(
            issued[0].payload[..2],
            [
                object_id::TRACKING_CAL_SUSPEND_RESUME,
                object_id::RXQEC_TRACKING
            ]
        );
        assert_eq!(issued[0].payload[1] & (RESUME_BIT | CHANNEL_2_BIT), 0);
    }

    #[test]
    fn state_queries_decode_scratch_response() {
        let mut device = sim::device();
        device.bus_mut().get_responses.insert(
            object_id::TRACKING_CAL_SUSPEND_RESUME,
            Vec::from([0xC1, 0x00, 0x00, 0x00]),
        );

        assert!(device.tracking_cal_state(TrackingCal::Tx2Qec).unwrap());
        assert_eq!(
            device.all_tracking_cal_states().unwrap(),
            TrackingCalibrations::RX1_QEC
                | TrackingCalibrations::TX1_QEC
                | TrackingCalibrations::TX2_QEC
        );
    }

    #[test]
    fn reschedule_allowed_in_idle_and_radio_on_only() {
        let mut device = sim::device();

        device.reschedule_tracking_cal(TrackingCal::Tx2Dpd).unwrap();
        device.bus_mut().set_radio_state(3);
        device.reschedule_tracking_cal(TrackingCal::Tx2Dpd).unwrap();

        device.bus_mut().set_radio_state(1);
        assert_eq!(
            device.reschedule_tracking_cal(TrackingCal::Tx2Dpd),
            Err(Error::InvalidRadioState(RadioState::Ready))
        );
        assert_eq!(
            device.bus().issued_with(Opcode::Set)[0].payload,
            [object_id::TRACKING_CAL_PENDING, object_id::DPD_TRACKING, 1, 0]
        );
        assert_eq!(device.bus().issued_with(Opcode::Set).len(), 2);
    }
}
