//! Init calibrations
//!
//! One-shot calibrations run from IDLE before the radio is enabled. A
//! run is started with a calibration mask, then awaited through the
//! RUNINIT status slot. When a calibration fails the ARM reports
//! [`CALIBRATION_FAILED_CODE`] and records the failing calibration in
//! the init calibration status object.
//!
//! # Typical Sequence
//! 1. [`Device::run_init_cals`] with the calibrations to run
//! 2. [`Device::wait_init_cals`] until done
//! 3. On failure, [`Device::abort_init_cals`] to stop and learn which
//!    calibrations completed
//!
//! [`Device::setup_calibrations`] performs this sequence including the
//! external LO leakage pass and tracking calibration enable.

use bitflags::bitflags;

use crate::commands::{
    Abort, GetInitCalStatus, GetInitCalsCompleted, InitCalStatus, Opcode, RunInitCals,
    CALIBRATION_FAILED_CODE,
};
use crate::interface::{RegisterAccess, Timer};
use crate::tracking_cal::TrackingCalibrations;
use crate::{Device, Error};

bitflags! {
    /// Init calibration mask
    ///
    /// Bit order is fixed by the ARM firmware.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InitCalibrations: u32 {
        const TX_BB_FILTER = 1 << 0;
        const ADC_TUNER = 1 << 1;
        const TIA_3DB_CORNER = 1 << 2;
        const DC_OFFSET = 1 << 3;
        const TX_ATTENUATION_DELAY = 1 << 4;
        const RX_GAIN_DELAY = 1 << 5;
        const FLASH_CAL = 1 << 6;
        const PATH_DELAY = 1 << 7;
        const TX_LO_LEAKAGE_INTERNAL = 1 << 8;
        /// Needs the external loopback path; run as a separate pass
        const TX_LO_LEAKAGE_EXTERNAL = 1 << 9;
        const TX_QEC_INIT = 1 << 10;
        const LOOPBACK_RX_LO_DELAY = 1 << 11;
        const LOOPBACK_RX_RX_QEC_INIT = 1 << 12;
        const RX_LO_DELAY = 1 << 13;
        const RX_QEC_INIT = 1 << 14;
        const DPD_INIT = 1 << 15;
        const CLGC_INIT = 1 << 16;
        const VSWR_INIT = 1 << 17;
    }
}

impl InitCalibrations {
    /// Calibrations run by a standard bring-up
    pub const DEFAULT: Self = Self::TX_BB_FILTER
        .union(Self::ADC_TUNER)
        .union(Self::TIA_3DB_CORNER)
        .union(Self::DC_OFFSET)
        .union(Self::TX_ATTENUATION_DELAY)
        .union(Self::RX_GAIN_DELAY)
        .union(Self::FLASH_CAL)
        .union(Self::PATH_DELAY)
        .union(Self::TX_LO_LEAKAGE_INTERNAL)
        .union(Self::TX_QEC_INIT)
        .union(Self::LOOPBACK_RX_LO_DELAY)
        .union(Self::LOOPBACK_RX_RX_QEC_INIT)
        .union(Self::RX_LO_DELAY)
        .union(Self::RX_QEC_INIT);

    /// Default time allowed for an init calibration run
    pub const DEFAULT_TIMEOUT_MS: u32 = 60_000;
}

impl<B, T> Device<B, T>
where
    B: RegisterAccess,
    T: Timer,
{
    /// Starts the selected init calibrations without waiting.
    pub fn run_init_cals(&mut self, cals: InitCalibrations) -> Result<(), Error> {
        debug!("ARM run init cals {:#x}", cals.bits());
        self.send_command(RunInitCals { cals })
    }

    /// Waits for a running init calibration to finish.
    ///
    /// # Errors
    /// * `Error::CalibrationFailed` - A calibration failed; the failing
    ///   calibration id and code come from the init calibration status
    ///   object
    /// * `Error::ArmCommandError` - RUNINIT failed with any other code
    /// * `Error::CommandTimeout` - Calibrations still running after
    ///   `timeout_ms`
    pub fn wait_init_cals(&mut self, timeout_ms: u32) -> Result<(), Error> {
        match self.wait_command(Opcode::RunInit, timeout_ms) {
            Ok(_) => Ok(()),
            Err(Error::CommandError {
                code: CALIBRATION_FAILED_CODE,
                ..
            }) => {
                let status = self.init_cal_status()?;
                error!(
                    "ARM init cal {} failed with code {}",
                    status.failing_cal_id, status.failing_cal_code
                );
                Err(Error::CalibrationFailed {
                    cal_id: status.failing_cal_id,
                    code: status.failing_cal_code,
                })
            }
            Err(Error::CommandError { code, .. }) => Err(Error::ArmCommandError(code)),
            Err(other) => Err(other),
        }
    }

    /// Aborts a running init calibration.
    ///
    /// # Returns
    /// The calibrations that completed before the abort
    pub fn abort_init_cals(&mut self) -> Result<InitCalibrations, Error> {
        self.execute_command(Abort)?;
        let completed = self.execute_command(GetInitCalsCompleted)?;

        debug!("ARM init cals aborted, completed {:#x}", completed.cals.bits());
        Ok(completed.cals)
    }

    /// Reads the init calibration status object.
    pub fn init_cal_status(&mut self) -> Result<InitCalStatus, Error> {
        self.execute_command(GetInitCalStatus)
    }

    /// Runs init calibrations and enables tracking calibrations.
    ///
    /// External LO leakage is run as a second pass after the other init
    /// calibrations. On failure the run is aborted and the error of the
    /// failed pass is returned.
    ///
    /// # Arguments
    /// * `init` - Init calibrations to run
    /// * `tracking` - Tracking calibrations to enable afterwards
    /// * `timeout_ms` - Time allowed for each pass
    pub fn setup_calibrations(
        &mut self,
        init: InitCalibrations,
        tracking: TrackingCalibrations,
        timeout_ms: u32,
    ) -> Result<(), Error> {
        self.init_cal_pass(init - InitCalibrations::TX_LO_LEAKAGE_EXTERNAL, timeout_ms)?;

        if init.contains(InitCalibrations::TX_LO_LEAKAGE_EXTERNAL) {
            self.init_cal_pass(InitCalibrations::TX_LO_LEAKAGE_EXTERNAL, timeout_ms)?;
        }

        self.enable_tracking_cals(tracking)
    }

    fn init_cal_pass(&mut self, cals: InitCalibrations, timeout_ms: u32) -> Result<(), Error> {
        self.run_init_cals(cals)?;

        let Err(error) = self.wait_init_cals(timeout_ms) else {
            return Ok(());
        };

        match self.abort_init_cals() {
            Ok(completed) => error!(
                "ARM init cals {:#x} failed, completed {:#x}",
                cals.bits(),
                completed.bits()
            ),
            Err(abort_error) => error!("ARM init cal abort failed: {:?}", abort_error),
        }
        Err(error)
    }
}
