//! Radio state
//!
//! The ARM firmware reports a coarse lifecycle state:
//!
//! ```text
//! POWER_UP -> READY -> IDLE <-> RADIO_ON
//! ```
//!
//! PROFILE_ERROR, CAL_ERROR and EXCEPTION can be entered from any state
//! and stay latched until the ARM is reset.

use bitflags::bitflags;

use crate::commands::{Abort, RadioOn};
use crate::interface::{RegisterAccess, Timer};
use crate::registers::RadioStatus;
use crate::{Device, Error};

/// Raw state value flag marking a firmware exception
const EXCEPTION_FLAG: u8 = 0x80;

/// ARM lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioState {
    /// Firmware is booting
    PowerUp,
    /// Firmware is running, no profile loaded
    Ready,
    /// Profile loaded, radio off; calibrations may be configured
    Idle,
    /// Radio on, tracking calibrations scheduled
    RadioOn,
    /// Loaded profile was rejected
    ProfileError,
    /// A calibration error was latched
    CalError,
    /// Firmware exception
    Exception,
    /// Value not known to this driver, passed through unchanged
    Unknown(u8),
}

impl From<u8> for RadioState {
    fn from(raw: u8) -> Self {
        match raw {
            0 => Self::PowerUp,
            1 => Self::Ready,
            2 => Self::Idle,
            3 => Self::RadioOn,
            4 => Self::ProfileError,
            5 => Self::CalError,
            raw if raw & EXCEPTION_FLAG != 0 => Self::Exception,
            other => Self::Unknown(other),
        }
    }
}

bitflags! {
    /// Set of radio states, used for state-gated waits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RadioStates: u8 {
        const POWER_UP = 1 << 0;
        const READY = 1 << 1;
        const IDLE = 1 << 2;
        const RADIO_ON = 1 << 3;
        const PROFILE_ERROR = 1 << 4;
        const CAL_ERROR = 1 << 5;
        const EXCEPTION = 1 << 6;
    }
}

impl RadioState {
    /// Flag for this state in a [`RadioStates`] set; empty for unknown
    /// values.
    pub fn flag(self) -> RadioStates {
        match self {
            Self::PowerUp => RadioStates::POWER_UP,
            Self::Ready => RadioStates::READY,
            Self::Idle => RadioStates::IDLE,
            Self::RadioOn => RadioStates::RADIO_ON,
            Self::ProfileError => RadioStates::PROFILE_ERROR,
            Self::CalError => RadioStates::CAL_ERROR,
            Self::Exception => RadioStates::EXCEPTION,
            Self::Unknown(_) => RadioStates::empty(),
        }
    }

    /// Error for states that stay latched until reset.
    pub fn fatal_error(self) -> Option<Error> {
        match self {
            Self::ProfileError => Some(Error::ProfileError),
            Self::CalError => Some(Error::CalError),
            Self::Exception => Some(Error::Exception),
            _ => None,
        }
    }
}

impl<B, T> Device<B, T>
where
    B: RegisterAccess,
    T: Timer,
{
    /// Reads the current radio state.
    pub fn radio_state(&mut self) -> Result<RadioState, Error> {
        let status: RadioStatus = self.bus.read_register()?;
        Ok(status.state)
    }

    /// Moves the ARM from IDLE to RADIO_ON.
    ///
    /// # Errors
    /// * `Error::ArmCommandError` - ARM refused the transition
    /// * `Error::CommandTimeout` - RADIOON did not complete
    pub fn radio_on(&mut self) -> Result<(), Error> {
        debug!("ARM radio on");
        self.execute_command(RadioOn)?;
        Ok(())
    }

    /// Moves the ARM from RADIO_ON back to IDLE.
    ///
    /// Sends ABORT, so it also stops a running init calibration.
    pub fn radio_off(&mut self) -> Result<(), Error> {
        debug!("ARM radio off");
        self.execute_command(Abort)?;
        Ok(())
    }

    /// Checks the radio state once, without waiting.
    ///
    /// # Errors
    /// * `Error::ProfileError`, `Error::CalError`, `Error::Exception` -
    ///   ARM is in a latched error state not listed in `expected`
    /// * `Error::InvalidRadioState` - Any other state not in `expected`
    pub fn check_radio_state(&mut self, expected: RadioStates) -> Result<RadioState, Error> {
        let state = self.radio_state()?;
        if expected.intersects(state.flag()) {
            return Ok(state);
        }
        Err(state
            .fatal_error()
            .unwrap_or(Error::InvalidRadioState(state)))
    }

    /// Polls the radio state until it is in `acceptable`.
    ///
    /// Latched error states end the wait immediately unless they are in
    /// `acceptable` themselves.
    ///
    /// # Returns
    /// The state that ended the wait
    ///
    /// # Errors
    /// * `Error::ProfileError`, `Error::CalError`, `Error::Exception` -
    ///   ARM entered a latched error state
    /// * `Error::WaitTimeout` - No accepted state within `timeout_ms`
    pub fn await_radio_state(
        &mut self,
        acceptable: RadioStates,
        timeout_ms: u32,
    ) -> Result<RadioState, Error> {
        self.timer.start(timeout_ms);

        loop {
            let state = self.radio_state()?;

            if acceptable.intersects(state.flag()) {
                debug!("ARM reached radio state {:?}", state);
                return Ok(state);
            }
            if let Some(error) = state.fatal_error() {
                error!("ARM entered radio state {:?}", state);
                return Err(error);
            }
            if self.timer.has_expired() {
                warn!("ARM still in radio state {:?} after {} ms", state, timeout_ms);
                return Err(Error::WaitTimeout);
            }
        }
    }
}
