//! ARM session
//!
//! [`Device`] is the single owner of one transceiver's ARM mailbox,
//! command status registers and memory DMA window. Every operation in
//! this crate is a method on it, implemented in the module of the
//! component it belongs to:
//!
//! - [`firmware`](crate::firmware): firmware load, checksum and version
//! - [`memory`](crate::memory): ARM memory reads and writes
//! - [`mailbox`](crate::mailbox): command dispatch, status decoding and
//!   completion waits
//! - [`radio`](crate::radio): radio state and radio on/off
//! - [`config_object`](crate::config_object): config object access
//! - [`init_cal`](crate::init_cal): init calibrations
//! - [`tracking_cal`](crate::tracking_cal): tracking calibration scheduling
//!
//! # Concurrency
//! All operations are blocking and take `&mut self`. The mailbox allows
//! one outstanding command, so a `Device` must never be driven from two
//! contexts at once; wrap it in a mutex or give it to a single task if it
//! has to be shared.
//!
//! # Example
//! ```no_run
//! use embedded_hal::delay::DelayNs;
//! use embedded_hal::spi::SpiDevice;
//! use ad937x_arm::{DelayTimer, Device, Error, SpiInterface};
//!
//! fn radio_on<SPI: SpiDevice, D: DelayNs>(spi: SPI, delay: D) -> Result<(), Error> {
//!     let mut device = Device::new(SpiInterface::new(spi), DelayTimer::new(delay));
//!     device.radio_on()
//! }
//! ```

use crate::memory::ARM_DATA_START;

/// Session configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// How long to wait for the mailbox busy flag to clear before a command
    pub mailbox_timeout_ms: u32,
    /// How long to wait for config and object commands to complete
    pub command_timeout_ms: u32,
    /// Data memory address the ARM uses to exchange config and GET data
    pub scratch_address: u32,
    /// How long a freshly loaded firmware may take to boot and verify
    /// its checksum
    pub boot_timeout_ms: u32,
}

impl Config {
    /// Default mailbox busy timeout
    pub const DEFAULT_MAILBOX_TIMEOUT_MS: u32 = 2000;
    /// Default config/object command timeout
    pub const DEFAULT_COMMAND_TIMEOUT_MS: u32 = 1000;
    /// Default firmware boot timeout
    pub const DEFAULT_BOOT_TIMEOUT_MS: u32 = 1000;
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mailbox_timeout_ms: Self::DEFAULT_MAILBOX_TIMEOUT_MS,
            command_timeout_ms: Self::DEFAULT_COMMAND_TIMEOUT_MS,
            scratch_address: ARM_DATA_START,
            boot_timeout_ms: Self::DEFAULT_BOOT_TIMEOUT_MS,
        }
    }
}

/// One transceiver's ARM mailbox session.
///
/// Owns the register interface `B` and the timer `T` used by all polling
/// loops.
pub struct Device<B, T> {
    pub(crate) bus: B,
    pub(crate) timer: T,
    pub(crate) config: Config,
}

impl<B, T> Device<B, T> {
    /// Creates a session with the default [`Config`].
    ///
    /// # Arguments
    /// * `bus` - Register interface for the transceiver
    /// * `timer` - Timeout source for all waits
    pub fn new(bus: B, timer: T) -> Self {
        Self::with_config(bus, timer, Config::default())
    }

    /// Creates a session with an explicit [`Config`].
    pub fn with_config(bus: B, timer: T, config: Config) -> Self {
        Self { bus, timer, config }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Borrows the register interface.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutably borrows the register interface.
    ///
    /// Register writes made through this handle bypass the session and
    /// may leave the DMA window or mailbox in an unexpected state.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Releases the register interface and timer.
    pub fn release(self) -> (B, T) {
        (self.bus, self.timer)
    }
}
