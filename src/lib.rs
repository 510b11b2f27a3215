#![no_std]
//! AD9371 ARM Mailbox Driver
//!
//! This crate provides a type-safe interface to the calibration processor
//! embedded in the Analog Devices AD9371/AD9375 RF transceivers. The ARM
//! core runs the transceiver's init and tracking calibrations and is
//! controlled entirely through a small SPI-visible mailbox.
//!
//! # Features
//! - ARM firmware load, checksum verification and version query
//! - Block access to ARM program and data memory through the DMA window
//! - Mailbox command dispatch with busy handling and completion polling
//! - Per-opcode command status decoding
//! - Radio on/off and state-gated waits
//! - Config object reads and writes
//! - Init calibrations: run, wait, abort, status
//! - Tracking calibrations: enable, suspend/resume, reschedule, pending
//!   status
//!
//! # Architecture
//! The driver is organized into several modules:
//!
//! - [`device`]: The [`Device`] session owning the register interface
//!   - [`firmware`], [`memory`], [`mailbox`], [`radio`],
//!     [`config_object`], [`init_cal`] and [`tracking_cal`] each add
//!     their operations to it
//!
//! - [`interface`]: Platform interfaces
//!   - [`RegisterAccess`] and its SPI implementation [`SpiInterface`]
//!   - [`Timer`] and the delay-based [`DelayTimer`]
//!
//! - [`registers`]: Mailbox and DMA register definitions
//!
//! - [`commands`]: Mailbox commands and response types
//!   - [`commands::opcode`]: Opcode validation and status slots
//!   - [`commands::status`]: Command status decoding
//!   - [`commands::calibration`]: Init calibration and radio commands
//!   - [`commands::object`]: Config object and tracking calibration
//!     commands
//!
//! # Usage
//! The transceiver clocks must be running before the ARM is loaded, and
//! the profile is written by the transceiver bring-up code after the ARM
//! reaches READY. A typical sequence looks like this:
//!
//! 1. Create a [`Device`] from a register interface and a timer
//! 2. Load the firmware with [`Device::init_arm`] and
//!    [`Device::load_arm_firmware`]
//! 3. After the profile is written, wait for the ARM to reach IDLE
//! 4. Run and await the init calibrations
//! 5. Enable the tracking calibrations
//! 6. Turn the radio on
//!
//! # Important Notes
//! - Only one mailbox command may be outstanding; a [`Device`] must not be
//!   driven from two contexts at once
//! - Tracking calibrations can only be enabled in IDLE
//! - ARM error codes are passed through unchanged
//! - Enable either the `defmt` or the `log` feature for driver logging
//!
//! # Example
//! ```no_run
//! use embedded_hal::delay::DelayNs;
//! use embedded_hal::spi::SpiDevice;
//! use ad937x_arm::{
//!     DelayTimer, Device, Error, InitCalibrations, RadioStates, SpiInterface,
//!     TrackingCalibrations,
//! };
//!
//! fn calibrate<SPI: SpiDevice, D: DelayNs>(spi: SPI, delay: D) -> Result<(), Error> {
//!     let mut device = Device::new(SpiInterface::new(spi), DelayTimer::new(delay));
//!
//!     device.await_radio_state(RadioStates::IDLE, 1000)?;
//!     device.setup_calibrations(
//!         InitCalibrations::DEFAULT,
//!         TrackingCalibrations::DEFAULT,
//!         InitCalibrations::DEFAULT_TIMEOUT_MS,
//!     )?;
//!     device.radio_on()
//! }
//! ```

#[macro_use]
mod fmt;

pub mod commands;
pub mod config_object;
pub mod device;
pub mod error;
pub mod firmware;
pub mod init_cal;
pub mod interface;
pub mod mailbox;
pub mod memory;
pub mod radio;
pub mod registers;
pub mod tracking_cal;

#[cfg(test)]
mod sim;

pub use commands::*;
pub use device::{Config, Device};
pub use error::Error;
pub use firmware::{ArmBuild, ArmVersion};
pub use init_cal::InitCalibrations;
pub use interface::{DelayTimer, RegisterAccess, SpiInterface, Timer};
pub use memory::Region;
pub use radio::{RadioState, RadioStates};
pub use registers::*;
pub use tracking_cal::{PendingTrackingCals, TrackingCal, TrackingCalibrations};
