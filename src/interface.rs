//! Register access and timing interfaces
//!
//! The driver core only needs three things from the platform:
//! - Byte-wide register reads and writes ([`RegisterAccess`])
//! - A millisecond timeout ([`Timer`])
//! - A log sink (the optional `defmt`/`log` features)
//!
//! [`SpiInterface`] implements [`RegisterAccess`] for any
//! `embedded_hal::spi::SpiDevice`, and [`DelayTimer`] implements
//! [`Timer`] on top of `embedded_hal::delay::DelayNs`.
//!
//! # Example
//! ```no_run
//! use embedded_hal::spi::SpiDevice;
//! use ad937x_arm::{Error, RegisterAccess, SpiInterface};
//!
//! fn arm_busy<SPI: SpiDevice>(spi: SPI) -> Result<bool, Error> {
//!     let mut regs = SpiInterface::new(spi);
//!     Ok(regs.read_field(0x0D49, 0x80, 7)? != 0)
//! }
//! ```

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::{Operation, SpiDevice};
use regiface::{ByteArray, ReadableRegister, WritableRegister};

use crate::Error;

/// Byte-wide access to the transceiver's SPI register space.
///
/// Multi-byte [`regiface`] registers are mapped onto consecutive byte
/// addresses starting at the register id, in array order.
pub trait RegisterAccess {
    /// Reads one register byte.
    fn read_byte(&mut self, address: u16) -> Result<u8, Error>;

    /// Writes one register byte.
    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), Error>;

    /// Reads the bits selected by `mask`, shifted down by `shift`.
    fn read_field(&mut self, address: u16, mask: u8, shift: u8) -> Result<u8, Error> {
        Ok((self.read_byte(address)? & mask) >> shift)
    }

    /// Read-modify-writes the bits selected by `mask` with `value << shift`.
    fn write_field(&mut self, address: u16, value: u8, mask: u8, shift: u8) -> Result<(), Error> {
        let current = self.read_byte(address)?;
        self.write_byte(address, (current & !mask) | ((value << shift) & mask))
    }

    /// Reads a register value from the device.
    ///
    /// # Errors
    /// * `Error::Bus` - SPI communication failed
    /// * `Error::Deserialization` - Failed to parse register value
    fn read_register<R>(&mut self) -> Result<R, Error>
    where
        Self: Sized,
        R: ReadableRegister<IdType = u16>,
    {
        let mut raw_value = R::Array::new();

        for (address, byte) in (R::id()..).zip(raw_value.as_mut().iter_mut()) {
            *byte = self.read_byte(address)?;
        }

        R::from_bytes(raw_value).map_err(|_| Error::Deserialization)
    }

    /// Writes a value to a device register.
    ///
    /// # Errors
    /// * `Error::Bus` - SPI communication failed
    fn write_register<R>(&mut self, register: R) -> Result<(), Error>
    where
        Self: Sized,
        R: WritableRegister<IdType = u16, Error = Infallible>,
    {
        let raw_value = match register.to_bytes() {
            Ok(bytes) => bytes,
            Err(never) => match never {},
        };

        for (address, byte) in (R::id()..).zip(raw_value.as_ref().iter()) {
            self.write_byte(address, *byte)?;
        }

        Ok(())
    }
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for &mut T {
    fn read_byte(&mut self, address: u16) -> Result<u8, Error> {
        (**self).read_byte(address)
    }

    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), Error> {
        (**self).write_byte(address, value)
    }
}

/// SPI register interface for the transceiver.
///
/// Each access is one SPI transaction: a 16-bit instruction word (bit 15
/// set for reads, 15-bit register address) followed by one data byte.
pub struct SpiInterface<SPI> {
    spi: SPI,
}

impl<SPI> SpiInterface<SPI> {
    /// Creates a new interface wrapping the provided SPI device.
    ///
    /// # Arguments
    /// * `spi` - An SPI device with the transceiver's chip select
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Releases the underlying SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }
}

const SPI_READ: u8 = 0x80;

impl<SPI> RegisterAccess for SpiInterface<SPI>
where
    SPI: SpiDevice,
{
    fn read_byte(&mut self, address: u16) -> Result<u8, Error> {
        let [high, low] = address.to_be_bytes();
        let header = [SPI_READ | (high & 0x7F), low];
        let mut value = [0u8];

        self.spi
            .transaction(&mut [Operation::Write(&header), Operation::Read(&mut value)])
            .map_err(|_| Error::Bus)?;

        Ok(value[0])
    }

    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), Error> {
        let [high, low] = address.to_be_bytes();
        let frame = [high & 0x7F, low, value];

        self.spi.write(&frame).map_err(|_| Error::Bus)
    }
}

/// Millisecond timeout used by every polling loop.
///
/// The driver calls [`start`](Timer::start) once per wait and then
/// [`has_expired`](Timer::has_expired) between polls.
pub trait Timer {
    /// Arms the timer to expire `timeout_ms` milliseconds from now.
    fn start(&mut self, timeout_ms: u32);

    /// Returns true once the armed timeout has elapsed.
    fn has_expired(&mut self) -> bool;
}

impl<T: Timer + ?Sized> Timer for &mut T {
    fn start(&mut self, timeout_ms: u32) {
        (**self).start(timeout_ms)
    }

    fn has_expired(&mut self) -> bool {
        (**self).has_expired()
    }
}

/// [`Timer`] built from a blocking delay.
///
/// Every expiry check that finds time remaining sleeps for one poll step,
/// so the timeout bounds the total sleep time. SPI transfer time is not
/// counted, which makes the real timeout somewhat longer than requested.
pub struct DelayTimer<D> {
    delay: D,
    step_us: u32,
    remaining_us: u64,
}

impl<D> DelayTimer<D> {
    /// Default poll step
    pub const DEFAULT_STEP_US: u32 = 100;

    /// Creates a timer polling every [`DEFAULT_STEP_US`](Self::DEFAULT_STEP_US).
    pub fn new(delay: D) -> Self {
        Self::with_step(delay, Self::DEFAULT_STEP_US)
    }

    /// Creates a timer polling every `step_us` microseconds.
    pub fn with_step(delay: D, step_us: u32) -> Self {
        Self {
            delay,
            step_us: step_us.max(1),
            remaining_us: 0,
        }
    }

    /// Releases the underlying delay provider.
    pub fn release(self) -> D {
        self.delay
    }
}

impl<D: DelayNs> Timer for DelayTimer<D> {
    fn start(&mut self, timeout_ms: u32) {
        self.remaining_us = u64::from(timeout_ms) * 1000;
    }

    fn has_expired(&mut self) -> bool {
        if self.remaining_us == 0 {
            return true;
        }

        let step = u64::from(self.step_us).min(self.remaining_us);
        // `step` never exceeds `step_us`, so it fits in u32
        self.delay.delay_us(step as u32);
        self.remaining_us -= step;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingDelay {
        total_us: u64,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_us += u64::from(ns) / 1000;
        }

        fn delay_us(&mut self, us: u32) {
            self.total_us += u64::from(us);
        }
    }

    #[test]
    fn delay_timer_sleeps_exactly_the_timeout() {
        let mut timer = DelayTimer::with_step(CountingDelay { total_us: 0 }, 300);
        timer.start(1);

        let mut polls = 0;
        while !timer.has_expired() {
            polls += 1;
        }

        assert_eq!(polls, 4);
        assert_eq!(timer.release().total_us, 1000);
    }

    #[test]
    fn zero_timeout_expires_immediately() {
        let mut timer = DelayTimer::new(CountingDelay { total_us: 0 });
        timer.start(0);
        assert!(timer.has_expired());
    }
}
