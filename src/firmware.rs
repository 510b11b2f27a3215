//! ARM firmware
//!
//! Loading and booting the ARM, verifying the loaded image and reading
//! the version of the running firmware.
//!
//! # Bring-up Sequence
//! 1. [`Device::init_arm`] holds the core in reset with its clock on
//! 2. [`Device::load_arm_firmware`] writes the image to program memory,
//!    boots it and waits for READY and a matching checksum
//! 3. [`Device::arm_version`] reports the firmware version
//!
//! After boot the firmware publishes two checksum words at the top of
//! data memory: the checksum stored in the image, then the checksum it
//! calculated over program memory. The calculated word reads zero until
//! the firmware has finished.

use crate::interface::{RegisterAccess, Timer};
use crate::memory::{ARM_CODE_END, ARM_CODE_START, ARM_DATA_END};
use crate::radio::RadioStates;
use crate::registers::{ArmControl, ArmControlFlags};
use crate::{Device, Error};

/// Size of a firmware image, which fills ARM program memory exactly
pub const ARM_BINARY_SIZE: usize = (ARM_CODE_END - ARM_CODE_START + 1) as usize;

/// Address of the stored and calculated checksum words
pub const ARM_CHECKSUM_ADDRESS: u32 = ARM_DATA_END - 7;

/// Address of the 5-byte version record in program memory
pub const ARM_VERSION_ADDRESS: u32 = 0x0100_0128;

/// Firmware build type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArmBuild {
    Release,
    Debug,
    TestObject,
}

impl ArmBuild {
    const DEBUG_FLAG: u8 = 1 << 0;
    const TEST_OBJECT_FLAG: u8 = 1 << 2;

    fn from_flags(flags: u8) -> Self {
        if flags & Self::TEST_OBJECT_FLAG != 0 {
            Self::TestObject
        } else if flags & Self::DEBUG_FLAG != 0 {
            Self::Debug
        } else {
            Self::Release
        }
    }
}

/// Version of the loaded ARM firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ArmVersion {
    pub major: u8,
    pub minor: u8,
    /// Release candidate number
    pub rc: u8,
    pub build: ArmBuild,
}

impl ArmVersion {
    /// Decodes the version record.
    ///
    /// # Format
    /// - Bytes 0-3: `major * 10000 + minor * 100 + rc`, little endian
    /// - Byte 4: build flags
    pub fn from_record(record: [u8; 5]) -> Self {
        let [b0, b1, b2, b3, flags] = record;
        let full = u32::from_le_bytes([b0, b1, b2, b3]);

        Self {
            major: (full / 10_000) as u8,
            minor: (full / 100 % 100) as u8,
            rc: (full % 100) as u8,
            build: ArmBuild::from_flags(flags),
        }
    }
}

impl<B, T> Device<B, T>
where
    B: RegisterAccess,
    T: Timer,
{
    /// Holds the ARM in reset with its clock enabled.
    ///
    /// Must be called before [`load_arm_firmware`](Self::load_arm_firmware).
    pub fn init_arm(&mut self) -> Result<(), Error> {
        debug!("ARM held in reset");
        self.bus.write_register(ArmControl {
            flags: ArmControlFlags::RESET | ArmControlFlags::CLOCK_ENABLE,
        })
    }

    /// Loads a firmware image and boots the ARM.
    ///
    /// Writes the image to program memory, releases the core and waits
    /// up to the configured boot timeout for READY, then verifies the
    /// checksum.
    ///
    /// # Errors
    /// * `Error::InvalidFirmwareSize` - Image is not [`ARM_BINARY_SIZE`]
    ///   bytes; nothing is written
    /// * `Error::ProfileError`, `Error::CalError`, `Error::Exception` -
    ///   Firmware entered a latched error state while booting
    /// * `Error::WaitTimeout` - Firmware did not reach READY
    /// * `Error::ChecksumTimeout`, `Error::ChecksumMismatch` - See
    ///   [`verify_arm_checksum`](Self::verify_arm_checksum)
    pub fn load_arm_firmware(&mut self, binary: &[u8]) -> Result<(), Error> {
        if binary.len() != ARM_BINARY_SIZE {
            return Err(Error::InvalidFirmwareSize(binary.len()));
        }

        self.write_arm_memory(ARM_CODE_START, binary)?;
        self.bus.write_register(ArmControl {
            flags: ArmControlFlags::RUN | ArmControlFlags::CLOCK_ENABLE,
        })?;
        debug!("ARM firmware loaded, booting");

        self.await_radio_state(RadioStates::READY, self.config.boot_timeout_ms)?;
        self.verify_arm_checksum()
    }

    /// Compares the checksum the firmware calculated with the one
    /// stored in the image.
    ///
    /// # Errors
    /// * `Error::ChecksumTimeout` - Firmware did not publish its checksum
    ///   within the boot timeout
    /// * `Error::ChecksumMismatch` - Program memory is corrupt
    pub fn verify_arm_checksum(&mut self) -> Result<(), Error> {
        self.timer.start(self.config.boot_timeout_ms);

        loop {
            let mut table = [0u8; 8];
            self.read_arm_memory(ARM_CHECKSUM_ADDRESS, &mut table, true)?;

            let [e0, e1, e2, e3, c0, c1, c2, c3] = table;
            let expected = u32::from_le_bytes([e0, e1, e2, e3]);
            let calculated = u32::from_le_bytes([c0, c1, c2, c3]);

            if calculated != 0 {
                if calculated != expected {
                    error!(
                        "ARM checksum {:#x} does not match image checksum {:#x}",
                        calculated, expected
                    );
                    return Err(Error::ChecksumMismatch {
                        expected,
                        calculated,
                    });
                }
                debug!("ARM checksum {:#x} verified", calculated);
                return Ok(());
            }
            if self.timer.has_expired() {
                warn!("ARM checksum not ready");
                return Err(Error::ChecksumTimeout);
            }
        }
    }

    /// Reads the version of the loaded firmware.
    pub fn arm_version(&mut self) -> Result<ArmVersion, Error> {
        let mut record = [0u8; 5];
        self.read_arm_memory(ARM_VERSION_ADDRESS, &mut record, true)?;
        Ok(ArmVersion::from_record(record))
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec;
    use std::vec::Vec;

    use super::*;
    use crate::radio::RadioState;
    use crate::sim::{self, FakeTimer, Sim};
    use crate::Config;

    const VERSION_OFFSET: usize = (ARM_VERSION_ADDRESS - ARM_CODE_START) as usize;
    const ARM_CONTROL: u16 = 0x0D00;

    /// Image with a version record and a valid trailing checksum
    fn image(version: u32, build_flags: u8) -> Vec<u8> {
        let mut binary: Vec<u8> = (0..ARM_BINARY_SIZE).map(|i| (i * 7) as u8).collect();
        binary[VERSION_OFFSET..VERSION_OFFSET + 4].copy_from_slice(&version.to_le_bytes());
        binary[VERSION_OFFSET + 4] = build_flags;

        let checksum = sim::checksum(&binary);
        binary[ARM_BINARY_SIZE - 4..].copy_from_slice(&checksum.to_le_bytes());
        binary
    }

    #[test]
    fn version_record_decodes() {
        let version = ArmVersion::from_record([0x07, 0x76, 0x00, 0x00, 0x00]);
        assert_eq!(
            version,
            ArmVersion {
                major: 3,
                minor: 2,
                rc: 15,
                build: ArmBuild::Release
            }
        );

        assert_eq!(ArmVersion::from_record([0; 5]).build, ArmBuild::Release);
        assert_eq!(ArmVersion::from_record([0, 0, 0, 0, 0x01]).build, ArmBuild::Debug);
        assert_eq!(ArmVersion::from_record([0, 0, 0, 0, 0x05]).build, ArmBuild::TestObject);
    }

    #[test]
    fn load_boots_and_verifies_firmware() {
        let mut device = sim::device();
        let binary = image(30_215, 0x01);

        device.init_arm().unwrap();
        device.load_arm_firmware(&binary).unwrap();

        assert_eq!(device.bus().code, binary);
        assert_eq!(device.radio_state().unwrap(), RadioState::Ready);
        assert_eq!(
            device.timer.starts,
            [Config::DEFAULT_BOOT_TIMEOUT_MS, Config::DEFAULT_BOOT_TIMEOUT_MS]
        );

        let control: Vec<u8> = device
            .bus()
            .writes
            .iter()
            .filter(|(address, _)| *address == ARM_CONTROL)
            .map(|(_, value)| *value)
            .collect();
        assert_eq!(
            control,
            [
                (ArmControlFlags::RESET | ArmControlFlags::CLOCK_ENABLE).bits(),
                (ArmControlFlags::RUN | ArmControlFlags::CLOCK_ENABLE).bits()
            ]
        );

        assert_eq!(
            device.arm_version().unwrap(),
            ArmVersion {
                major: 3,
                minor: 2,
                rc: 15,
                build: ArmBuild::Debug
            }
        );
    }

    #[test]
    fn wrong_size_is_rejected_without_writes() {
        let mut device = sim::device();

        assert_eq!(
            device.load_arm_firmware(&vec![0; 1024]),
            Err(Error::InvalidFirmwareSize(1024))
        );
        assert!(device.bus().writes.is_empty());
    }

    #[test]
    fn corrupted_image_fails_checksum() {
        let mut device = sim::device();
        let mut binary = image(10_000, 0);
        let calculated = sim::checksum(&binary);
        let stored = calculated.wrapping_add(1);
        binary[ARM_BINARY_SIZE - 4..].copy_from_slice(&stored.to_le_bytes());

        device.init_arm().unwrap();

        assert_eq!(
            device.load_arm_firmware(&binary),
            Err(Error::ChecksumMismatch {
                expected: stored,
                calculated
            })
        );
    }

    #[test]
    fn boot_exception_is_reported() {
        let mut device = sim::device();
        device.bus_mut().boot_state = 0x80;

        device.init_arm().unwrap();

        assert_eq!(
            device.load_arm_firmware(&image(10_000, 0)),
            Err(Error::Exception)
        );
    }

    #[test]
    fn missing_checksum_times_out() {
        let config = Config {
            boot_timeout_ms: 3,
            ..Config::default()
        };
        let mut device = Device::with_config(Sim::new(), FakeTimer::new(), config);
        device.bus_mut().publish_checksum = false;

        device.init_arm().unwrap();

        assert_eq!(
            device.load_arm_firmware(&image(10_000, 0)),
            Err(Error::ChecksumTimeout)
        );
    }

    #[test]
    fn version_is_read_from_program_memory() {
        let mut device = sim::device();
        device.bus_mut().code[VERSION_OFFSET..VERSION_OFFSET + 5]
            .copy_from_slice(&[0x11, 0x27, 0x00, 0x00, 0x04]);

        let version = device.arm_version().unwrap();

        assert_eq!(version.major, 1);
        assert_eq!(version.minor, 0);
        assert_eq!(version.rc, 1);
        assert_eq!(version.build, ArmBuild::TestObject);
    }
}
