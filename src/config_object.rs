//! Config object access
//!
//! Config objects are addressed by object id and byte offset, never by
//! raw address. Data passes through the scratch area of ARM data memory:
//!
//! - Write: host fills the scratch area, then WRITECFG copies it into
//!   the object
//! - Read: READCFG copies the object into the scratch area, then the
//!   host reads it back

use crate::commands::{ConfigAccess, Opcode, ReadConfig, WriteConfig};
use crate::interface::{RegisterAccess, Timer};
use crate::{Device, Error};

impl<B, T> Device<B, T>
where
    B: RegisterAccess,
    T: Timer,
{
    fn config_access(object_id: u8, offset: u16, length: usize) -> Result<ConfigAccess, Error> {
        let length = u8::try_from(length).map_err(|_| Error::InvalidPayloadLength(length))?;
        Ok(ConfigAccess {
            object_id,
            offset,
            length,
        })
    }

    /// Writes `data` into a config object at byte `offset`.
    ///
    /// # Errors
    /// * `Error::InvalidPayloadLength` - More than 255 bytes
    /// * `Error::ConfigWriteFailed` - WRITECFG completed with an error code
    /// * `Error::CommandTimeout` - WRITECFG did not complete
    pub fn write_config(&mut self, object_id: u8, offset: u16, data: &[u8]) -> Result<(), Error> {
        let access = Self::config_access(object_id, offset, data.len())?;
        let scratch = self.config.scratch_address;

        debug!(
            "ARM config write object {} offset {} length {}",
            object_id,
            offset,
            data.len()
        );

        self.write_arm_memory(scratch, data)?;
        self.send_command(WriteConfig { access })?;
        self.wait_command(Opcode::WriteConfig, self.config.command_timeout_ms)
            .map_err(|e| match e {
                Error::CommandError { code, .. } => Error::ConfigWriteFailed(code),
                other => other,
            })?;

        Ok(())
    }

    /// Reads `buf.len()` bytes of a config object starting at byte `offset`.
    ///
    /// # Errors
    /// * `Error::InvalidPayloadLength` - More than 255 bytes
    /// * `Error::ConfigReadFailed` - READCFG completed with an error code
    /// * `Error::CommandTimeout` - READCFG did not complete
    pub fn read_config(&mut self, object_id: u8, offset: u16, buf: &mut [u8]) -> Result<(), Error> {
        let access = Self::config_access(object_id, offset, buf.len())?;
        let scratch = self.config.scratch_address;

        debug!(
            "ARM config read object {} offset {} length {}",
            object_id,
            offset,
            buf.len()
        );

        self.send_command(ReadConfig { access })?;
        self.wait_command(Opcode::ReadConfig, self.config.command_timeout_ms)
            .map_err(|e| match e {
                Error::CommandError { code, .. } => Error::ConfigReadFailed(code),
                other => other,
            })?;

        self.read_arm_memory(scratch, buf, true)
    }
}
