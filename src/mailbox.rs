//! ARM mailbox
//!
//! Command dispatch, command status reads and completion waits. These
//! are the building blocks every higher-level operation is made of:
//!
//! 1. [`Device::send`] validates the opcode and payload, waits for the
//!    mailbox to be free and triggers the command
//! 2. [`Device::wait_command`] polls the opcode's status nibble until it
//!    completes, fails or times out
//! 3. [`Device::execute_command`] runs a typed [`regiface::Command`]
//!    through both steps and reads its response from the scratch area

use core::convert::Infallible;

use regiface::{ByteArray, Command, FromByteArray, ToByteArray};

use crate::commands::{ArmCommandStatus, CommandStatus, Opcode};
use crate::interface::{RegisterAccess, Timer};
use crate::registers::{
    ArmCommand, ArmCommandStatusRegister, ARM_CMD_STATUS_0, ARM_EXT_CMD_BYTES, ARM_EXT_CMD_BYTE_1,
};
use crate::{Device, Error};

/// Turns a completion error into the plain ARM error code.
pub(crate) fn arm_command_error(error: Error) -> Error {
    match error {
        Error::CommandError { code, .. } => Error::ArmCommandError(code),
        other => other,
    }
}

impl<B, T> Device<B, T>
where
    B: RegisterAccess,
    T: Timer,
{
    /// Sends a raw mailbox command without waiting for completion.
    ///
    /// # Arguments
    /// * `opcode` - Even opcode up to 30
    /// * `payload` - Extended payload, at most 4 bytes
    ///
    /// # Errors
    /// * `Error::InvalidOpcode` - Opcode is odd or above 30
    /// * `Error::InvalidPayloadLength` - Payload longer than 4 bytes
    /// * `Error::MailboxBusyTimeout` - Mailbox stayed busy; nothing written
    /// * `Error::Bus` - SPI communication failed
    pub fn send(&mut self, opcode: u8, payload: &[u8]) -> Result<(), Error> {
        let opcode = Opcode::try_from(opcode)?;
        self.send_opcode(opcode, payload)
    }

    /// Sends a validated opcode; see [`send`](Self::send).
    pub fn send_opcode(&mut self, opcode: Opcode, payload: &[u8]) -> Result<(), Error> {
        if payload.len() > ARM_EXT_CMD_BYTES {
            return Err(Error::InvalidPayloadLength(payload.len()));
        }

        self.wait_mailbox_free()?;

        for (address, byte) in (ARM_EXT_CMD_BYTE_1..).zip(payload.iter()) {
            self.bus.write_byte(address, *byte)?;
        }

        debug!("ARM command {:?} payload {:?}", opcode, payload);

        self.bus.write_register(ArmCommand {
            busy: false,
            opcode: opcode.value(),
        })
    }

    fn wait_mailbox_free(&mut self) -> Result<(), Error> {
        self.timer.start(self.config.mailbox_timeout_ms);

        loop {
            let command: ArmCommand = self.bus.read_register()?;
            if !command.busy {
                return Ok(());
            }
            if self.timer.has_expired() {
                warn!("ARM mailbox busy with opcode {}", command.opcode);
                return Err(Error::MailboxBusyTimeout);
            }
        }
    }

    /// Reads all 8 command status bytes and collapses them into
    /// pending/error words.
    pub fn read_command_status(&mut self) -> Result<ArmCommandStatus, Error> {
        let register: ArmCommandStatusRegister = self.bus.read_register()?;
        Ok(register.into())
    }

    /// Reads the status nibble of a single opcode.
    ///
    /// Only the status byte holding the opcode's slot is read.
    pub fn read_command_status_byte(&mut self, opcode: Opcode) -> Result<CommandStatus, Error> {
        let slot = opcode.status_slot();
        let byte = self.bus.read_byte(ARM_CMD_STATUS_0 + u16::from(slot.byte))?;
        Ok(CommandStatus::from_nibble(byte >> slot.shift))
    }

    /// Polls an opcode's status nibble until the command finishes.
    ///
    /// The first poll that shows a non-zero error code ends the wait,
    /// even if the pending bit is still set.
    ///
    /// # Errors
    /// * `Error::CommandError` - ARM reported an error code
    /// * `Error::CommandTimeout` - Pending bit still set after `timeout_ms`
    /// * `Error::Bus` - SPI communication failed
    pub fn wait_command(&mut self, opcode: Opcode, timeout_ms: u32) -> Result<CommandStatus, Error> {
        self.timer.start(timeout_ms);

        loop {
            let status = self.read_command_status_byte(opcode)?;

            if status.error_code != 0 {
                warn!(
                    "ARM command {:?} failed with code {}",
                    opcode, status.error_code
                );
                return Err(Error::CommandError {
                    opcode,
                    code: status.error_code,
                });
            }
            if !status.pending {
                return Ok(status);
            }
            if self.timer.has_expired() {
                warn!("ARM command {:?} timed out after {} ms", opcode, timeout_ms);
                return Err(Error::CommandTimeout(opcode));
            }
        }
    }

    /// Sends a typed command without waiting for completion.
    ///
    /// Unlike [`send`](Self::send), the payload must also match the
    /// length the firmware expects for the opcode.
    pub fn send_command<C>(&mut self, command: C) -> Result<(), Error>
    where
        C: Command<IdType = u8>,
        C::CommandParameters: ToByteArray<Error = Infallible>,
    {
        let opcode = Opcode::try_from(C::id())?;
        let payload = match command.invoking_parameters().to_bytes() {
            Ok(bytes) => bytes,
            Err(never) => match never {},
        };
        if !opcode.payload_len().contains(&payload.as_ref().len()) {
            return Err(Error::InvalidPayloadLength(payload.as_ref().len()));
        }

        self.send_opcode(opcode, payload.as_ref())
    }

    /// Executes a typed command and returns its response.
    ///
    /// Waits up to the configured command timeout. Commands with a
    /// non-empty response read it from the scratch area afterwards.
    ///
    /// # Errors
    /// * `Error::ArmCommandError` - ARM reported an error code
    /// * `Error::CommandTimeout` - Command did not complete in time
    /// * `Error::Deserialization` - Failed to parse the response
    /// * Any error from [`send`](Self::send)
    pub fn execute_command<C>(&mut self, command: C) -> Result<C::ResponseParameters, Error>
    where
        C: Command<IdType = u8>,
        C::CommandParameters: ToByteArray<Error = Infallible>,
    {
        let opcode = Opcode::try_from(C::id())?;
        self.send_command(command)?;
        self.wait_command(opcode, self.config.command_timeout_ms)
            .map_err(arm_command_error)?;

        let mut raw_response = <C::ResponseParameters as FromByteArray>::Array::new();
        if !raw_response.as_ref().is_empty() {
            let scratch = self.config.scratch_address;
            self.read_arm_memory(scratch, raw_response.as_mut(), true)?;
        }

        C::ResponseParameters::from_bytes(raw_response).map_err(|_| Error::Deserialization)
    }
}
