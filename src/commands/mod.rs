//! ARM mailbox commands
//!
//! Every ARM operation is a mailbox command: an even opcode plus up to
//! four extended payload bytes. Commands are modelled with
//! [`regiface::Command`]:
//! - `id()` is the raw opcode
//! - `CommandParameters` is the extended payload
//! - `ResponseParameters` is what the ARM leaves in the scratch area of
//!   data memory once the command completes (empty for most commands)
//!
//! # Command Categories
//! - [`opcode`]: opcode validation and status slot lookup
//! - [`status`]: command status nibble and register decoding
//! - [`calibration`]: init calibration and radio control commands
//! - [`object`]: config object access and tracking calibration control
//!
//! # Command Execution
//! 1. Wait for the mailbox busy flag to clear
//! 2. Write the extended payload bytes
//! 3. Write the opcode (this triggers execution)
//! 4. Poll the opcode's status nibble until pending clears or an error
//!    code appears
//! 5. Read the response from the scratch area, if any
//!
//! # Important Notes
//! - Only one command may be outstanding at a time
//! - Error codes are opaque to the driver and passed through unchanged
//! - A stale error code remains in a slot until the opcode is re-sent

pub mod calibration;
pub mod object;
pub mod opcode;
pub mod status;

pub use calibration::*;
pub use object::*;
pub use opcode::*;
pub use status::*;
