//! ARM mailbox opcodes
//!
//! The ARM accepts opcode 0 and every even opcode up to 30. Each opcode
//! owns one 4-bit slot in the command status registers. The named
//! opcodes below are fixed by the ARM firmware image; the remaining even
//! values are accepted by the mailbox but reserved.

use core::ops::RangeInclusive;

use crate::registers::ARM_CMD_STATUS_BYTES;
use crate::Error;

/// Largest opcode the mailbox accepts
pub const MAX_OPCODE: u8 = 30;

/// Location of an opcode's nibble inside the command status registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusSlot {
    /// Status byte index (0-7)
    pub byte: u8,
    /// Bit shift of the nibble within the byte (0 or 4)
    pub shift: u8,
}

impl StatusSlot {
    const fn new(byte: u8, shift: u8) -> Self {
        Self { byte, shift }
    }

    /// Extracts this slot's nibble from a full status register image.
    pub fn extract(self, bytes: [u8; ARM_CMD_STATUS_BYTES]) -> u8 {
        (bytes[self.byte as usize] >> self.shift) & 0x0F
    }
}

/// Status slot of opcode `2 * n`, indexed by `n`
const STATUS_SLOTS: [StatusSlot; 16] = [
    StatusSlot::new(0, 0),
    StatusSlot::new(0, 4),
    StatusSlot::new(1, 0),
    StatusSlot::new(1, 4),
    StatusSlot::new(2, 0),
    StatusSlot::new(2, 4),
    StatusSlot::new(3, 0),
    StatusSlot::new(3, 4),
    StatusSlot::new(4, 0),
    StatusSlot::new(4, 4),
    StatusSlot::new(5, 0),
    StatusSlot::new(5, 4),
    StatusSlot::new(6, 0),
    StatusSlot::new(6, 4),
    StatusSlot::new(7, 0),
    StatusSlot::new(7, 4),
];

/// A validated ARM mailbox opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Opcode {
    /// ABORT (0x00): stop the running calibration; also used as radio off
    Abort,
    /// RUNINIT (0x02): run init calibrations from a 32-bit mask
    RunInit,
    /// RADIOON (0x04): move the ARM from IDLE to RADIO_ON
    RadioOn,
    /// WRITECFG (0x06): copy the scratch area into a config object
    WriteConfig,
    /// READCFG (0x08): copy a config object into the scratch area
    ReadConfig,
    /// SET (0x0A): apply a control object
    Set,
    /// GET (0x0C): place a status object in the scratch area
    Get,
    /// Any other even opcode up to 30
    Reserved(u8),
}

impl Opcode {
    /// Raw opcode value written to the command register.
    pub const fn value(self) -> u8 {
        match self {
            Opcode::Abort => 0x00,
            Opcode::RunInit => 0x02,
            Opcode::RadioOn => 0x04,
            Opcode::WriteConfig => 0x06,
            Opcode::ReadConfig => 0x08,
            Opcode::Set => 0x0A,
            Opcode::Get => 0x0C,
            Opcode::Reserved(raw) => raw,
        }
    }

    const fn slot_index(self) -> usize {
        ((self.value() >> 1) & 0x0F) as usize
    }

    /// Location of this opcode's pending/error nibble.
    pub const fn status_slot(self) -> StatusSlot {
        STATUS_SLOTS[self.slot_index()]
    }

    /// Bit of this opcode in the collapsed pending/error words.
    pub const fn status_bit(self) -> u16 {
        1 << self.slot_index()
    }

    /// Extended payload lengths the ARM firmware expects with this opcode.
    pub const fn payload_len(self) -> RangeInclusive<usize> {
        match self {
            Opcode::Abort | Opcode::RadioOn => 0..=0,
            Opcode::RunInit | Opcode::WriteConfig | Opcode::ReadConfig => 4..=4,
            Opcode::Set | Opcode::Get => 1..=4,
            Opcode::Reserved(_) => 0..=4,
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Abort),
            0x02 => Ok(Self::RunInit),
            0x04 => Ok(Self::RadioOn),
            0x06 => Ok(Self::WriteConfig),
            0x08 => Ok(Self::ReadConfig),
            0x0A => Ok(Self::Set),
            0x0C => Ok(Self::Get),
            raw if raw % 2 == 0 && raw <= MAX_OPCODE => Ok(Self::Reserved(raw)),
            invalid => Err(Error::InvalidOpcode(invalid)),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> Self {
        opcode.value()
    }
}
