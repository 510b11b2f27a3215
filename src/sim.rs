//! Simulated ARM for unit tests
//!
//! Models enough of the transceiver to exercise the driver end to end:
//! the DMA window over both memory regions, the mailbox with scripted
//! completion timing per opcode, config object storage, scripted GET
//! responses, radio state, the tracking calibration pending register and
//! firmware boot with checksum publication.

extern crate std;

use std::collections::BTreeMap;
use std::vec;
use std::vec::Vec;

use crate::commands::Opcode;
use crate::firmware::ARM_CHECKSUM_ADDRESS;
use crate::memory::{ARM_CODE_END, ARM_CODE_START, ARM_DATA_END, ARM_DATA_START};
use crate::registers::{
    ArmCommand, ArmControl, ArmControlFlags, ArmCommandStatusRegister, ArmDmaAddress, ArmDmaControl, DmaFlags, RadioStatus,
    TrackingCalPending, ARM_CMD_STATUS_0, ARM_CMD_STATUS_BYTES, ARM_DMA_DATA0, ARM_EXT_CMD_BYTE_1,
    ARM_EXT_CMD_BYTES,
};
use crate::{Device, Error, RegisterAccess, Timer};
use regiface::ReadableRegister;

/// How the simulated ARM finishes an opcode
#[derive(Debug, Clone, Copy)]
pub struct Completion {
    /// Status reads of the opcode's byte before the final state shows up
    pub polls: u32,
    /// Error code reported in the final state
    pub error: u8,
    /// Leave the pending bit set in the final state
    pub keep_pending: bool,
}

impl Default for Completion {
    fn default() -> Self {
        Self {
            polls: 1,
            error: 0,
            keep_pending: false,
        }
    }
}

impl Completion {
    pub fn after(polls: u32) -> Self {
        Self {
            polls,
            ..Self::default()
        }
    }

    pub fn failing(polls: u32, error: u8) -> Self {
        Self {
            polls,
            error,
            keep_pending: false,
        }
    }

    /// Never completes
    pub fn hang() -> Self {
        Self {
            polls: u32::MAX,
            ..Self::default()
        }
    }
}

/// A mailbox command as seen by the ARM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issued {
    pub opcode: u8,
    pub payload: [u8; ARM_EXT_CMD_BYTES],
}

pub struct Sim {
    regs: Vec<u8>,
    pub code: Vec<u8>,
    pub data: Vec<u8>,
    dma_word: u32,
    pub completions: BTreeMap<u8, Completion>,
    in_flight: BTreeMap<u8, Completion>,
    pub objects: BTreeMap<u8, Vec<u8>>,
    pub get_responses: BTreeMap<u8, Vec<u8>>,
    pub issued: Vec<Issued>,
    pub writes: Vec<(u16, u8)>,
    pub reads: Vec<u16>,
    pub address_latches: usize,
    pub busy_reads: u32,
    /// Radio state entered when the firmware is booted
    pub boot_state: u8,
    /// Publish the checksum words on boot
    pub publish_checksum: bool,
}

const DMA_ADDRESS_MSB: u16 = 0x0D44;
const RADIO_READY: u8 = 1;
const RADIO_IDLE: u8 = 2;
const RADIO_ON: u8 = 3;
/// Scratch area offset in `data`, matching the default config
const SCRATCH_OFFSET: usize = 0;

fn address_of<R: ReadableRegister<IdType = u16>>() -> u16 {
    R::id()
}

impl Sim {
    pub fn new() -> Self {
        let mut sim = Self {
            regs: vec![0; 0x1000],
            code: vec![0; (ARM_CODE_END - ARM_CODE_START + 1) as usize],
            data: vec![0; (ARM_DATA_END - ARM_DATA_START + 1) as usize],
            dma_word: 0,
            completions: BTreeMap::new(),
            in_flight: BTreeMap::new(),
            objects: BTreeMap::new(),
            get_responses: BTreeMap::new(),
            issued: Vec::new(),
            writes: Vec::new(),
            reads: Vec::new(),
            address_latches: 0,
            busy_reads: 0,
            boot_state: RADIO_READY,
            publish_checksum: true,
        };
        sim.set_radio_state(RADIO_IDLE);
        sim
    }

    pub fn set_radio_state(&mut self, raw: u8) {
        self.regs[address_of::<RadioStatus>() as usize] = raw;
    }

    pub fn radio_state(&self) -> u8 {
        self.regs[address_of::<RadioStatus>() as usize]
    }

    pub fn set_pending_register(&mut self, bytes: [u8; 4]) {
        let base = address_of::<TrackingCalPending>() as usize;
        self.regs[base..base + 4].copy_from_slice(&bytes);
    }

    pub fn set_status_bytes(&mut self, bytes: [u8; ARM_CMD_STATUS_BYTES]) {
        let base = address_of::<ArmCommandStatusRegister>() as usize;
        self.regs[base..base + ARM_CMD_STATUS_BYTES].copy_from_slice(&bytes);
    }

    pub fn complete(&mut self, opcode: Opcode, completion: Completion) {
        self.completions.insert(opcode.value(), completion);
    }

    pub fn object(&self, object_id: u8) -> &[u8] {
        self.objects.get(&object_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_object(&mut self, object_id: u8, offset: usize, bytes: &[u8]) {
        let object = self.objects.entry(object_id).or_default();
        if object.len() < offset + bytes.len() {
            object.resize(offset + bytes.len(), 0);
        }
        object[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn issued_with(&self, opcode: Opcode) -> Vec<&Issued> {
        self.issued
            .iter()
            .filter(|cmd| cmd.opcode == opcode.value())
            .collect()
    }

    fn dma_flags(&self) -> DmaFlags {
        DmaFlags::from_bits_truncate(self.regs[address_of::<ArmDmaControl>() as usize])
    }

    fn memory(&mut self, address: u32) -> &mut u8 {
        let data_selected = self.dma_flags().contains(DmaFlags::DATA_REGION);
        if (ARM_DATA_START..=ARM_DATA_END).contains(&address) {
            assert!(data_selected, "data access at {address:#x} with code region selected");
            &mut self.data[(address - ARM_DATA_START) as usize]
        } else if (ARM_CODE_START..=ARM_CODE_END).contains(&address) {
            assert!(!data_selected, "code access at {address:#x} with data region selected");
            &mut self.code[(address - ARM_CODE_START) as usize]
        } else {
            panic!("DMA access outside ARM memory at {address:#x}");
        }
    }

    fn dma_access(&mut self, address: u16, value: Option<u8>) -> u8 {
        let index = u32::from(address - ARM_DMA_DATA0);
        let target = self.dma_word + index;
        let byte = self.memory(target);
        if let Some(value) = value {
            *byte = value;
        }
        let result = *byte;
        if index == 3 && self.dma_flags().contains(DmaFlags::AUTO_INCREMENT) {
            self.dma_word += 4;
        }
        result
    }

    fn execute(&mut self, opcode: u8) {
        let mut payload = [0u8; ARM_EXT_CMD_BYTES];
        let base = ARM_EXT_CMD_BYTE_1 as usize;
        payload.copy_from_slice(&self.regs[base..base + ARM_EXT_CMD_BYTES]);
        self.issued.push(Issued { opcode, payload });

        let op = Opcode::try_from(opcode).expect("ARM received an invalid opcode");
        let completion = self.completions.get(&opcode).copied().unwrap_or_default();
        self.set_nibble(op, 0x01);
        self.in_flight.insert(opcode, completion);

        let scratch = SCRATCH_OFFSET;
        match op {
            Opcode::WriteConfig => {
                let offset = usize::from(u16::from_le_bytes([payload[1], payload[2]]));
                let length = usize::from(payload[3]);
                let bytes = self.data[scratch..scratch + length].to_vec();
                self.set_object(payload[0], offset, &bytes);
            }
            Opcode::ReadConfig => {
                let offset = usize::from(u16::from_le_bytes([payload[1], payload[2]]));
                let length = usize::from(payload[3]);
                let mut bytes = self.object(payload[0]).to_vec();
                bytes.resize(bytes.len().max(offset + length), 0);
                self.data[scratch..scratch + length].copy_from_slice(&bytes[offset..offset + length]);
            }
            Opcode::Get => {
                if let Some(response) = self.get_responses.get(&payload[0]).cloned() {
                    self.data[scratch..scratch + response.len()].copy_from_slice(&response);
                }
            }
            Opcode::RadioOn if completion.error == 0 => self.set_radio_state(RADIO_ON),
            Opcode::Abort if self.radio_state() == RADIO_ON => self.set_radio_state(RADIO_IDLE),
            _ => {}
        }
    }

    fn boot(&mut self) {
        self.set_radio_state(self.boot_state);
        if !self.publish_checksum {
            return;
        }

        let stored = &self.code[self.code.len() - 4..];
        let stored = u32::from_le_bytes([stored[0], stored[1], stored[2], stored[3]]);
        let calculated = checksum(&self.code);

        let base = (ARM_CHECKSUM_ADDRESS - ARM_DATA_START) as usize;
        self.data[base..base + 4].copy_from_slice(&stored.to_le_bytes());
        self.data[base + 4..base + 8].copy_from_slice(&calculated.to_le_bytes());
    }

    fn set_nibble(&mut self, opcode: Opcode, nibble: u8) {
        let slot = opcode.status_slot();
        let address = ARM_CMD_STATUS_0 as usize + slot.byte as usize;
        let mask = 0x0F << slot.shift;
        self.regs[address] = (self.regs[address] & !mask) | ((nibble << slot.shift) & mask);
    }

    fn progress(&mut self, status_byte: u8) {
        let opcodes: Vec<u8> = self.in_flight.keys().copied().collect();
        for opcode in opcodes {
            let op = Opcode::try_from(opcode).unwrap();
            if op.status_slot().byte != status_byte {
                continue;
            }
            let Some(completion) = self.in_flight.get_mut(&opcode) else {
                continue;
            };
            completion.polls = completion.polls.saturating_sub(1);
            if completion.polls == 0 {
                let done = *completion;
                self.in_flight.remove(&opcode);
                self.set_nibble(op, ((done.error & 0x07) << 1) | done.keep_pending as u8);
            }
        }
    }
}

impl RegisterAccess for Sim {
    fn read_byte(&mut self, address: u16) -> Result<u8, Error> {
        self.reads.push(address);

        let status = ARM_CMD_STATUS_0..ARM_CMD_STATUS_0 + ARM_CMD_STATUS_BYTES as u16;
        let window = ARM_DMA_DATA0..ARM_DMA_DATA0 + 4;

        if address == address_of::<ArmCommand>() {
            let last = self.regs[address as usize];
            if self.busy_reads > 0 {
                self.busy_reads -= 1;
                return Ok(0x80 | last);
            }
            return Ok(last);
        }
        if window.contains(&address) {
            return Ok(self.dma_access(address, None));
        }
        if status.contains(&address) {
            self.progress((address - ARM_CMD_STATUS_0) as u8);
        }
        Ok(self.regs[address as usize])
    }

    fn write_byte(&mut self, address: u16, value: u8) -> Result<(), Error> {
        self.writes.push((address, value));

        if (ARM_DMA_DATA0..ARM_DMA_DATA0 + 4).contains(&address) {
            self.dma_access(address, Some(value));
            return Ok(());
        }

        self.regs[address as usize] = value;

        if address == DMA_ADDRESS_MSB {
            let base = address_of::<ArmDmaAddress>() as usize;
            let address = u32::from_le_bytes([
                self.regs[base],
                self.regs[base + 1],
                self.regs[base + 2],
                self.regs[base + 3],
            ]);
            self.dma_word = address & !3;
            self.address_latches += 1;
        } else if address == address_of::<ArmCommand>() {
            self.execute(value);
        } else if address == address_of::<ArmControl>() {
            let flags = ArmControlFlags::from_bits_truncate(value);
            if flags.contains(ArmControlFlags::RUN) && !flags.contains(ArmControlFlags::RESET) {
                self.boot();
            }
        }
        Ok(())
    }
}

/// Firmware checksum: wrapping sum of every little-endian word except
/// the last, which holds the stored checksum
pub fn checksum(image: &[u8]) -> u32 {
    image[..image.len() - 4]
        .chunks_exact(4)
        .fold(0u32, |sum, word| {
            sum.wrapping_add(u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
        })
}

/// Timer that expires after a fixed number of checks
pub struct FakeTimer {
    remaining: u32,
    pub starts: Vec<u32>,
}

impl FakeTimer {
    pub fn new() -> Self {
        Self {
            remaining: 0,
            starts: Vec::new(),
        }
    }
}

impl Timer for FakeTimer {
    fn start(&mut self, timeout_ms: u32) {
        self.remaining = timeout_ms;
        self.starts.push(timeout_ms);
    }

    fn has_expired(&mut self) -> bool {
        if self.remaining == 0 {
            return true;
        }
        self.remaining -= 1;
        false
    }
}

/// Session backed by a fresh simulator in the IDLE state
pub fn device() -> Device<Sim, FakeTimer> {
    Device::new(Sim::new(), FakeTimer::new())
}
