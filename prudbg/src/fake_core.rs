#![allow(missing_docs)] // Don't require docs for test code
//! A scripted PRU core for tests and dry runs.

use crate::core::{Control, REGISTER_FILE_OFFSET};
use crate::debug::CancellationToken;
use crate::error::Error;
use crate::instruction::HALT;
use crate::memory::{MemoryInterface, Region, WordWindow};
use std::collections::HashMap;

/// Number of instruction words of the fake core.
pub const FAKE_INSTRUCTION_WORDS: usize = 0x1000;
/// Number of data bytes of the fake core.
pub const FAKE_DATA_BYTES: usize = 0x2000;
const CONTROL_WORDS: usize = 0x140;

/// This is a mock core which executes nothing but control flow.
///
/// Every instruction moves the program counter to the next word unless a
/// jump is scripted for its address. Data memory only changes through
/// scripted writes, which are applied after a given single step.
#[derive(Debug)]
pub struct FakeCore {
    instructions: Vec<u32>,
    data: Vec<u8>,
    control: Vec<u32>,
    program_counter: u16,

    jumps: HashMap<u16, u16>,
    data_writes: HashMap<u64, Vec<(u32, Vec<u8>)>>,
    steps: u64,

    /// Instruction memory as seen whenever a free run started.
    free_runs: Vec<Vec<u32>>,
    /// A free run never reaches a `HALT`, the core keeps running.
    running: bool,

    cancel: Option<(CancellationToken, u32)>,
    status_reads: u32,
}

impl Default for FakeCore {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeCore {
    /// A halted core at address 0 with all memory cleared.
    pub fn new() -> Self {
        let mut control = vec![0; CONTROL_WORDS];
        control[0] = 1;
        Self {
            instructions: vec![0; FAKE_INSTRUCTION_WORDS],
            data: vec![0; FAKE_DATA_BYTES],
            control,
            program_counter: 0,
            jumps: HashMap::new(),
            data_writes: HashMap::new(),
            steps: 0,
            free_runs: Vec::new(),
            running: false,
            cancel: None,
            status_reads: 0,
        }
    }

    /// Place `program` at address 0.
    pub fn with_program(mut self, program: &[u32]) -> Self {
        self.instructions[..program.len()].copy_from_slice(program);
        self
    }

    pub fn with_instruction(mut self, address: u16, word: u32) -> Self {
        self.instructions[usize::from(address)] = word;
        self
    }

    pub fn with_program_counter(mut self, program_counter: u16) -> Self {
        self.program_counter = program_counter;
        self
    }

    /// Continue at `to` after executing the instruction at `from`.
    pub fn with_jump(mut self, from: u16, to: u16) -> Self {
        self.jumps.insert(from, to);
        self
    }

    /// Write `bytes` to data memory right after single step number `step`.
    pub fn with_data_write_after_step(mut self, step: u64, address: u32, bytes: &[u8]) -> Self {
        self.data_writes
            .entry(step)
            .or_default()
            .push((address, bytes.to_vec()));
        self
    }

    /// Cancel `token` once the status register was read `reads` times.
    pub fn with_cancel_after_status_reads(mut self, token: CancellationToken, reads: u32) -> Self {
        self.cancel = Some((token, reads));
        self
    }

    pub fn with_register(mut self, index: usize, value: u32) -> Self {
        self.control[REGISTER_FILE_OFFSET as usize + index] = value;
        self
    }

    pub fn instruction(&self, address: u16) -> u32 {
        self.instructions[usize::from(address)]
    }

    pub fn data(&self, address: usize, length: usize) -> &[u8] {
        &self.data[address..address + length]
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub fn control(&self) -> Control {
        Control(self.control[0])
    }

    /// Number of single steps executed.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn free_runs(&self) -> &[Vec<u32>] {
        &self.free_runs
    }

    fn next_address(&self) -> u16 {
        match self.jumps.get(&self.program_counter) {
            Some(target) => *target,
            None => (self.program_counter + 1) % FAKE_INSTRUCTION_WORDS as u16,
        }
    }

    fn step(&mut self) {
        if self.instructions[usize::from(self.program_counter)] != HALT {
            self.program_counter = self.next_address();
        }
        self.steps += 1;

        if Control(self.control[0]).counter_enable() {
            self.control[3] = self.control[3].wrapping_add(1);
        }

        if let Some(writes) = self.data_writes.remove(&self.steps) {
            for (address, bytes) in writes {
                let start = address as usize;
                self.data[start..start + bytes.len()].copy_from_slice(&bytes);
            }
        }
    }

    fn free_run(&mut self) {
        self.free_runs.push(self.instructions.clone());

        for _ in 0..FAKE_INSTRUCTION_WORDS * 4 {
            if self.instructions[usize::from(self.program_counter)] == HALT {
                self.running = false;
                return;
            }
            self.program_counter = self.next_address();
        }
        self.running = true;
    }

    fn write_control(&mut self, value: u32) {
        let mut control = Control(value);

        if !control.soft_reset_n() {
            self.program_counter = control.pc_reset() % FAKE_INSTRUCTION_WORDS as u16;
            self.running = false;
            control.set_soft_reset_n(true);
        }

        if control.processor_enable() && control.single_step() {
            self.step();
            self.running = false;
            control.set_processor_enable(false);
        } else if control.processor_enable() {
            self.free_run();
        } else {
            self.running = false;
        }

        // RUNSTATE is read only
        let value = u32::from(control) & !(1 << 15);
        self.control[0] = value | (u32::from(self.running) << 15);
    }

    fn read_status(&mut self) -> u32 {
        self.status_reads += 1;
        if let Some((token, reads)) = &self.cancel {
            if self.status_reads >= *reads {
                token.cancel();
            }
        }
        u32::from(self.program_counter)
    }
}

impl MemoryInterface for FakeCore {
    fn read_word(&mut self, region: Region, offset: u32) -> Result<u32, Error> {
        let index = offset as usize;
        match region {
            Region::Instruction => self.instructions.load(index),
            Region::Data => {
                let bytes = self
                    .data
                    .get(index * 4..index * 4 + 4)
                    .ok_or(Error::WindowOutOfBounds {
                        index,
                        len: FAKE_DATA_BYTES / 4,
                    })?;
                Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            Region::Control if offset == 1 => Ok(self.read_status()),
            Region::Control => self.control.load(index),
        }
    }

    fn write_word(&mut self, region: Region, offset: u32, value: u32) -> Result<(), Error> {
        let index = offset as usize;
        match region {
            Region::Instruction => self.instructions.store(index, value),
            Region::Data => {
                let bytes = self
                    .data
                    .get_mut(index * 4..index * 4 + 4)
                    .ok_or(Error::WindowOutOfBounds {
                        index,
                        len: FAKE_DATA_BYTES / 4,
                    })?;
                bytes.copy_from_slice(&value.to_le_bytes());
                Ok(())
            }
            Region::Control if offset == 0 => {
                self.write_control(value);
                Ok(())
            }
            // STATUS is read only
            Region::Control if offset == 1 => Ok(()),
            Region::Control => self.control.store(index, value),
        }
    }
}
