//! Execution control of a single PRU core.
//!
//! A [`DebugEngine`] borrows the [`MemoryInterface`] of one core and owns
//! the breakpoint and watchpoint tables of that core. All state the engine
//! knows about lives in those tables, the core itself is re-read on every
//! access.
//!
//! [`DebugEngine::run`] picks one of two strategies:
//!
//! - With only hardware breakpoints and no step limit, `HALT` is patched
//!   over every breakpoint and the core runs at full speed. The engine polls
//!   until the core sits on a `HALT`.
//! - Otherwise the core is single-stepped and breakpoints, watchpoints and
//!   `HALT` are checked after every step.

mod breakpoint;
mod cancel;
mod run;
mod watchpoint;

pub use breakpoint::{Breakpoint, BreakpointKind, BreakpointTable, MAX_BREAKPOINTS};
pub use cancel::CancellationToken;
pub use run::{EngineState, RunMode, RunOutcome, StepBudget, StopReason, WatchChange};
pub use watchpoint::{
    WatchMode, WatchOutcome, Watchpoint, WatchpointTable, MAX_WATCHPOINTS, MAX_WATCH_LEN,
};

use crate::config::EngineConfig;
use crate::core::{
    Control, ControlRegister, CoreStatus, CurrentInstruction, CycleCount, StallCount, Status,
    CONSTANTS_TABLE_OFFSET, MAX_INSTRUCTION_ADDRESS, NUM_REGISTERS, REGISTER_FILE_OFFSET,
};
use crate::error::Error;
use crate::instruction::{Instruction, HALT};
use crate::memory::{MemoryInterface, Region};
use std::fmt;

/// Highest word address a listing or a program image may reach.
pub const MAX_WORD_ADDRESS: u32 = 0xffff;

/// One line of a disassembly listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisassembledLine {
    pub address: u32,
    pub word: u32,
    pub instruction: Instruction,
    /// The program counter points at this line.
    pub is_current: bool,
}

impl fmt::Display for DisassembledLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.is_current { ">>" } else { "  " };
        write!(
            f,
            "[{:#06x}] {:#010x} {} {}",
            self.address, self.word, marker, self.instruction
        )
    }
}

/// Debugger state for one core.
pub struct DebugEngine<'m, M: MemoryInterface + ?Sized> {
    core: &'m mut M,
    breakpoints: BreakpointTable,
    watchpoints: WatchpointTable,
    config: EngineConfig,
    state: EngineState,
}

impl<'m, M: MemoryInterface + ?Sized> DebugEngine<'m, M> {
    /// Start a session on `core`. The engine always starts out halted.
    pub fn new(core: &'m mut M, config: EngineConfig) -> Self {
        Self {
            core,
            breakpoints: BreakpointTable::new(),
            watchpoints: WatchpointTable::new(),
            config,
            state: EngineState::Halted,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn breakpoints(&self) -> &BreakpointTable {
        &self.breakpoints
    }

    pub fn watchpoints(&self) -> &WatchpointTable {
        &self.watchpoints
    }

    /// Direct access to the memory of the core.
    pub fn core_mut(&mut self) -> &mut M {
        self.core
    }

    pub fn set_breakpoint(
        &mut self,
        slot: usize,
        address: u32,
        kind: BreakpointKind,
    ) -> Result<(), Error> {
        if self.breakpoints.get(slot)?.is_some_and(Breakpoint::is_patched) {
            self.breakpoints.disable_hardware(slot, self.core)?;
        }
        self.breakpoints.set(slot, address, kind)
    }

    /// Clear `slot`, restoring the instruction if `HALT` is patched in.
    pub fn clear_breakpoint(&mut self, slot: usize) -> Result<(), Error> {
        self.breakpoints.disable_hardware(slot, self.core)?;
        self.breakpoints.clear(slot)
    }

    pub fn set_watch_on_change(
        &mut self,
        slot: usize,
        address: u32,
        length: usize,
    ) -> Result<(), Error> {
        self.watchpoints
            .set_on_change(slot, address, length, self.core)
    }

    pub fn set_watch_on_value(
        &mut self,
        slot: usize,
        address: u32,
        target: &[u8],
    ) -> Result<(), Error> {
        self.watchpoints.set_on_value(slot, address, target)
    }

    pub fn clear_watchpoint(&mut self, slot: usize) -> Result<(), Error> {
        self.watchpoints.clear(slot)
    }

    pub fn program_counter(&mut self) -> Result<u16, Error> {
        Ok(Status::load(self.core)?.program_counter())
    }

    /// The instruction word at word `address`.
    pub fn instruction_at(&mut self, address: u16) -> Result<u32, Error> {
        self.core
            .read_word(Region::Instruction, u32::from(address))
    }

    /// Take a snapshot of the control state.
    pub fn status(&mut self) -> Result<CoreStatus, Error> {
        let control = Control::load(self.core)?;
        let program_counter = self.program_counter()?;

        let current_instruction = if program_counter > MAX_INSTRUCTION_ADDRESS {
            CurrentInstruction::OutOfRange
        } else if control.run_state() {
            CurrentInstruction::CoreRunning
        } else {
            CurrentInstruction::Decoded(Instruction::decode(
                self.instruction_at(program_counter)?,
            ))
        };

        Ok(CoreStatus {
            control,
            program_counter,
            current_instruction,
            cycle_count: CycleCount::load(self.core)?.0,
            stall_count: StallCount::load(self.core)?.0,
        })
    }

    /// R0 to R31.
    pub fn registers(&mut self) -> Result<[u32; NUM_REGISTERS], Error> {
        self.ensure_halted()?;
        self.read_block(REGISTER_FILE_OFFSET)
    }

    /// C0 to C31.
    pub fn constants(&mut self) -> Result<[u32; NUM_REGISTERS], Error> {
        self.ensure_halted()?;
        self.read_block(CONSTANTS_TABLE_OFFSET)
    }

    pub fn register(&mut self, index: usize) -> Result<u32, Error> {
        let offset = register_offset(index)?;
        self.ensure_halted()?;
        self.core.read_word(Region::Control, offset)
    }

    pub fn set_register(&mut self, index: usize, value: u32) -> Result<(), Error> {
        let offset = register_offset(index)?;
        self.ensure_halted()?;
        tracing::debug!("R{} <- {:#010x}", index, value);
        self.core.write_word(Region::Control, offset, value)
    }

    /// Disable the core.
    #[tracing::instrument(skip(self))]
    pub fn halt(&mut self) -> Result<(), Error> {
        let mut control = Control::load(self.core)?;
        control.set_processor_enable(false);
        control.store(self.core)?;
        self.state = EngineState::Halted;
        Ok(())
    }

    /// Let the core run freely, without any breakpoint handling.
    #[tracing::instrument(skip(self))]
    pub fn resume(&mut self) -> Result<(), Error> {
        let mut control = Control::load(self.core)?;
        control.set_single_step(false);
        control.set_processor_enable(true);
        control.store(self.core)
    }

    /// Reset the core, it restarts at the PC reset address.
    #[tracing::instrument(skip(self))]
    pub fn soft_reset(&mut self) -> Result<(), Error> {
        let mut control = Control::load(self.core)?;
        control.set_soft_reset_n(false);
        control.store(self.core)
    }

    /// Restart the halted core at `address`.
    ///
    /// Returns the PC reset address read back from the core.
    #[tracing::instrument(skip(self))]
    pub fn jump(&mut self, address: u16) -> Result<u16, Error> {
        let mut control = Control::load(self.core)?;
        control.set_pc_reset(address);
        control.store(self.core)?;

        self.halt()?;
        self.soft_reset()?;

        Ok(Control::load(self.core)?.pc_reset())
    }

    /// Restart the halted core `delta` words away from the program counter.
    pub fn jump_relative(&mut self, delta: i16) -> Result<u16, Error> {
        let program_counter = self.program_counter()?;
        self.jump(program_counter.wrapping_add_signed(delta))
    }

    pub fn set_cycle_counter(&mut self, enabled: bool) -> Result<(), Error> {
        let mut control = Control::load(self.core)?;
        control.set_counter_enable(enabled);
        control.store(self.core)
    }

    /// Reset the cycle and the stall counter.
    pub fn clear_counters(&mut self) -> Result<(), Error> {
        CycleCount(0).store(self.core)?;
        StallCount(0).store(self.core)
    }

    /// Write a little endian program image to instruction memory.
    ///
    /// Returns the number of words written.
    pub fn load_program(&mut self, address: u32, image: &[u8]) -> Result<usize, Error> {
        if image.len() % 4 != 0 {
            return Err(Error::UnalignedImage(image.len()));
        }
        let words = image.len() / 4;
        check_range(Region::Instruction, address, words)?;

        for (offset, chunk) in (address..).zip(image.chunks_exact(4)) {
            let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            self.core.write_word(Region::Instruction, offset, word)?;
        }

        tracing::info!("Loaded {} words at {:#06x}", words, address);
        Ok(words)
    }

    /// Decode `count` words of instruction memory starting at `address`.
    pub fn disassemble(
        &mut self,
        address: u32,
        count: usize,
    ) -> Result<Vec<DisassembledLine>, Error> {
        check_range(Region::Instruction, address, count)?;
        let program_counter = u32::from(self.program_counter()?);

        (address..)
            .take(count)
            .map(|address| {
                let word = self.core.read_word(Region::Instruction, address)?;
                Ok(DisassembledLine {
                    address,
                    word,
                    instruction: Instruction::decode(word),
                    is_current: address == program_counter,
                })
            })
            .collect()
    }

    /// Execute `count` instructions, one at a time.
    ///
    /// No breakpoints or watchpoints are evaluated. Returns the program
    /// counter afterwards.
    #[tracing::instrument(skip(self))]
    pub fn single_step(&mut self, count: u32) -> Result<u16, Error> {
        let stepped = (0..count).try_for_each(|_| self.step_once());
        let stopped = self.stop_core();
        self.state = EngineState::Halted;

        stepped?;
        stopped?;
        self.program_counter()
    }

    /// Run the core until a breakpoint, a watchpoint, a `HALT` instruction,
    /// the end of `budget`, or cancellation stops it.
    ///
    /// `on_change` is called for every change a print-on-change watchpoint
    /// observes.
    #[tracing::instrument(skip(self, cancel, on_change))]
    pub fn run<F>(
        &mut self,
        budget: StepBudget,
        cancel: &CancellationToken,
        mut on_change: F,
    ) -> Result<RunOutcome, Error>
    where
        F: FnMut(&WatchChange),
    {
        let mode = if budget.is_unbounded()
            && !self.breakpoints.has_software()
            && !self.watchpoints.has_active()
        {
            RunMode::HardwareFast
        } else {
            RunMode::SoftwareStepping
        };
        tracing::debug!("Running with {}", mode);

        let result = match mode {
            RunMode::HardwareFast => {
                self.state = EngineState::RunningHardwareFast;
                self.run_hardware(cancel)
            }
            RunMode::SoftwareStepping => {
                self.state = EngineState::SteppingSoftware { remaining: budget };
                self.run_software(budget, cancel, &mut on_change)
            }
        };

        // The core is stopped and memory restored whatever ended the run.
        let stopped = self.stop_core();
        let restored = self.breakpoints.disable_all_hardware(self.core);

        let (reason, steps) = match (result, stopped, restored) {
            (Ok(done), Ok(()), Ok(())) => done,
            (Err(error), ..) | (_, Err(error), _) | (_, _, Err(error)) => {
                self.state = EngineState::Halted;
                return Err(error);
            }
        };

        self.state = EngineState::Stopped(reason);
        let program_counter = self.program_counter()?;
        tracing::debug!("Stopped at {:#06x}: {}", program_counter, reason);

        Ok(RunOutcome {
            reason,
            mode,
            steps,
            program_counter,
        })
    }

    /// Record the program counter while the core runs freely.
    ///
    /// The first entry is the program counter the core starts from. Every
    /// program counter which differs from the previous entry is recorded,
    /// until `max_entries` are recorded, `cancel` is triggered, or, with
    /// `stop_on_halt`, the core sits on a `HALT`. The core is halted
    /// afterwards. With `max_entries` of 0 the core is left untouched.
    #[tracing::instrument(skip(self, cancel))]
    pub fn trace(
        &mut self,
        max_entries: usize,
        stop_on_halt: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<u16>, Error> {
        if max_entries == 0 {
            return Ok(Vec::new());
        }

        let mut trace = Vec::with_capacity(max_entries.min(0x10000));
        trace.push(self.program_counter()?);
        self.resume()?;

        let traced = self.record_trace(&mut trace, max_entries, stop_on_halt, cancel);
        let halted = self.halt();
        traced?;
        halted?;

        tracing::debug!("Traced {} program counter values", trace.len());
        Ok(trace)
    }

    fn record_trace(
        &mut self,
        trace: &mut Vec<u16>,
        max_entries: usize,
        stop_on_halt: bool,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        while trace.len() < max_entries && !cancel.is_cancelled() {
            let program_counter = self.program_counter()?;
            if trace.last() != Some(&program_counter) {
                trace.push(program_counter);
            }
            if stop_on_halt && self.instruction_at(program_counter)? == HALT {
                break;
            }
        }
        Ok(())
    }

    fn run_hardware(&mut self, cancel: &CancellationToken) -> Result<(StopReason, u64), Error> {
        let mut steps = 0;
        self.breakpoints.enable_all_hardware(self.core)?;

        let start = self.program_counter()?;
        if let Some(slot) = self.breakpoints.find_hardware(start.into()) {
            tracing::debug!("Stepping off breakpoint {} at {:#06x}", slot, start);
            self.breakpoints.disable_hardware(slot, self.core)?;
            self.step_once()?;
            steps += 1;

            // A self-branch leaves the PC on the breakpoint, the free run
            // below then reports it right away.
            self.breakpoints.enable_hardware(slot, self.core)?;
        }

        self.resume()?;

        loop {
            if cancel.is_cancelled() {
                return Ok((StopReason::Cancelled, steps));
            }

            let program_counter = self.program_counter()?;
            if self.instruction_at(program_counter)? == HALT {
                let reason = match self.breakpoints.find_hardware(program_counter.into()) {
                    Some(slot) => StopReason::BreakpointHit {
                        slot,
                        address: program_counter,
                    },
                    None => StopReason::HaltInstruction {
                        address: program_counter,
                    },
                };
                return Ok((reason, steps));
            }

            std::thread::sleep(self.config.poll_interval);
        }
    }

    fn run_software<F>(
        &mut self,
        mut budget: StepBudget,
        cancel: &CancellationToken,
        on_change: &mut F,
    ) -> Result<(StopReason, u64), Error>
    where
        F: FnMut(&WatchChange),
    {
        let mut steps = 0;

        loop {
            if cancel.is_cancelled() {
                return Ok((StopReason::Cancelled, steps));
            }
            if !budget.take() {
                return Ok((StopReason::StepBudgetExhausted, steps));
            }
            self.state = EngineState::SteppingSoftware { remaining: budget };

            self.step_once()?;
            steps += 1;

            let program_counter = self.program_counter()?;
            let breakpoint = self.breakpoints.find(program_counter.into());
            let watchpoint = self.check_watchpoints(program_counter, steps, on_change)?;

            let reason = if let Some(slot) = breakpoint {
                StopReason::BreakpointHit {
                    slot,
                    address: program_counter,
                }
            } else if let Some(slot) = watchpoint {
                StopReason::WatchpointHalt { slot }
            } else if self.instruction_at(program_counter)? == HALT {
                StopReason::HaltInstruction {
                    address: program_counter,
                }
            } else {
                continue;
            };

            return Ok((reason, steps));
        }
    }

    /// Evaluate every active watchpoint, reporting changes.
    ///
    /// Returns the first slot which reached its halt value.
    fn check_watchpoints<F>(
        &mut self,
        program_counter: u16,
        step: u64,
        on_change: &mut F,
    ) -> Result<Option<usize>, Error>
    where
        F: FnMut(&WatchChange),
    {
        let mut halted = None;

        for slot in self.watchpoints.active_slots() {
            let Some((address, length)) = self
                .watchpoints
                .get(slot)?
                .map(|watchpoint| (watchpoint.address(), watchpoint.len()))
            else {
                continue;
            };

            let mut current = vec![0; length];
            self.core.read_bytes(Region::Data, address, &mut current)?;

            match self.watchpoints.evaluate(slot, &current)? {
                WatchOutcome::Unchanged => {}
                WatchOutcome::Changed(bytes) => {
                    tracing::info!(
                        "@{:#06x} [{:#07x}] t={}: {:02x?}",
                        program_counter,
                        address,
                        step,
                        bytes
                    );
                    on_change(&WatchChange {
                        slot,
                        address,
                        program_counter,
                        step,
                        bytes,
                    });
                }
                WatchOutcome::Matched => {
                    tracing::info!(
                        "Watchpoint {} matched at {:#06x} after {} steps",
                        slot,
                        program_counter,
                        step
                    );
                    halted.get_or_insert(slot);
                }
            }
        }

        Ok(halted)
    }

    /// Let the core execute exactly one instruction.
    fn step_once(&mut self) -> Result<(), Error> {
        let mut control = Control::load(self.core)?;
        control.set_processor_enable(true);
        control.set_single_step(true);
        control.store(self.core)?;

        for _ in 0..self.config.step_settle_polls {
            if !Control::load(self.core)?.run_state() {
                return Ok(());
            }
        }

        tracing::warn!(
            "Core still running after {} polls of a single step",
            self.config.step_settle_polls
        );
        Ok(())
    }

    /// Clear processor enable and single step.
    fn stop_core(&mut self) -> Result<(), Error> {
        let mut control = Control::load(self.core)?;
        control.set_processor_enable(false);
        control.set_single_step(false);
        control.store(self.core)
    }

    fn ensure_halted(&mut self) -> Result<(), Error> {
        if Control::load(self.core)?.run_state() {
            Err(Error::CoreRunning)
        } else {
            Ok(())
        }
    }

    fn read_block(&mut self, base: u32) -> Result<[u32; NUM_REGISTERS], Error> {
        let mut values = [0; NUM_REGISTERS];
        for (offset, value) in (base..).zip(values.iter_mut()) {
            *value = self.core.read_word(Region::Control, offset)?;
        }
        Ok(values)
    }
}

impl<M: MemoryInterface + ?Sized> fmt::Debug for DebugEngine<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugEngine")
            .field("breakpoints", &self.breakpoints)
            .field("watchpoints", &self.watchpoints)
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn register_offset(index: usize) -> Result<u32, Error> {
    if index < NUM_REGISTERS {
        Ok(REGISTER_FILE_OFFSET + index as u32)
    } else {
        Err(Error::RegisterOutOfRange(index))
    }
}

fn check_range(region: Region, address: u32, count: usize) -> Result<(), Error> {
    let end = u64::from(address) + count as u64;
    if end > u64::from(MAX_WORD_ADDRESS) {
        return Err(Error::AddressOutOfRange {
            region,
            address,
            end: u32::try_from(end).unwrap_or(u32::MAX),
        });
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::{CoreLayout, MappedCore};
    use pretty_assertions::assert_eq;

    const LAYOUT: CoreLayout = CoreLayout {
        instruction: 0x0000,
        data: 0x1000,
        control: 0x1800,
    };

    fn window() -> MappedCore<Vec<u32>> {
        MappedCore::new(vec![0; 0x2000], LAYOUT)
    }

    #[test]
    fn listing_marks_the_program_counter() {
        let mut core = window();
        core.write_word(Region::Instruction, 1, HALT).unwrap();
        core.write_word(Region::Control, 1, 1).unwrap();
        let mut engine = DebugEngine::new(&mut core, EngineConfig::default());

        let listing: Vec<_> = engine
            .disassemble(0, 2)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(
            listing,
            vec![
                "[0x0000] 0x00000000    ADD R0.b0, R0.b0, R0.b0",
                "[0x0001] 0x2a000000 >> HALT",
            ]
        );
    }

    #[test]
    fn listing_is_limited() {
        let mut core = window();
        let mut engine = DebugEngine::new(&mut core, EngineConfig::default());

        assert!(matches!(
            engine.disassemble(0xfff0, 0x20),
            Err(Error::AddressOutOfRange {
                region: Region::Instruction,
                address: 0xfff0,
                end: 0x1_0010
            })
        ));
    }

    #[test]
    fn program_image_is_little_endian() {
        let mut core = window();
        let mut engine = DebugEngine::new(&mut core, EngineConfig::default());

        let words = engine
            .load_program(4, &[0x00, 0x00, 0x00, 0x2a, 0xe1, 0x34, 0x12, 0x24])
            .unwrap();

        assert_eq!(words, 2);
        assert_eq!(engine.instruction_at(4).unwrap(), HALT);
        assert_eq!(engine.instruction_at(5).unwrap(), 0x2412_34e1);
    }

    #[test]
    fn program_image_must_be_word_aligned() {
        let mut core = window();
        let mut engine = DebugEngine::new(&mut core, EngineConfig::default());

        assert!(matches!(
            engine.load_program(0, &[1, 2, 3]),
            Err(Error::UnalignedImage(3))
        ));
    }

    #[test]
    fn registers_follow_the_register_file() {
        let mut core = window();
        core.write_word(Region::Control, REGISTER_FILE_OFFSET + 3, 0xcafe)
            .unwrap();
        core.write_word(Region::Control, CONSTANTS_TABLE_OFFSET + 31, 0xbeef)
            .unwrap();
        let mut engine = DebugEngine::new(&mut core, EngineConfig::default());

        assert_eq!(engine.registers().unwrap()[3], 0xcafe);
        assert_eq!(engine.constants().unwrap()[31], 0xbeef);

        engine.set_register(3, 7).unwrap();
        assert_eq!(engine.register(3).unwrap(), 7);
        assert!(matches!(
            engine.register(32),
            Err(Error::RegisterOutOfRange(32))
        ));
    }

    #[test]
    fn registers_are_hidden_while_running() {
        let mut core = window();
        core.write_word(Region::Control, 0, 1 << 15).unwrap();
        let mut engine = DebugEngine::new(&mut core, EngineConfig::default());

        assert!(matches!(engine.registers(), Err(Error::CoreRunning)));
        assert!(matches!(engine.set_register(0, 1), Err(Error::CoreRunning)));
    }

    #[test]
    fn status_hides_instruction_out_of_range() {
        let mut core = window();
        core.write_word(Region::Control, 1, 0x1001).unwrap();
        let mut engine = DebugEngine::new(&mut core, EngineConfig::default());

        let status = engine.status().unwrap();

        assert_eq!(status.program_counter, 0x1001);
        assert_eq!(status.current_instruction, CurrentInstruction::OutOfRange);
    }
}
