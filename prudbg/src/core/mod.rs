//! Control state of a PRU core.

pub mod registers;

pub use registers::{
    Control, ControlRegister, CycleCount, StallCount, Status, CONSTANTS_TABLE_OFFSET,
    NUM_CONSTANTS, NUM_REGISTERS, REGISTER_FILE_OFFSET,
};

use crate::instruction::Instruction;
use std::fmt;

/// Highest program counter for which the current instruction is shown.
pub const MAX_INSTRUCTION_ADDRESS: u16 = 0x1000;

/// What is known about the instruction under the program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentInstruction {
    /// The core is halted and the word could be read.
    Decoded(Instruction),
    /// The core is running, the word under the program counter is stale.
    CoreRunning,
    /// The program counter lies outside of the instruction memory.
    OutOfRange,
}

impl fmt::Display for CurrentInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decoded(instruction) => write!(f, "{instruction}"),
            Self::CoreRunning => f.write_str("not available since PRU is RUNNING"),
            Self::OutOfRange => f.write_str("PC_OUT_OF_RANGE"),
        }
    }
}

/// A snapshot of the control state of a core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreStatus {
    pub control: Control,
    pub program_counter: u16,
    pub current_instruction: CurrentInstruction,
    pub cycle_count: u32,
    pub stall_count: u32,
}

impl CoreStatus {
    /// Returns `true` if the core is currently running.
    pub fn is_running(&self) -> bool {
        self.control.run_state()
    }
}

impl fmt::Display for CoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let control = self.control;
        let flag = |set: bool, on: &'static str, off: &'static str| if set { on } else { off };

        writeln!(f, "Control register: {:#010x}", u32::from(control))?;
        writeln!(
            f,
            "  Reset PC:{:#06x}  {}, {}, {}, {}, {}",
            control.pc_reset(),
            flag(control.run_state(), "RUNNING", "STOPPED"),
            flag(control.single_step(), "SINGLE_STEP", "FREE_RUN"),
            flag(control.counter_enable(), "COUNTER_ENABLED", "COUNTER_DISABLED"),
            flag(control.sleeping(), "SLEEPING", "NOT_SLEEPING"),
            flag(control.processor_enable(), "PROC_ENABLED", "PROC_DISABLED"),
        )?;
        writeln!(f, "Program counter: {:#06x}", self.program_counter)?;
        writeln!(f, "  Current instruction: {}", self.current_instruction)?;
        write!(
            f,
            "  Cycle counter: {}, stall counter: {}",
            self.cycle_count, self.stall_count
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn status_names_every_flag() {
        let status = CoreStatus {
            control: Control(0x0010_0109),
            program_counter: 0x20,
            current_instruction: CurrentInstruction::Decoded(Instruction::Halt),
            cycle_count: 12,
            stall_count: 3,
        };

        assert_eq!(
            status.to_string(),
            "Control register: 0x00100109\n  \
             Reset PC:0x0010  STOPPED, SINGLE_STEP, COUNTER_ENABLED, NOT_SLEEPING, PROC_DISABLED\n\
             Program counter: 0x0020\n  \
             Current instruction: HALT\n  \
             Cycle counter: 12, stall counter: 3"
        );
    }
}
