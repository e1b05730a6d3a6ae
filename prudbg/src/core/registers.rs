//! The control/status registers of a PRU core.

use crate::error::Error;
use crate::memory::{MemoryInterface, Region};
use bitfield::bitfield;

/// Word offset of the general purpose register file in the control region.
pub const REGISTER_FILE_OFFSET: u32 = 0x100;

/// Word offset of the constants table in the control region.
pub const CONSTANTS_TABLE_OFFSET: u32 = 0x120;

/// Number of general purpose registers, R0 to R31.
pub const NUM_REGISTERS: usize = 32;

/// Number of entries of the constants table, C0 to C31.
pub const NUM_CONSTANTS: usize = 32;

/// A register of the control region with a fixed word offset.
pub trait ControlRegister: Clone + From<u32> + Into<u32> + Sized + std::fmt::Debug {
    /// Word offset of the register in the control region.
    const OFFSET: u32;
    /// The register's name.
    const NAME: &'static str;

    /// Read the register.
    fn load<M: MemoryInterface + ?Sized>(core: &mut M) -> Result<Self, Error> {
        let value = core.read_word(Region::Control, Self::OFFSET)?;
        tracing::trace!("{} = {:#010x}", Self::NAME, value);
        Ok(Self::from(value))
    }

    /// Write the register.
    fn store<M: MemoryInterface + ?Sized>(self, core: &mut M) -> Result<(), Error> {
        let value: u32 = self.into();
        tracing::trace!("{} <- {:#010x}", Self::NAME, value);
        core.write_word(Region::Control, Self::OFFSET, value)
    }
}

bitfield! {
    /// The control register of a core.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Control(u32);
    impl Debug;
    /// Address the program counter is set to on a soft reset.
    pub u16, pc_reset, set_pc_reset: 31, 16;
    /// The core is executing, or finishing a step.
    pub run_state, _: 15;
    /// Execute a single instruction each time the core is enabled.
    pub single_step, set_single_step: 8;
    /// Cycle and stall counters are counting.
    pub counter_enable, set_counter_enable: 3;
    /// The core executed `SLP`.
    pub sleeping, _: 2;
    /// The core is enabled.
    pub processor_enable, set_processor_enable: 1;
    /// Writing 0 resets the core, reads as 1 once the reset is done.
    pub soft_reset_n, set_soft_reset_n: 0;
}

impl From<u32> for Control {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Control> for u32 {
    fn from(value: Control) -> Self {
        value.0
    }
}

impl ControlRegister for Control {
    const OFFSET: u32 = 0;
    const NAME: &'static str = "CONTROL";
}

bitfield! {
    /// The status register of a core.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Status(u32);
    impl Debug;
    /// Word address of the instruction the core is about to execute.
    pub u16, program_counter, _: 15, 0;
}

impl From<u32> for Status {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Status> for u32 {
    fn from(value: Status) -> Self {
        value.0
    }
}

impl ControlRegister for Status {
    const OFFSET: u32 = 1;
    const NAME: &'static str = "STATUS";
}

/// Number of cycles the core was enabled while counting.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CycleCount(pub u32);

impl From<u32> for CycleCount {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<CycleCount> for u32 {
    fn from(value: CycleCount) -> Self {
        value.0
    }
}

impl ControlRegister for CycleCount {
    const OFFSET: u32 = 3;
    const NAME: &'static str = "CYCLE";
}

/// Number of cycles the core was stalled while counting.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StallCount(pub u32);

impl From<u32> for StallCount {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<StallCount> for u32 {
    fn from(value: StallCount) -> Self {
        value.0
    }
}

impl ControlRegister for StallCount {
    const OFFSET: u32 = 4;
    const NAME: &'static str = "STALL";
}
