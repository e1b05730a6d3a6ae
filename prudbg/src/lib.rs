//! # Debugger for PRU cores
//!
//! The PRU cores of TI SoCs expose their instruction memory, data memory and
//! control registers through a memory window of the host processor. This
//! crate decodes PRU instructions and controls the execution of a core
//! through that window only.
//!
//! # Examples
//!
//! ## Decoding an instruction
//! ```
//! use prudbg::disassemble;
//!
//! assert_eq!(disassemble(0x2a00_0000), "HALT");
//! assert_eq!(disassemble(0x2412_34e1), "LDI R1, 0x1234");
//! ```
//!
//! ## Running to a breakpoint
//!
//! ```no_run
//! # use prudbg::Error;
//! use prudbg::{
//!     BreakpointKind, CancellationToken, CoreLayout, DebugEngine, EngineConfig, MappedCore,
//!     StepBudget,
//! };
//!
//! let layout = CoreLayout {
//!     instruction: 0xd000,
//!     data: 0x0000,
//!     control: 0x8800,
//! };
//! // Any `WordWindow` works, e.g. a mapped device file.
//! let mut core = MappedCore::new(vec![0u32; 0x10000], layout);
//! let mut engine = DebugEngine::new(&mut core, EngineConfig::default());
//!
//! engine.set_breakpoint(0, 0x10, BreakpointKind::Hardware)?;
//! let outcome = engine.run(StepBudget::Unbounded, &CancellationToken::new(), |_| {})?;
//!
//! println!("{}", outcome.reason);
//! # Ok::<(), Error>(())
//! ```
//!
//! The crate is built around the [`MemoryInterface`] of a core, the
//! [`Instruction`] decoder and the [`DebugEngine`].

pub mod config;
pub mod core;
pub mod debug;
mod error;
pub mod instruction;
#[warn(missing_docs)]
mod memory;

#[cfg(any(test, feature = "test"))]
mod fake_core;

pub use crate::config::EngineConfig;
pub use crate::core::{Control, CoreStatus, CurrentInstruction, Status};
pub use crate::debug::{
    Breakpoint, BreakpointKind, BreakpointTable, CancellationToken, DebugEngine,
    DisassembledLine, EngineState, RunMode, RunOutcome, StepBudget, StopReason, WatchChange,
    WatchMode, WatchOutcome, Watchpoint, WatchpointTable, MAX_BREAKPOINTS, MAX_WATCHPOINTS,
    MAX_WATCH_LEN,
};
pub use crate::error::{Error, SlotKind};
pub use crate::instruction::{disassemble, Instruction, HALT};
pub use crate::memory::{CoreLayout, MappedCore, MemoryInterface, Region, WordWindow};

// Exports only used in tests
#[cfg(any(test, feature = "test"))]
pub use crate::fake_core::{FakeCore, FAKE_DATA_BYTES, FAKE_INSTRUCTION_WORDS};
