//! Breakpoint slots of a core.

use crate::error::{Error, SlotKind};
use crate::instruction::HALT;
use crate::memory::{MemoryInterface, Region};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of breakpoint slots of every core.
pub const MAX_BREAKPOINTS: usize = 10;

/// How a breakpoint stops the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakpointKind {
    /// The instruction is replaced by `HALT` while the core runs.
    Hardware,
    /// The program counter is compared after every single step.
    Software,
}

impl fmt::Display for BreakpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hardware => f.write_str("hw"),
            Self::Software => f.write_str("sw"),
        }
    }
}

/// An active breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoint {
    address: u32,
    kind: BreakpointKind,
    /// The original instruction while `HALT` is patched in.
    saved_instruction: Option<u32>,
}

impl Breakpoint {
    /// Word address in instruction memory.
    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn kind(&self) -> BreakpointKind {
        self.kind
    }

    /// Is `HALT` currently written to instruction memory for this breakpoint.
    pub fn is_patched(&self) -> bool {
        self.saved_instruction.is_some()
    }

    /// The instruction `HALT` replaced, while patched.
    pub fn saved_instruction(&self) -> Option<u32> {
        self.saved_instruction
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x} {}", self.address, self.kind)
    }
}

/// The fixed set of breakpoint slots of one core.
///
/// At most one active slot covers any address. Apart from
/// [`enable_hardware`](Self::enable_hardware) and
/// [`disable_hardware`](Self::disable_hardware) the table never touches
/// the core.
#[derive(Debug, Clone, Default)]
pub struct BreakpointTable {
    slots: [Option<Breakpoint>; MAX_BREAKPOINTS],
}

impl BreakpointTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// All slots in slot order, `None` for unused ones.
    pub fn list(&self) -> impl Iterator<Item = (usize, Option<&Breakpoint>)> + '_ {
        self.slots.iter().map(Option::as_ref).enumerate()
    }

    /// The active breakpoints in slot order.
    pub fn active(&self) -> impl Iterator<Item = (usize, &Breakpoint)> + '_ {
        self.list()
            .filter_map(|(slot, breakpoint)| breakpoint.map(|breakpoint| (slot, breakpoint)))
    }

    pub fn get(&self, slot: usize) -> Result<Option<&Breakpoint>, Error> {
        Ok(self.slot(slot)?.as_ref())
    }

    /// Activate `slot` at `address`.
    ///
    /// Fails without changing the table when another active slot already
    /// covers `address`. Overwriting `slot` itself is always allowed.
    pub fn set(&mut self, slot: usize, address: u32, kind: BreakpointKind) -> Result<(), Error> {
        self.slot(slot)?;

        if let Some((owner, _)) = self
            .active()
            .find(|(other, breakpoint)| *other != slot && breakpoint.address == address)
        {
            return Err(Error::BreakpointConflict {
                requested: slot,
                address,
                owner,
            });
        }

        tracing::debug!("Breakpoint {} set at {:#06x} ({})", slot, address, kind);
        self.slots[slot] = Some(Breakpoint {
            address,
            kind,
            saved_instruction: None,
        });

        Ok(())
    }

    /// Mark `slot` as unused.
    ///
    /// A patched hardware breakpoint has to be disabled first, the saved
    /// instruction is lost otherwise.
    pub fn clear(&mut self, slot: usize) -> Result<(), Error> {
        if let Some(breakpoint) = self.slot_mut(slot)?.take() {
            if breakpoint.is_patched() {
                tracing::warn!(
                    "Breakpoint {} at {:#06x} cleared while patched",
                    slot,
                    breakpoint.address
                );
            }
        }
        Ok(())
    }

    /// The active slot covering `address`, of either kind.
    pub fn find(&self, address: u32) -> Option<usize> {
        self.active()
            .find(|(_, breakpoint)| breakpoint.address == address)
            .map(|(slot, _)| slot)
    }

    /// The active hardware slot covering `address`.
    pub fn find_hardware(&self, address: u32) -> Option<usize> {
        self.find(address)
            .filter(|slot| matches!(self.slots[*slot], Some(bp) if bp.kind == BreakpointKind::Hardware))
    }

    /// Is any software breakpoint active.
    pub fn has_software(&self) -> bool {
        self.active()
            .any(|(_, breakpoint)| breakpoint.kind == BreakpointKind::Software)
    }

    /// Save the instruction at the address of `slot` and replace it by `HALT`.
    ///
    /// Does nothing for unused slots, software breakpoints, and slots which
    /// are already patched.
    pub fn enable_hardware<M>(&mut self, slot: usize, core: &mut M) -> Result<(), Error>
    where
        M: MemoryInterface + ?Sized,
    {
        let Some(breakpoint) = self.slot_mut(slot)?.as_mut() else {
            return Ok(());
        };
        if breakpoint.kind != BreakpointKind::Hardware || breakpoint.is_patched() {
            return Ok(());
        }

        let original = core.read_word(Region::Instruction, breakpoint.address)?;
        core.write_word(Region::Instruction, breakpoint.address, HALT)?;
        breakpoint.saved_instruction = Some(original);

        tracing::trace!(
            "Patched HALT over {:#010x} at {:#06x}",
            original,
            breakpoint.address
        );
        Ok(())
    }

    /// Write the saved instruction of `slot` back.
    ///
    /// Does nothing unless the slot is patched.
    pub fn disable_hardware<M>(&mut self, slot: usize, core: &mut M) -> Result<(), Error>
    where
        M: MemoryInterface + ?Sized,
    {
        let Some(breakpoint) = self.slot_mut(slot)?.as_mut() else {
            return Ok(());
        };
        let Some(original) = breakpoint.saved_instruction else {
            return Ok(());
        };

        core.write_word(Region::Instruction, breakpoint.address, original)?;
        breakpoint.saved_instruction = None;

        tracing::trace!(
            "Restored {:#010x} at {:#06x}",
            original,
            breakpoint.address
        );
        Ok(())
    }

    /// Patch every active hardware breakpoint.
    pub fn enable_all_hardware<M>(&mut self, core: &mut M) -> Result<(), Error>
    where
        M: MemoryInterface + ?Sized,
    {
        for slot in 0..MAX_BREAKPOINTS {
            self.enable_hardware(slot, core)?;
        }
        Ok(())
    }

    /// Restore every patched hardware breakpoint.
    ///
    /// All slots are attempted, the first error is returned.
    pub fn disable_all_hardware<M>(&mut self, core: &mut M) -> Result<(), Error>
    where
        M: MemoryInterface + ?Sized,
    {
        let mut result = Ok(());
        for slot in 0..MAX_BREAKPOINTS {
            if let Err(error) = self.disable_hardware(slot, core) {
                tracing::warn!("Failed to restore breakpoint {}: {}", slot, error);
                if result.is_ok() {
                    result = Err(error);
                }
            }
        }
        result
    }

    fn slot(&self, slot: usize) -> Result<&Option<Breakpoint>, Error> {
        self.slots
            .get(slot)
            .ok_or_else(|| Error::slot_out_of_range(SlotKind::Breakpoint, slot, MAX_BREAKPOINTS))
    }

    fn slot_mut(&mut self, slot: usize) -> Result<&mut Option<Breakpoint>, Error> {
        self.slots
            .get_mut(slot)
            .ok_or_else(|| Error::slot_out_of_range(SlotKind::Breakpoint, slot, MAX_BREAKPOINTS))
    }
}
