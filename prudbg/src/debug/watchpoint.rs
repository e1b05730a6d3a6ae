//! Watchpoint slots of a core.

use crate::error::{Error, SlotKind};
use crate::memory::{MemoryInterface, Region};

/// Number of watchpoint slots of every core.
pub const MAX_WATCHPOINTS: usize = 10;

/// Maximum number of bytes a single watchpoint covers.
pub const MAX_WATCH_LEN: usize = 32;

/// What a watchpoint reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// Report every change, keep running.
    PrintOnChange,
    /// Stop once the memory holds the target value.
    HaltOnValue,
}

/// An active watchpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watchpoint {
    address: u32,
    mode: WatchMode,
    /// Last observed value for [`WatchMode::PrintOnChange`], target value for
    /// [`WatchMode::HaltOnValue`].
    reference: Vec<u8>,
}

impl Watchpoint {
    /// Byte address in data memory.
    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn mode(&self) -> WatchMode {
        self.mode
    }

    /// Number of watched bytes.
    pub fn len(&self) -> usize {
        self.reference.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reference.is_empty()
    }

    pub fn reference(&self) -> &[u8] {
        &self.reference
    }

    /// Compare `current` against the reference.
    ///
    /// In [`WatchMode::PrintOnChange`] the reference follows the memory.
    pub fn evaluate(&mut self, current: &[u8]) -> WatchOutcome {
        match self.mode {
            WatchMode::PrintOnChange if current != self.reference.as_slice() => {
                self.reference.clear();
                self.reference.extend_from_slice(current);
                WatchOutcome::Changed(current.to_vec())
            }
            WatchMode::HaltOnValue if current == self.reference.as_slice() => WatchOutcome::Matched,
            _ => WatchOutcome::Unchanged,
        }
    }
}

/// Result of evaluating a watchpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    Unchanged,
    /// The memory differs from the last observed value, which is now the
    /// new value.
    Changed(Vec<u8>),
    /// The memory holds the target value.
    Matched,
}

/// The fixed set of watchpoint slots of one core.
#[derive(Debug, Clone, Default)]
pub struct WatchpointTable {
    slots: [Option<Watchpoint>; MAX_WATCHPOINTS],
}

impl WatchpointTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// All slots in slot order, `None` for unused ones.
    pub fn list(&self) -> impl Iterator<Item = (usize, Option<&Watchpoint>)> + '_ {
        self.slots.iter().map(Option::as_ref).enumerate()
    }

    /// Slot numbers of the active watchpoints.
    pub fn active_slots(&self) -> Vec<usize> {
        self.list()
            .filter_map(|(slot, watchpoint)| watchpoint.map(|_| slot))
            .collect()
    }

    /// Is any watchpoint active.
    pub fn has_active(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }

    pub fn get(&self, slot: usize) -> Result<Option<&Watchpoint>, Error> {
        Ok(self.slot(slot)?.as_ref())
    }

    pub fn clear(&mut self, slot: usize) -> Result<(), Error> {
        check_slot(slot)?;
        self.slots[slot] = None;
        Ok(())
    }

    /// Watch `length` bytes at `address` for changes.
    ///
    /// The current memory content becomes the reference.
    pub fn set_on_change<M>(
        &mut self,
        slot: usize,
        address: u32,
        length: usize,
        core: &mut M,
    ) -> Result<(), Error>
    where
        M: MemoryInterface + ?Sized,
    {
        check_slot(slot)?;
        check_length(length)?;

        let mut reference = vec![0; length];
        core.read_bytes(Region::Data, address, &mut reference)?;

        tracing::debug!(
            "Watchpoint {} on change of {} bytes at {:#07x}",
            slot,
            length,
            address
        );
        self.slots[slot] = Some(Watchpoint {
            address,
            mode: WatchMode::PrintOnChange,
            reference,
        });
        Ok(())
    }

    /// Stop once the bytes at `address` equal `target`.
    pub fn set_on_value(&mut self, slot: usize, address: u32, target: &[u8]) -> Result<(), Error> {
        check_slot(slot)?;
        check_length(target.len())?;

        tracing::debug!(
            "Watchpoint {} halts when {:#07x} holds {:02x?}",
            slot,
            address,
            target
        );
        self.slots[slot] = Some(Watchpoint {
            address,
            mode: WatchMode::HaltOnValue,
            reference: target.to_vec(),
        });
        Ok(())
    }

    /// Evaluate `slot` against `current`. Unused slots are always unchanged.
    pub fn evaluate(&mut self, slot: usize, current: &[u8]) -> Result<WatchOutcome, Error> {
        Ok(match self.slot_mut(slot)? {
            Some(watchpoint) => watchpoint.evaluate(current),
            None => WatchOutcome::Unchanged,
        })
    }

    fn slot(&self, slot: usize) -> Result<&Option<Watchpoint>, Error> {
        check_slot(slot)?;
        Ok(&self.slots[slot])
    }

    fn slot_mut(&mut self, slot: usize) -> Result<&mut Option<Watchpoint>, Error> {
        check_slot(slot)?;
        Ok(&mut self.slots[slot])
    }
}

fn check_slot(slot: usize) -> Result<(), Error> {
    if slot < MAX_WATCHPOINTS {
        Ok(())
    } else {
        Err(Error::slot_out_of_range(
            SlotKind::Watchpoint,
            slot,
            MAX_WATCHPOINTS,
        ))
    }
}

fn check_length(length: usize) -> Result<(), Error> {
    if (1..=MAX_WATCH_LEN).contains(&length) {
        Ok(())
    } else {
        Err(Error::WatchLengthOutOfRange {
            length,
            max: MAX_WATCH_LEN,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{CoreLayout, MappedCore};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn core() -> MappedCore<Vec<u32>> {
        let layout = CoreLayout {
            instruction: 0x100,
            data: 0,
            control: 0x200,
        };
        let mut window = vec![0; 0x300];
        window[1] = 0x0403_0201;
        MappedCore::new(window, layout)
    }

    #[test]
    fn change_updates_the_reference() {
        let mut table = WatchpointTable::new();
        table.set_on_change(0, 4, 2, &mut core()).unwrap();

        assert_eq!(table.evaluate(0, &[1, 2]).unwrap(), WatchOutcome::Unchanged);
        assert_eq!(
            table.evaluate(0, &[1, 9]).unwrap(),
            WatchOutcome::Changed(vec![1, 9])
        );
        assert_eq!(table.evaluate(0, &[1, 9]).unwrap(), WatchOutcome::Unchanged);
        assert_eq!(table.get(0).unwrap().unwrap().reference(), &[1, 9]);
    }

    #[test]
    fn snapshot_is_taken_from_data_memory() {
        let mut table = WatchpointTable::new();
        table.set_on_change(3, 5, 3, &mut core()).unwrap();

        let watchpoint = table.get(3).unwrap().unwrap();
        assert_eq!(watchpoint.reference(), &[2, 3, 4]);
        assert_eq!(watchpoint.address(), 5);
    }

    #[test]
    fn value_match_never_updates_the_target() {
        let mut table = WatchpointTable::new();
        table.set_on_value(1, 0x10, &[0xaa, 0xbb]).unwrap();

        assert_eq!(table.evaluate(1, &[0xaa, 0x00]).unwrap(), WatchOutcome::Unchanged);
        assert_eq!(table.evaluate(1, &[0xaa, 0xbb]).unwrap(), WatchOutcome::Matched);
        assert_eq!(table.evaluate(1, &[0xaa, 0xbb]).unwrap(), WatchOutcome::Matched);
        assert_eq!(table.get(1).unwrap().unwrap().reference(), &[0xaa, 0xbb]);
    }

    #[test]
    fn unused_slot_is_unchanged() {
        let mut table = WatchpointTable::new();
        assert_eq!(table.evaluate(7, &[1]).unwrap(), WatchOutcome::Unchanged);
        assert!(!table.has_active());
    }

    #[test]
    fn clear_frees_the_slot() {
        let mut table = WatchpointTable::new();
        table.set_on_value(2, 0, &[1]).unwrap();
        table.set_on_value(4, 0, &[1]).unwrap();

        table.clear(2).unwrap();

        assert_eq!(table.active_slots(), vec![4]);
    }

    #[test_case(0; "empty")]
    #[test_case(MAX_WATCH_LEN + 1; "too long")]
    fn length_is_bounds_checked(length: usize) {
        let mut table = WatchpointTable::new();

        let result = table.set_on_change(0, 0, length, &mut core());

        assert!(matches!(result, Err(Error::WatchLengthOutOfRange { .. })));
        assert!(table.get(0).unwrap().is_none());
    }

    #[test]
    fn slot_is_bounds_checked() {
        let mut table = WatchpointTable::new();
        assert!(matches!(
            table.set_on_value(MAX_WATCHPOINTS, 0, &[1]),
            Err(Error::SlotOutOfRange {
                kind: SlotKind::Watchpoint,
                ..
            })
        ));
    }
}
