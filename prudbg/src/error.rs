use crate::memory::Region;

/// Errors reported by the debugger core.
///
/// Stopping the core is never an error: every way a run can end is
/// described by [`StopReason`](crate::StopReason).
#[derive(thiserror::Error, Debug, docsplay::Display)]
pub enum Error {
    /// Breakpoint {requested} cannot be set at {address:#06x}: breakpoint {owner} is already set at that address.
    BreakpointConflict {
        /// The slot the caller tried to set.
        requested: usize,
        /// The instruction word address both slots would cover.
        address: u32,
        /// The active slot that already covers the address.
        owner: usize,
    },

    /// {kind} number {index} is out of range, there are only {capacity} slots.
    SlotOutOfRange {
        /// Which table was addressed.
        kind: SlotKind,
        /// The rejected slot index.
        index: usize,
        /// The number of slots of the table.
        capacity: usize,
    },

    /// A watch length of {length} bytes is not supported, it must be between 1 and {max}.
    WatchLengthOutOfRange {
        /// The rejected length.
        length: usize,
        /// The maximum watch length.
        max: usize,
    },

    /// Register number {0} is out of range, it must be between 0 and 31.
    RegisterOutOfRange(usize),

    /// The core is running, halt it before accessing its registers.
    CoreRunning,

    /// The program image is {0} bytes long, which is not a multiple of 4.
    UnalignedImage(usize),

    /// The range {address:#x}..{end:#x} exceeds the {region} memory.
    AddressOutOfRange {
        /// The region being accessed.
        region: Region,
        /// First word of the range.
        address: u32,
        /// One past the last word of the range.
        end: u32,
    },

    /// Word {index:#x} lies outside of the mapped window of {len:#x} words.
    WindowOutOfBounds {
        /// The absolute word index.
        index: usize,
        /// The length of the window in words.
        len: usize,
    },

    /// {0}
    Other(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn slot_out_of_range(kind: SlotKind, index: usize, capacity: usize) -> Self {
        Self::SlotOutOfRange {
            kind,
            index,
            capacity,
        }
    }
}

/// The kind of slot table an index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, docsplay::Display)]
pub enum SlotKind {
    /// Breakpoint
    Breakpoint,
    /// Watchpoint
    Watchpoint,
}
