//! Access to the memory window of a single PRU core.
//!
//! The PRU subsystem exposes everything the debugger can observe through one
//! window of 32-bit words: instruction RAM, data RAM and the control/status
//! registers of every core. [`WordWindow`] models that flat window, while
//! [`MemoryInterface`] is the per-core view the rest of the crate works with.
//! [`MappedCore`] glues the two together using a [`CoreLayout`].

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// One of the three memory regions of a core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, docsplay::Display)]
pub enum Region {
    /// instruction
    Instruction,
    /// data
    Data,
    /// control
    Control,
}

/// An interface to the memory regions of one PRU core.
///
/// Word accesses are addressed by word offset inside the region, byte accesses
/// by byte offset inside the region. Every access goes straight to the
/// hardware, the core can change its memory at any time.
pub trait MemoryInterface {
    /// Read the word at `offset` of `region`.
    fn read_word(&mut self, region: Region, offset: u32) -> Result<u32, Error>;

    /// Write `value` to the word at `offset` of `region`.
    fn write_word(&mut self, region: Region, offset: u32, value: u32) -> Result<(), Error>;

    /// Read `data.len()` bytes starting at byte `offset` of `region`.
    ///
    /// Words are little endian, like the PRU itself.
    fn read_bytes(&mut self, region: Region, offset: u32, data: &mut [u8]) -> Result<(), Error> {
        let mut address = offset;
        let mut done = 0;

        while done < data.len() {
            let lane = (address % 4) as usize;
            let count = (4 - lane).min(data.len() - done);
            let word = self.read_word(region, address / 4)?.to_le_bytes();

            data[done..done + count].copy_from_slice(&word[lane..lane + count]);

            done += count;
            address += count as u32;
        }

        Ok(())
    }

    /// Write `data` starting at byte `offset` of `region`.
    ///
    /// Partially covered words are read back first so that their remaining
    /// bytes keep their value.
    fn write_bytes(&mut self, region: Region, offset: u32, data: &[u8]) -> Result<(), Error> {
        let mut address = offset;
        let mut done = 0;

        while done < data.len() {
            let lane = (address % 4) as usize;
            let count = (4 - lane).min(data.len() - done);

            let mut word = if count == 4 {
                [0; 4]
            } else {
                self.read_word(region, address / 4)?.to_le_bytes()
            };
            word[lane..lane + count].copy_from_slice(&data[done..done + count]);
            self.write_word(region, address / 4, u32::from_le_bytes(word))?;

            done += count;
            address += count as u32;
        }

        Ok(())
    }
}

impl<T> MemoryInterface for &mut T
where
    T: MemoryInterface + ?Sized,
{
    fn read_word(&mut self, region: Region, offset: u32) -> Result<u32, Error> {
        (**self).read_word(region, offset)
    }

    fn write_word(&mut self, region: Region, offset: u32, value: u32) -> Result<(), Error> {
        (**self).write_word(region, offset, value)
    }

    fn read_bytes(&mut self, region: Region, offset: u32, data: &mut [u8]) -> Result<(), Error> {
        (**self).read_bytes(region, offset, data)
    }

    fn write_bytes(&mut self, region: Region, offset: u32, data: &[u8]) -> Result<(), Error> {
        (**self).write_bytes(region, offset, data)
    }
}

/// A flat window of 32-bit words, indexed from the start of the PRU subsystem.
pub trait WordWindow {
    /// Read the word at `index`.
    fn load(&mut self, index: usize) -> Result<u32, Error>;

    /// Write the word at `index`.
    fn store(&mut self, index: usize, value: u32) -> Result<(), Error>;
}

impl WordWindow for [u32] {
    fn load(&mut self, index: usize) -> Result<u32, Error> {
        let len = self.len();
        self.get(index)
            .copied()
            .ok_or(Error::WindowOutOfBounds { index, len })
    }

    fn store(&mut self, index: usize, value: u32) -> Result<(), Error> {
        let len = self.len();
        let word = self
            .get_mut(index)
            .ok_or(Error::WindowOutOfBounds { index, len })?;
        *word = value;
        Ok(())
    }
}

impl WordWindow for Vec<u32> {
    fn load(&mut self, index: usize) -> Result<u32, Error> {
        self.as_mut_slice().load(index)
    }

    fn store(&mut self, index: usize, value: u32) -> Result<(), Error> {
        self.as_mut_slice().store(index, value)
    }
}

impl<W> WordWindow for &mut W
where
    W: WordWindow + ?Sized,
{
    fn load(&mut self, index: usize) -> Result<u32, Error> {
        (**self).load(index)
    }

    fn store(&mut self, index: usize, value: u32) -> Result<(), Error> {
        (**self).store(index, value)
    }
}

/// Where the regions of one core live inside the [`WordWindow`].
///
/// All offsets are word offsets from the start of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreLayout {
    /// Start of the instruction RAM.
    pub instruction: u32,
    /// Start of the data RAM.
    pub data: u32,
    /// Start of the control/status registers.
    pub control: u32,
}

impl CoreLayout {
    /// The base word offset of `region`.
    pub fn base(&self, region: Region) -> u32 {
        match region {
            Region::Instruction => self.instruction,
            Region::Data => self.data,
            Region::Control => self.control,
        }
    }
}

/// The [`MemoryInterface`] of one core inside a shared [`WordWindow`].
#[derive(Debug)]
pub struct MappedCore<W> {
    window: W,
    layout: CoreLayout,
}

impl<W: WordWindow> MappedCore<W> {
    /// Create a view of the core described by `layout`.
    pub fn new(window: W, layout: CoreLayout) -> Self {
        Self { window, layout }
    }

    /// The layout of this core.
    pub fn layout(&self) -> &CoreLayout {
        &self.layout
    }

    /// Access the underlying window.
    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    /// Give back the underlying window.
    pub fn into_inner(self) -> W {
        self.window
    }

    fn index(&self, region: Region, offset: u32) -> usize {
        self.layout.base(region) as usize + offset as usize
    }
}

impl<W: WordWindow> MemoryInterface for MappedCore<W> {
    fn read_word(&mut self, region: Region, offset: u32) -> Result<u32, Error> {
        let index = self.index(region, offset);
        self.window.load(index)
    }

    fn write_word(&mut self, region: Region, offset: u32, value: u32) -> Result<(), Error> {
        let index = self.index(region, offset);
        self.window.store(index, value)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    const LAYOUT: CoreLayout = CoreLayout {
        instruction: 0x20,
        data: 0x00,
        control: 0x10,
    };

    #[test]
    fn regions_are_offset_by_layout() {
        let mut core = MappedCore::new(vec![0u32; 0x40], LAYOUT);

        core.write_word(Region::Instruction, 2, 0x2a00_0000).unwrap();
        core.write_word(Region::Control, 1, 0x42).unwrap();

        let window = core.into_inner();
        assert_eq!(window[0x22], 0x2a00_0000);
        assert_eq!(window[0x11], 0x42);
    }

    #[test]
    fn unaligned_byte_reads_span_words() {
        let mut window = vec![0u32; 0x40];
        window[0] = 0x4433_2211;
        window[1] = 0x8877_6655;
        let mut core = MappedCore::new(window, LAYOUT);

        let mut buffer = [0u8; 5];
        core.read_bytes(Region::Data, 2, &mut buffer).unwrap();

        assert_eq!(buffer, [0x33, 0x44, 0x55, 0x66, 0x77]);
    }

    #[test]
    fn partial_byte_writes_keep_neighbours() {
        let mut window = vec![0u32; 0x40];
        window[0] = 0x4433_2211;
        window[1] = 0x8877_6655;
        let mut core = MappedCore::new(window, LAYOUT);

        core.write_bytes(Region::Data, 3, &[0xaa, 0xbb]).unwrap();

        let window = core.into_inner();
        assert_eq!(window[0], 0xaa33_2211);
        assert_eq!(window[1], 0x8877_66bb);
    }

    #[test]
    fn access_outside_of_window_fails() {
        let mut core = MappedCore::new(vec![0u32; 0x40], LAYOUT);

        let result = core.read_word(Region::Instruction, 0x20);

        assert!(matches!(
            result,
            Err(Error::WindowOutOfBounds {
                index: 0x40,
                len: 0x40
            })
        ));
    }
}
