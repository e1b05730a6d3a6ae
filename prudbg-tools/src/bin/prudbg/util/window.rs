//! A memory window backed by a file.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::Path;

use anyhow::Context;
use prudbg::{Error, WordWindow};

/// The PRU subsystem as seen through a file.
///
/// Every access is a positional read or write of a single word, so a memory
/// device node like `/dev/mem` always shows the current hardware state.
#[derive(Debug)]
pub struct FileWindow {
    file: File,
    offset: u64,
    words: usize,
}

impl FileWindow {
    /// Open `len` bytes of `path` starting at byte `offset`.
    pub fn open(path: &Path, offset: u64, len: u64) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open the memory window {path:?}"))?;

        Ok(Self {
            file,
            offset,
            words: usize::try_from(len / 4)?,
        })
    }

    fn position(&self, index: usize) -> Result<u64, Error> {
        if index < self.words {
            Ok(self.offset + index as u64 * 4)
        } else {
            Err(Error::WindowOutOfBounds {
                index,
                len: self.words,
            })
        }
    }
}

impl WordWindow for FileWindow {
    fn load(&mut self, index: usize) -> Result<u32, Error> {
        let mut bytes = [0; 4];
        let position = self.position(index)?;
        self.file
            .read_exact_at(&mut bytes, position)
            .with_context(|| format!("Failed to read the window at {position:#x}"))?;
        Ok(u32::from_le_bytes(bytes))
    }

    fn store(&mut self, index: usize, value: u32) -> Result<(), Error> {
        let position = self.position(index)?;
        self.file
            .write_all_at(&value.to_le_bytes(), position)
            .with_context(|| format!("Failed to write the window at {position:#x}"))?;
        Ok(())
    }
}
