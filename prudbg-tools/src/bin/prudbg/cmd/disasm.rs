use std::path::PathBuf;

use anyhow::Context;
use prudbg::{DisassembledLine, Error, Instruction};

use crate::util::parse_u32;

#[derive(clap::Parser)]
pub struct Cmd {
    /// Little endian program image.
    path: PathBuf,

    /// Word address of the first instruction of the image.
    #[clap(long, value_parser = parse_u32, default_value = "0")]
    address: u32,
}

impl Cmd {
    pub fn run(self) -> anyhow::Result<()> {
        let image =
            std::fs::read(&self.path).with_context(|| format!("Failed to read {:?}", self.path))?;

        for line in listing(self.address, &image)? {
            println!("{line}");
        }
        Ok(())
    }
}

/// Decode a program image which is loaded at word `address`.
fn listing(address: u32, image: &[u8]) -> Result<Vec<DisassembledLine>, Error> {
    if image.len() % 4 != 0 {
        return Err(Error::UnalignedImage(image.len()));
    }

    Ok((address..)
        .zip(image.chunks_exact(4))
        .map(|(address, chunk)| {
            let word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            DisassembledLine {
                address,
                word,
                instruction: Instruction::decode(word),
                is_current: false,
            }
        })
        .collect())
}
