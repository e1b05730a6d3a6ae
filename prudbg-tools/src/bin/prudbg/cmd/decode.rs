use prudbg::disassemble;

use crate::util::parse_u32;

/// Decode instruction words
///
/// e.g. prudbg decode 0x2a000000 0x241234e1
///      Prints the mnemonic of both words
#[derive(clap::Parser)]
#[clap(verbatim_doc_comment)]
pub struct Cmd {
    /// Instruction words, in decimal (16), hexadecimal (0x10) or binary (0b10000) format.
    #[clap(value_parser = parse_u32, required = true)]
    words: Vec<u32>,
}

impl Cmd {
    pub fn run(self) -> anyhow::Result<()> {
        for word in self.words {
            println!("{word:#010x}  {}", disassemble(word));
        }
        Ok(())
    }
}
