use prudbg::DebugEngine;

use crate::util::common_options::CoreOptions;
use crate::util::parse_u32;
use crate::Config;

/// Disassemble instruction memory
///
/// e.g. prudbg dis 0x10 8
///      Lists the eight instructions starting at word 0x10
#[derive(clap::Parser)]
#[clap(verbatim_doc_comment)]
pub struct Cmd {
    #[clap(flatten)]
    shared: CoreOptions,

    /// Word address of the first instruction, the program counter by default.
    #[clap(value_parser = parse_u32)]
    address: Option<u32>,

    /// Number of instructions.
    #[clap(default_value = "16")]
    count: usize,
}

impl Cmd {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let mut core = self.shared.open(config)?;
        let mut engine = DebugEngine::new(&mut core, self.shared.engine_config(config));

        let address = match self.address {
            Some(address) => address,
            None => engine.program_counter()?.into(),
        };

        for line in engine.disassemble(address, self.count)? {
            println!("{line}");
        }
        Ok(())
    }
}
