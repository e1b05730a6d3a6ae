use prudbg::DebugEngine;

use crate::util::common_options::CoreOptions;
use crate::util::{parse_i16, parse_u16};
use crate::Config;

/// Restart a halted core at another address
///
/// e.g. prudbg jump 0x40
///      prudbg jump --by -2
#[derive(clap::Parser)]
#[clap(verbatim_doc_comment)]
pub struct Cmd {
    #[clap(flatten)]
    shared: CoreOptions,

    /// Word address to continue at.
    #[clap(value_parser = parse_u16, required_unless_present = "by", conflicts_with = "by")]
    address: Option<u16>,

    /// Move the program counter by this many words instead.
    #[clap(long, value_parser = parse_i16, allow_hyphen_values = true)]
    by: Option<i16>,
}

impl Cmd {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let mut core = self.shared.open(config)?;
        let mut engine = DebugEngine::new(&mut core, self.shared.engine_config(config));

        let reset = match (self.address, self.by) {
            (_, Some(delta)) => engine.jump_relative(delta)?,
            (Some(address), None) => engine.jump(address)?,
            (None, None) => anyhow::bail!("Either an address or --by is required."),
        };

        println!("We are now at: {reset:#06x}");
        Ok(())
    }
}
