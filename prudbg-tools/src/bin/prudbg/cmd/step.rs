use prudbg::DebugEngine;

use crate::util::common_options::CoreOptions;
use crate::Config;

#[derive(clap::Parser)]
pub struct Cmd {
    #[clap(flatten)]
    shared: CoreOptions,

    /// Number of instructions to execute.
    #[clap(default_value = "1")]
    count: u32,
}

impl Cmd {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let mut core = self.shared.open(config)?;
        let mut engine = DebugEngine::new(&mut core, self.shared.engine_config(config));

        let program_counter = engine.single_step(self.count)?;
        let word = engine.instruction_at(program_counter)?;

        println!(
            "[{program_counter:#06x}] {word:#010x}    {}",
            prudbg::disassemble(word)
        );
        Ok(())
    }
}
