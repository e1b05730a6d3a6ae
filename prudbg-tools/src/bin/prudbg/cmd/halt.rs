use prudbg::DebugEngine;

use crate::util::common_options::CoreOptions;
use crate::Config;

#[derive(clap::Parser)]
pub struct Cmd {
    #[clap(flatten)]
    shared: CoreOptions,
}

impl Cmd {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let mut core = self.shared.open(config)?;
        let mut engine = DebugEngine::new(&mut core, self.shared.engine_config(config));

        engine.halt()?;

        println!(
            "PRU{} halted at {:#06x}.",
            self.shared.core,
            engine.program_counter()?
        );
        Ok(())
    }
}

#[derive(clap::Parser)]
pub struct ResumeCmd {
    #[clap(flatten)]
    shared: CoreOptions,
}

impl ResumeCmd {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let mut core = self.shared.open(config)?;
        let mut engine = DebugEngine::new(&mut core, self.shared.engine_config(config));

        engine.resume()?;

        println!("PRU{} is running.", self.shared.core);
        Ok(())
    }
}
