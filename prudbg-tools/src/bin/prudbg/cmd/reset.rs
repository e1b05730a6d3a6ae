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

        engine.soft_reset()?;

        println!("PRU{} reset.", self.shared.core);
        Ok(())
    }
}
