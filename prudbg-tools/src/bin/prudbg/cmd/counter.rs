use prudbg::DebugEngine;

use crate::util::common_options::CoreOptions;
use crate::Config;

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Action {
    /// Count cycles and stalls
    On,
    /// Stop counting
    Off,
    /// Reset both counters to zero
    Clear,
}

#[derive(clap::Parser)]
pub struct Cmd {
    #[clap(flatten)]
    shared: CoreOptions,

    #[clap(value_enum)]
    action: Action,
}

impl Cmd {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let mut core = self.shared.open(config)?;
        let mut engine = DebugEngine::new(&mut core, self.shared.engine_config(config));

        match self.action {
            Action::On => engine.set_cycle_counter(true)?,
            Action::Off => engine.set_cycle_counter(false)?,
            Action::Clear => engine.clear_counters()?,
        }

        let status = engine.status()?;
        println!(
            "Cycle counter: {}, stall counter: {}",
            status.cycle_count, status.stall_count
        );
        Ok(())
    }
}
