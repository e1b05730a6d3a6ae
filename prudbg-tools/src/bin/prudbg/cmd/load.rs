use std::path::PathBuf;

use anyhow::Context;
use prudbg::DebugEngine;

use crate::util::common_options::CoreOptions;
use crate::util::parse_u32;
use crate::Config;

#[derive(clap::Parser)]
pub struct Cmd {
    #[clap(flatten)]
    shared: CoreOptions,

    /// Little endian program image.
    path: PathBuf,

    /// Word address to load the image to.
    #[clap(long, value_parser = parse_u32, default_value = "0")]
    address: u32,
}

impl Cmd {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let image =
            std::fs::read(&self.path).with_context(|| format!("Failed to read {:?}", self.path))?;

        let mut core = self.shared.open(config)?;
        let mut engine = DebugEngine::new(&mut core, self.shared.engine_config(config));

        engine.halt()?;
        engine.load_program(self.address, &image)?;

        println!(
            "Binary file of size {} bytes loaded into PRU{} instruction RAM.",
            image.len(),
            self.shared.core
        );
        Ok(())
    }
}
