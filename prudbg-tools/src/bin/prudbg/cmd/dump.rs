use prudbg::{DebugEngine, MemoryInterface, Region};

use crate::util::common_options::CoreOptions;
use crate::util::{hex_rows, parse_u32};
use crate::Config;

#[derive(clap::Parser)]
pub struct Cmd {
    #[clap(flatten)]
    shared: CoreOptions,

    /// Byte address in data memory.
    #[clap(value_parser = parse_u32)]
    address: u32,

    /// Number of bytes.
    #[clap(value_parser = parse_u32, default_value = "64")]
    length: u32,
}

impl Cmd {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let mut core = self.shared.open(config)?;
        let mut engine = DebugEngine::new(&mut core, self.shared.engine_config(config));

        let mut bytes = vec![0; self.length as usize];
        engine
            .core_mut()
            .read_bytes(Region::Data, self.address, &mut bytes)?;

        for row in hex_rows(self.address, &bytes) {
            println!("{row}");
        }
        Ok(())
    }
}
