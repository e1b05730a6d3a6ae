use prudbg::{DebugEngine, Error};

use crate::util::common_options::CoreOptions;
use crate::util::parse_u32;
use crate::Config;

const ROWS: usize = 8;

#[derive(clap::Parser)]
pub struct Cmd {
    #[clap(flatten)]
    shared: CoreOptions,

    /// Show the constants table instead of the registers.
    #[clap(long)]
    constants: bool,
}

impl Cmd {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let mut core = self.shared.open(config)?;
        let mut engine = DebugEngine::new(&mut core, self.shared.engine_config(config));

        let (prefix, values) = if self.constants {
            ('C', engine.constants())
        } else {
            ('R', engine.registers())
        };

        match values {
            Ok(values) => {
                for row in table(prefix, &values) {
                    println!("{row}");
                }
            }
            Err(Error::CoreRunning) => {
                println!("{prefix}xx values are not available since PRU is RUNNING.")
            }
            Err(error) => return Err(error.into()),
        }
        Ok(())
    }
}

#[derive(clap::Parser)]
pub struct SetCmd {
    #[clap(flatten)]
    shared: CoreOptions,

    /// Register number, 0 to 31.
    register: usize,

    #[clap(value_parser = parse_u32)]
    value: u32,
}

impl SetCmd {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let mut core = self.shared.open(config)?;
        let mut engine = DebugEngine::new(&mut core, self.shared.engine_config(config));

        engine.set_register(self.register, self.value)?;

        println!(
            "R{:02}: {:#010x}",
            self.register,
            engine.register(self.register)?
        );
        Ok(())
    }
}

/// Four columns, the registers run down the columns.
fn table(prefix: char, values: &[u32]) -> Vec<String> {
    (0..ROWS)
        .map(|row| {
            (row..values.len())
                .step_by(ROWS)
                .map(|index| format!("{prefix}{index:02}: {:#010x}", values[index]))
                .collect::<Vec<_>>()
                .join("   ")
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn registers_run_down_the_columns() {
        let values: Vec<u32> = (0..32).collect();

        let rows = table('R', &values);

        assert_eq!(rows.len(), 8);
        assert_eq!(
            rows[1],
            "R01: 0x00000001   R09: 0x00000009   R17: 0x00000011   R25: 0x00000019"
        );
    }
}
