use std::path::PathBuf;

use anyhow::Context;
use prudbg::DebugEngine;

use crate::util::common_options::CoreOptions;
use crate::util::with_interrupt;
use crate::Config;

const PER_LINE: usize = 16;

/// Record the program counter of a free running core
///
/// Every program counter which differs from the one before is recorded,
/// until the maximum number of entries is reached or ctrl-C is pressed.
/// The core is halted afterwards.
#[derive(clap::Parser)]
#[clap(verbatim_doc_comment)]
pub struct Cmd {
    #[clap(flatten)]
    shared: CoreOptions,

    /// Maximum number of recorded program counters.
    #[clap(long, default_value = "65536")]
    max: usize,

    /// Stop once the core reaches a HALT instruction.
    #[clap(long)]
    stop_on_halt: bool,

    /// Write the trace to this file, one address per line.
    #[clap(long, short)]
    output: Option<PathBuf>,
}

impl Cmd {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let mut core = self.shared.open(config)?;
        let mut engine = DebugEngine::new(&mut core, self.shared.engine_config(config));

        println!(
            "Running trace for {} elements, press ctrl-C to stop{}.",
            self.max,
            if self.stop_on_halt {
                " or it will stop on halt"
            } else {
                ""
            }
        );
        let trace = with_interrupt(|cancel| engine.trace(self.max, self.stop_on_halt, cancel))??;

        match self.output {
            Some(path) => {
                std::fs::write(&path, file_contents(&trace))
                    .with_context(|| format!("Failed to write the trace to {path:?}"))?;
                println!("Trace written to {}", path.display());
            }
            None => {
                println!("Trace [{}]:", trace.len());
                for line in lines(&trace) {
                    println!("{line}");
                }
            }
        }
        Ok(())
    }
}

fn file_contents(trace: &[u16]) -> String {
    trace
        .iter()
        .map(|program_counter| format!("{program_counter:#06x}\n"))
        .collect()
}

fn lines(trace: &[u16]) -> Vec<String> {
    trace
        .chunks(PER_LINE)
        .map(|chunk| {
            chunk
                .iter()
                .map(|program_counter| format!("{program_counter:#06x}"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn file_has_one_address_per_line() {
        assert_eq!(file_contents(&[0, 0x1f, 0x200]), "0x0000\n0x001f\n0x0200\n");
    }

    #[test]
    fn terminal_shows_sixteen_per_line() {
        let trace: Vec<u16> = (0..20).collect();

        let lines = lines(&trace);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "0x0010 0x0011 0x0012 0x0013");
    }
}
