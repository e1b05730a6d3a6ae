use colored::Colorize;
use prudbg::{DebugEngine, StepBudget, StopReason, WatchChange};

use crate::util::common_options::CoreOptions;
use crate::util::{with_interrupt, BreakpointArg, WatchArg, WatchValueArg};
use crate::Config;

/// Run a core until it stops
///
/// e.g. prudbg run --break 0x10 --break 0x24:sw --watch 0x100:4
///      Runs until word 0x10 or 0x24 is reached, printing every change
///      of the four data bytes at 0x100
///
/// Without a step limit, software breakpoints and watchpoints the core runs
/// at full speed with HALT patched over the hardware breakpoints. Otherwise
/// it is single-stepped. Ctrl-C stops the run.
#[derive(clap::Parser)]
#[clap(verbatim_doc_comment)]
pub struct Cmd {
    #[clap(flatten)]
    shared: CoreOptions,

    /// Maximum number of instructions, zero or less for no limit.
    #[clap(long, allow_hyphen_values = true)]
    steps: Option<i64>,

    /// Breakpoint as ADDRESS[:hw|:sw], hardware by default.
    #[clap(long = "break", short = 'b')]
    breakpoints: Vec<BreakpointArg>,

    /// Print every change of LENGTH data bytes, as ADDRESS:LENGTH.
    #[clap(long = "watch", short = 'w')]
    watches: Vec<WatchArg>,

    /// Stop once data memory holds the given bytes, as ADDRESS=BYTE[,BYTE...].
    #[clap(long = "watch-value")]
    value_watches: Vec<WatchValueArg>,
}

impl Cmd {
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let mut core = self.shared.open(config)?;
        let mut engine = DebugEngine::new(&mut core, self.shared.engine_config(config));

        for (slot, breakpoint) in self.breakpoints.iter().enumerate() {
            engine.set_breakpoint(slot, breakpoint.address, breakpoint.kind)?;
        }
        for (slot, watch) in self.watches.iter().enumerate() {
            engine.set_watch_on_change(slot, watch.address, watch.length)?;
        }
        for (slot, watch) in (self.watches.len()..).zip(&self.value_watches) {
            engine.set_watch_on_value(slot, watch.address, &watch.bytes)?;
        }

        let budget = self.steps.map_or(StepBudget::Unbounded, StepBudget::from);
        println!(
            "Running PRU{} ({budget}), press ctrl-C to stop.",
            self.shared.core
        );

        let outcome = with_interrupt(|cancel| {
            engine.run(budget, cancel, |change| println!("{}", watch_line(change)))
        })??;

        let reason = outcome.reason.to_string();
        match outcome.reason {
            StopReason::Cancelled | StopReason::StepBudgetExhausted => {
                println!("{}", reason.yellow())
            }
            _ => println!("{}", reason.green().bold()),
        }

        let word = engine.instruction_at(outcome.program_counter)?;
        println!(
            "Stopped at {:#06x} after {} single steps, running with {}.",
            outcome.program_counter, outcome.steps, outcome.mode
        );
        println!(
            "[{:#06x}] {word:#010x}    {}",
            outcome.program_counter,
            prudbg::disassemble(word)
        );
        Ok(())
    }
}

fn watch_line(change: &WatchChange) -> String {
    let bytes: Vec<_> = change.bytes.iter().map(|byte| format!("{byte:02x}")).collect();
    format!(
        "@{:#06x} [{:#07x}] t={}: {}",
        change.program_counter,
        change.address,
        change.step,
        bytes.join(" ")
    )
}
