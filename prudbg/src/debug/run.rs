//! States and results of the run loop.

use std::fmt;

/// How many single steps a run may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepBudget {
    Unbounded,
    Steps(u64),
}

impl StepBudget {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }

    /// Take one step from the budget. Returns `false` once it is used up.
    pub(crate) fn take(&mut self) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Steps(0) => false,
            Self::Steps(remaining) => {
                *remaining -= 1;
                true
            }
        }
    }
}

/// A count of zero or less means unbounded.
impl From<i64> for StepBudget {
    fn from(count: i64) -> Self {
        match u64::try_from(count) {
            Ok(count) if count > 0 => Self::Steps(count),
            _ => Self::Unbounded,
        }
    }
}

impl fmt::Display for StepBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => f.write_str("unbounded"),
            Self::Steps(steps) => write!(f, "{steps} steps"),
        }
    }
}

/// The way a run executes the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, docsplay::Display)]
pub enum RunMode {
    /// hardware breakpoints
    HardwareFast,
    /// software single stepping
    SoftwareStepping,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, docsplay::Display)]
pub enum StopReason {
    /// Breakpoint {slot} hit at {address:#06x}.
    BreakpointHit { slot: usize, address: u16 },
    /// Watchpoint {slot} reached its value.
    WatchpointHalt { slot: usize },
    /// HALT instruction hit at {address:#06x}.
    HaltInstruction { address: u16 },
    /// Step budget exhausted.
    StepBudgetExhausted,
    /// Cancelled.
    Cancelled,
}

/// State of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Outside of a run: before the first one, after `halt`, after
    /// `single_step`, or after a run failed with an error.
    Halted,
    SteppingSoftware { remaining: StepBudget },
    RunningHardwareFast,
    /// The last run ended for this reason.
    Stopped(StopReason),
}

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub reason: StopReason,
    pub mode: RunMode,
    /// Number of single steps the engine issued.
    pub steps: u64,
    /// Program counter after the core was stopped.
    pub program_counter: u16,
}

/// A change observed by a print-on-change watchpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchChange {
    pub slot: usize,
    /// Byte address in data memory.
    pub address: u32,
    /// Program counter after the step which changed the memory.
    pub program_counter: u16,
    /// Number of steps taken when the change was seen.
    pub step: u64,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod test {
    use super::*;
    use test_case::test_case;

    #[test_case(-1, StepBudget::Unbounded)]
    #[test_case(0, StepBudget::Unbounded)]
    #[test_case(5, StepBudget::Steps(5))]
    fn budget_from_count(count: i64, budget: StepBudget) {
        assert_eq!(StepBudget::from(count), budget);
    }

    #[test]
    fn budget_runs_out() {
        let mut budget = StepBudget::Steps(2);
        assert!(budget.take());
        assert!(budget.take());
        assert!(!budget.take());
        assert_eq!(budget, StepBudget::Steps(0));
    }

    #[test]
    fn stop_reasons_read_well() {
        assert_eq!(
            StopReason::BreakpointHit {
                slot: 2,
                address: 0x10
            }
            .to_string(),
            "Breakpoint 2 hit at 0x0010."
        );
        assert_eq!(
            StopReason::HaltInstruction { address: 0x3 }.to_string(),
            "HALT instruction hit at 0x0003."
        );
    }
}
