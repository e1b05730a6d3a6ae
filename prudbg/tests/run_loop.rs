use std::time::Duration;

use pretty_assertions::assert_eq;
use prudbg::{
    BreakpointKind, CancellationToken, DebugEngine, EngineConfig, EngineState, FakeCore,
    RunMode, StepBudget, StopReason, WatchChange, HALT,
};

fn config() -> EngineConfig {
    EngineConfig::default().with_poll_interval(Duration::from_millis(1))
}

/// A hardware breakpoint under the program counter is stepped over before
/// it is armed again.
#[test]
fn hardware_run_steps_off_breakpoint_at_program_counter() {
    let original = 0x0105_e1e2;
    let mut core = FakeCore::new()
        .with_instruction(0x10, original)
        .with_program_counter(0x10)
        .with_jump(0x14, 0x10);
    let mut engine = DebugEngine::new(&mut core, config());
    engine
        .set_breakpoint(0, 0x10, BreakpointKind::Hardware)
        .unwrap();

    let outcome = engine
        .run(StepBudget::Unbounded, &CancellationToken::new(), |_| {})
        .unwrap();

    assert_eq!(outcome.mode, RunMode::HardwareFast);
    assert_eq!(
        outcome.reason,
        StopReason::BreakpointHit {
            slot: 0,
            address: 0x10
        }
    );
    assert_eq!(outcome.steps, 1);
    assert_eq!(outcome.program_counter, 0x10);
    assert!(!engine.breakpoints().get(0).unwrap().unwrap().is_patched());
    assert_eq!(engine.state(), EngineState::Stopped(outcome.reason));

    // One step off the breakpoint, then a free run with the breakpoint armed.
    assert_eq!(core.steps(), 1);
    assert_eq!(core.free_runs().len(), 1);
    assert_eq!(core.free_runs()[0][0x10], HALT);

    assert_eq!(core.instruction(0x10), original);
    assert!(!core.control().processor_enable());
    assert!(!core.control().single_step());
}

/// A breakpoint on a branch to itself is reported again after the step off.
#[test]
fn hardware_run_on_self_branch_reports_the_breakpoint() {
    let token = CancellationToken::new();
    let mut core = FakeCore::new()
        .with_instruction(0x10, 0x2100_1000)
        .with_program_counter(0x10)
        .with_jump(0x10, 0x10)
        .with_cancel_after_status_reads(token.clone(), 1000);
    let mut engine = DebugEngine::new(&mut core, config());
    engine
        .set_breakpoint(0, 0x10, BreakpointKind::Hardware)
        .unwrap();

    let outcome = engine.run(StepBudget::Unbounded, &token, |_| {}).unwrap();

    assert_eq!(
        outcome.reason,
        StopReason::BreakpointHit {
            slot: 0,
            address: 0x10
        }
    );
    assert_eq!(outcome.steps, 1);
    assert!(!token.is_cancelled());

    assert_eq!(core.steps(), 1);
    assert_eq!(core.free_runs().len(), 1);
    assert_eq!(core.instruction(0x10), 0x2100_1000);
}

#[test]
fn hardware_run_without_breakpoints_stops_on_halt() {
    let mut core = FakeCore::new().with_instruction(0x22, HALT);
    let mut engine = DebugEngine::new(&mut core, config());

    let outcome = engine
        .run(StepBudget::Unbounded, &CancellationToken::new(), |_| {})
        .unwrap();

    assert_eq!(outcome.mode, RunMode::HardwareFast);
    assert_eq!(outcome.reason, StopReason::HaltInstruction { address: 0x22 });
    assert_eq!(outcome.steps, 0);
}

#[test]
fn halt_instruction_stops_before_budget_is_used_up() {
    let mut core = FakeCore::new().with_instruction(3, HALT);
    let mut engine = DebugEngine::new(&mut core, config());
    engine
        .set_breakpoint(0, 0x40, BreakpointKind::Software)
        .unwrap();

    let outcome = engine
        .run(StepBudget::Steps(5), &CancellationToken::new(), |_| {})
        .unwrap();

    assert_eq!(outcome.mode, RunMode::SoftwareStepping);
    assert_eq!(outcome.reason, StopReason::HaltInstruction { address: 3 });
    assert_eq!(outcome.steps, 3);
    assert_eq!(core.steps(), 3);
}

#[test]
fn budget_limits_the_steps() {
    let mut core = FakeCore::new();
    let mut engine = DebugEngine::new(&mut core, config());

    let outcome = engine
        .run(StepBudget::from(4), &CancellationToken::new(), |_| {})
        .unwrap();

    assert_eq!(outcome.mode, RunMode::SoftwareStepping);
    assert_eq!(outcome.reason, StopReason::StepBudgetExhausted);
    assert_eq!(outcome.steps, 4);
    assert_eq!(outcome.program_counter, 4);
}

#[test]
fn software_breakpoint_is_hit() {
    let mut core = FakeCore::new().with_jump(1, 0x30);
    let mut engine = DebugEngine::new(&mut core, config());
    engine
        .set_breakpoint(7, 0x30, BreakpointKind::Software)
        .unwrap();

    let outcome = engine
        .run(StepBudget::Unbounded, &CancellationToken::new(), |_| {})
        .unwrap();

    assert_eq!(outcome.mode, RunMode::SoftwareStepping);
    assert_eq!(
        outcome.reason,
        StopReason::BreakpointHit {
            slot: 7,
            address: 0x30
        }
    );
    assert_eq!(outcome.steps, 2);
}

#[test]
fn hardware_breakpoints_are_compared_while_stepping() {
    let mut core = FakeCore::new().with_instruction(2, 0x1234_5678);
    let mut engine = DebugEngine::new(&mut core, config());
    engine
        .set_breakpoint(1, 2, BreakpointKind::Hardware)
        .unwrap();

    let outcome = engine
        .run(StepBudget::Steps(10), &CancellationToken::new(), |_| {})
        .unwrap();

    assert_eq!(
        outcome.reason,
        StopReason::BreakpointHit {
            slot: 1,
            address: 2
        }
    );
    assert!(core.free_runs().is_empty());
    assert_eq!(core.instruction(2), 0x1234_5678);
}

#[test]
fn watch_changes_are_reported() {
    let mut core = FakeCore::new().with_data_write_after_step(2, 8, &[1, 2]);
    let mut engine = DebugEngine::new(&mut core, config());
    engine.set_watch_on_change(1, 8, 2).unwrap();

    let mut changes = Vec::new();
    let outcome = engine
        .run(StepBudget::Steps(4), &CancellationToken::new(), |change| {
            changes.push(change.clone())
        })
        .unwrap();

    assert_eq!(outcome.reason, StopReason::StepBudgetExhausted);
    assert_eq!(
        changes,
        vec![WatchChange {
            slot: 1,
            address: 8,
            program_counter: 2,
            step: 2,
            bytes: vec![1, 2],
        }]
    );
    assert_eq!(engine.watchpoints().get(1).unwrap().unwrap().reference(), &[1, 2]);
}

#[test]
fn watch_value_halts_the_run() {
    let mut core = FakeCore::new()
        .with_data_write_after_step(2, 0x20, &[0x55])
        .with_data_write_after_step(3, 0x20, &[0xaa]);
    let mut engine = DebugEngine::new(&mut core, config());
    engine.set_watch_on_value(4, 0x20, &[0xaa]).unwrap();

    let outcome = engine
        .run(StepBudget::Unbounded, &CancellationToken::new(), |_| {})
        .unwrap();

    assert_eq!(outcome.mode, RunMode::SoftwareStepping);
    assert_eq!(outcome.reason, StopReason::WatchpointHalt { slot: 4 });
    assert_eq!(outcome.steps, 3);
}

#[test]
fn cancelled_fast_run_restores_memory() {
    let token = CancellationToken::new();
    // The loop at 0x00..=0x10 never reaches the breakpoint.
    let mut core = FakeCore::new()
        .with_instruction(0x800, 0xdead_beef)
        .with_jump(0x10, 0)
        .with_cancel_after_status_reads(token.clone(), 3);
    let mut engine = DebugEngine::new(&mut core, config());
    engine
        .set_breakpoint(2, 0x800, BreakpointKind::Hardware)
        .unwrap();

    let outcome = engine.run(StepBudget::Unbounded, &token, |_| {}).unwrap();

    assert_eq!(outcome.mode, RunMode::HardwareFast);
    assert_eq!(outcome.reason, StopReason::Cancelled);
    assert_eq!(core.free_runs()[0][0x800], HALT);
    assert_eq!(core.instruction(0x800), 0xdead_beef);
    assert!(!core.control().processor_enable());
}

#[test]
fn cancellation_is_checked_before_every_step() {
    let token = CancellationToken::new();
    token.cancel();
    let mut core = FakeCore::new();
    let mut engine = DebugEngine::new(&mut core, config());

    let outcome = engine.run(StepBudget::Steps(10), &token, |_| {}).unwrap();

    assert_eq!(outcome.reason, StopReason::Cancelled);
    assert_eq!(outcome.steps, 0);
    assert_eq!(core.steps(), 0);
}
