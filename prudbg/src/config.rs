//! Tuning of the debug engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration of a [`DebugEngine`](crate::DebugEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long to sleep between two checks of a free running core.
    pub poll_interval: Duration,
    /// How often the control register is read back after a single step
    /// before the step is considered done anyway.
    pub step_settle_polls: u32,
}

impl EngineConfig {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);
    pub const DEFAULT_STEP_SETTLE_POLLS: u32 = 64;

    /// Replace the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            step_settle_polls: Self::DEFAULT_STEP_SETTLE_POLLS,
        }
    }
}
