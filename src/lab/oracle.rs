//! Quiescence oracle: region close implies no live work.
//!
//! The oracle tracks spawns, completions, and region closes as the driver
//! reports them, then checks that no region closed while owning live tasks.
//! It exists for tests and harnesses; the runtime itself enforces the same
//! property structurally through the drain driver.

use crate::types::{RegionHandle, TaskHandle, Time};
use crate::util::{DetHashMap, DetHashSet};
use core::fmt;

/// A region closed while still owning live work.
#[derive(Debug, Clone)]
pub struct QuiescenceViolation {
    /// The region that closed without quiescence.
    pub region: RegionHandle,
    /// Tasks that were still live at close time.
    pub live_tasks: Vec<TaskHandle>,
    /// When the region closed.
    pub close_time: Time,
}

impl fmt::Display for QuiescenceViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "region {} closed at {} without quiescence: {} live tasks",
            self.region,
            self.close_time,
            self.live_tasks.len()
        )
    }
}

impl std::error::Error for QuiescenceViolation {}

/// Oracle for detecting quiescence violations.
#[derive(Debug, Default)]
pub struct QuiescenceOracle {
    region_tasks: DetHashMap<RegionHandle, Vec<TaskHandle>>,
    completed: DetHashSet<TaskHandle>,
    violations: Vec<QuiescenceViolation>,
    closed_count: usize,
}

impl QuiescenceOracle {
    /// Creates a new oracle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a task spawn.
    pub fn on_spawn(&mut self, task: TaskHandle, region: RegionHandle) {
        self.region_tasks.entry(region).or_default().push(task);
    }

    /// Records a task reaching its terminal state.
    pub fn on_task_complete(&mut self, task: TaskHandle) {
        self.completed.insert(task);
    }

    /// Records a region close, checking quiescence at close time.
    pub fn on_region_close(&mut self, region: RegionHandle, time: Time) {
        self.closed_count += 1;
        let live_tasks: Vec<TaskHandle> = self
            .region_tasks
            .get(&region)
            .map(|tasks| {
                tasks
                    .iter()
                    .filter(|t| !self.completed.contains(*t))
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        if !live_tasks.is_empty() {
            self.violations.push(QuiescenceViolation {
                region,
                live_tasks,
                close_time: time,
            });
        }
    }

    /// Verifies the invariant, returning the first violation found.
    pub fn check(&self) -> std::result::Result<(), QuiescenceViolation> {
        match self.violations.first() {
            Some(violation) => Err(violation.clone()),
            None => Ok(()),
        }
    }

    /// Returns the number of closes observed.
    #[must_use]
    pub fn closed_count(&self) -> usize {
        self.closed_count
    }

    /// Resets the oracle to its initial state.
    pub fn reset(&mut self) {
        self.region_tasks.clear();
        self.completed.clear();
        self.violations.clear();
        self.closed_count = 0;
    }
}
