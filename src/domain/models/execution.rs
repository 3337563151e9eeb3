use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::trace::TraceStore;

/// A coverage goal of the target (a branch outcome or a callable entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CoverageGoal(pub u32);

impl fmt::Display for CoverageGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "goal#{}", self.0)
    }
}

/// Exception raised by the target while a test case ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionFault {
    /// Statement that raised.
    pub position: usize,
    pub kind: String,
    pub message: String,
}

impl fmt::Display for ExecutionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at statement {}: {}", self.kind, self.position, self.message)
    }
}

/// Everything observed while running one test case.
///
/// A faulting execution still carries the coverage gathered before the fault.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    branch_distances: BTreeMap<CoverageGoal, f64>,
    executed_statements: usize,
    fault: Option<ExecutionFault>,
    trace: TraceStore,
}

impl ExecutionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a branch distance; the smallest distance per goal is kept.
    pub fn record_distance(&mut self, goal: CoverageGoal, distance: f64) {
        let distance = distance.max(0.0);
        self.branch_distances
            .entry(goal)
            .and_modify(|d| *d = d.min(distance))
            .or_insert(distance);
    }

    pub fn mark_covered(&mut self, goal: CoverageGoal) {
        self.record_distance(goal, 0.0);
    }

    pub fn distance(&self, goal: CoverageGoal) -> Option<f64> {
        self.branch_distances.get(&goal).copied()
    }

    pub const fn branch_distances(&self) -> &BTreeMap<CoverageGoal, f64> {
        &self.branch_distances
    }

    pub fn covered_goals(&self) -> impl Iterator<Item = CoverageGoal> + '_ {
        self.branch_distances
            .iter()
            .filter(|(_, d)| **d == 0.0)
            .map(|(g, _)| *g)
    }

    pub fn set_executed_statements(&mut self, count: usize) {
        self.executed_statements = count;
    }

    pub const fn executed_statements(&self) -> usize {
        self.executed_statements
    }

    pub fn set_fault(&mut self, fault: ExecutionFault) {
        self.fault = Some(fault);
    }

    pub const fn fault(&self) -> Option<&ExecutionFault> {
        self.fault.as_ref()
    }

    pub const fn trace(&self) -> &TraceStore {
        &self.trace
    }

    pub fn trace_mut(&mut self) -> &mut TraceStore {
        &mut self.trace
    }
}
