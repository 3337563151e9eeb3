use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::domain::models::SearchConfig;

/// Snapshot of search progress the stopping conditions look at.
#[derive(Debug, Clone, Copy)]
pub struct SearchProgress {
    /// Generations completed so far; the initial population is generation 1.
    pub generation: usize,
    pub elapsed: Duration,
    pub best_coverage: f64,
}

/// Why the search loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxGenerations,
    MaxSearchTime,
    TargetCoverage,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MaxGenerations => "generation budget exhausted",
            Self::MaxSearchTime => "search time budget exhausted",
            Self::TargetCoverage => "target coverage reached",
        };
        f.write_str(s)
    }
}

pub trait StoppingCondition: Send + Sync + fmt::Debug {
    fn is_fulfilled(&self, progress: &SearchProgress) -> bool;

    fn reason(&self) -> StopReason;
}

#[derive(Debug, Clone, Copy)]
pub struct MaxGenerations(pub usize);

impl StoppingCondition for MaxGenerations {
    fn is_fulfilled(&self, progress: &SearchProgress) -> bool {
        progress.generation >= self.0
    }

    fn reason(&self) -> StopReason {
        StopReason::MaxGenerations
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MaxSearchTime(pub Duration);

impl StoppingCondition for MaxSearchTime {
    fn is_fulfilled(&self, progress: &SearchProgress) -> bool {
        progress.elapsed >= self.0
    }

    fn reason(&self) -> StopReason {
        StopReason::MaxSearchTime
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TargetCoverage(pub f64);

impl StoppingCondition for TargetCoverage {
    fn is_fulfilled(&self, progress: &SearchProgress) -> bool {
        progress.best_coverage >= self.0
    }

    fn reason(&self) -> StopReason {
        StopReason::TargetCoverage
    }
}

/// Conditions configured for a run, checked in order.
pub fn stopping_conditions_from_config(config: &SearchConfig) -> Vec<Box<dyn StoppingCondition>> {
    let mut conditions: Vec<Box<dyn StoppingCondition>> = vec![Box::new(TargetCoverage(config.target_coverage))];
    if let Some(generations) = config.max_generations {
        conditions.push(Box::new(MaxGenerations(generations)));
    }
    if let Some(secs) = config.max_search_time_secs {
        conditions.push(Box::new(MaxSearchTime(Duration::from_secs(secs))));
    }
    conditions
}

/// First fulfilled condition, if any.
pub fn check(conditions: &[Box<dyn StoppingCondition>], progress: &SearchProgress) -> Option<StopReason> {
    conditions
        .iter()
        .find(|c| c.is_fulfilled(progress))
        .map(|c| c.reason())
}
