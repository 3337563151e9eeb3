//! Suite fitness functions and the population ordering they induce.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::domain::models::{
    Chromosome, CoverageGoal, ExecutionResult, FitnessKind, TestSuiteChromosome,
};

/// Branch distance scaled into `[0, 1)`.
pub fn normalise(distance: f64) -> f64 {
    if distance.is_nan() || distance.is_infinite() {
        return 1.0;
    }
    let d = distance.max(0.0);
    d / (d + 1.0)
}

/// Covered goals over total goals; 1.0 when the target has no goals.
#[allow(clippy::cast_precision_loss)]
pub fn coverage<'a>(results: impl IntoIterator<Item = &'a ExecutionResult>, goal_count: usize) -> f64 {
    if goal_count == 0 {
        return 1.0;
    }
    let covered: BTreeSet<CoverageGoal> = results
        .into_iter()
        .flat_map(ExecutionResult::covered_goals)
        .filter(|goal| (goal.0 as usize) < goal_count)
        .collect();
    covered.len() as f64 / goal_count as f64
}

/// Fitness of a suite computed from the execution results of its test cases.
pub trait SuiteFitnessFunction: Send + Sync {
    fn compute(&self, results: &[&ExecutionResult], goal_count: usize) -> f64;

    /// Whether larger values are better.
    fn is_maximisation(&self) -> bool;

    /// Order two suites best-first: by fitness, then higher coverage, then
    /// shorter total length.
    fn compare(&self, a: &TestSuiteChromosome, b: &TestSuiteChromosome) -> Ordering {
        let by_fitness = if self.is_maximisation() {
            b.fitness().total_cmp(&a.fitness())
        } else {
            a.fitness().total_cmp(&b.fitness())
        };
        by_fitness
            .then_with(|| b.coverage().total_cmp(&a.coverage()))
            .then_with(|| a.length().cmp(&b.length()))
    }

    /// Whether `a` is at least as good as `b` by fitness alone.
    fn is_not_worse(&self, a: f64, b: f64) -> bool {
        if self.is_maximisation() {
            a >= b
        } else {
            a <= b
        }
    }
}

/// Sum over goals of the best normalised branch distance; unreached goals
/// count 1. Minimised.
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchDistanceFitness;

impl SuiteFitnessFunction for BranchDistanceFitness {
    fn compute(&self, results: &[&ExecutionResult], goal_count: usize) -> f64 {
        (0..goal_count)
            .map(|goal| {
                let goal = CoverageGoal(u32::try_from(goal).unwrap_or(u32::MAX));
                results
                    .iter()
                    .filter_map(|r| r.distance(goal))
                    .map(normalise)
                    .fold(1.0, f64::min)
            })
            .sum()
    }

    fn is_maximisation(&self) -> bool {
        false
    }
}

/// Fitness equal to coverage. Maximised.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoverageFitness;

impl SuiteFitnessFunction for CoverageFitness {
    fn compute(&self, results: &[&ExecutionResult], goal_count: usize) -> f64 {
        coverage(results.iter().copied(), goal_count)
    }

    fn is_maximisation(&self) -> bool {
        true
    }
}

pub fn fitness_from_kind(kind: FitnessKind) -> Box<dyn SuiteFitnessFunction> {
    match kind {
        FitnessKind::BranchDistance => Box::new(BranchDistanceFitness),
        FitnessKind::Coverage => Box::new(CoverageFitness),
    }
}
