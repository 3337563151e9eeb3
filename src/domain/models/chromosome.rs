//! Candidate solutions of the search.
//!
//! Fitness and coverage are only meaningful after an evaluation pass. Any
//! mutable access marks a chromosome changed, and only the engine's
//! evaluation clears the flag again.

use std::fmt;

use super::execution::ExecutionResult;
use super::test_case::TestCase;

/// Common view over test case and test suite chromosomes.
pub trait Chromosome: fmt::Debug + Send + Sync {
    /// Number of direct elements (statements or test cases).
    fn size(&self) -> usize;

    /// Total number of statements.
    fn length(&self) -> usize;

    fn fitness(&self) -> f64;

    /// Fraction of coverage goals reached, in `[0, 1]`.
    fn coverage(&self) -> f64;

    /// Whether the chromosome changed since it was last evaluated.
    fn is_changed(&self) -> bool;

    /// Downcast to the aggregate kind the statistics expect.
    fn as_test_suite(&self) -> Option<&TestSuiteChromosome> {
        None
    }
}

/// A single test case under evolution.
#[derive(Debug, Clone)]
pub struct TestCaseChromosome {
    test_case: TestCase,
    changed: bool,
    fitness: f64,
    coverage: f64,
    last_result: Option<ExecutionResult>,
}

impl TestCaseChromosome {
    pub const fn new(test_case: TestCase) -> Self {
        Self {
            test_case,
            changed: true,
            fitness: f64::INFINITY,
            coverage: 0.0,
            last_result: None,
        }
    }

    pub const fn test_case(&self) -> &TestCase {
        &self.test_case
    }

    /// Mutable access; marks the chromosome changed.
    pub fn test_case_mut(&mut self) -> &mut TestCase {
        self.changed = true;
        &mut self.test_case
    }

    /// Result of the last execution, `None` when it never ran or the
    /// executor failed.
    pub const fn last_result(&self) -> Option<&ExecutionResult> {
        self.last_result.as_ref()
    }

    pub fn set_evaluation(&mut self, result: Option<ExecutionResult>, fitness: f64, coverage: f64) {
        self.last_result = result;
        self.fitness = fitness;
        self.coverage = coverage;
        self.changed = false;
    }

    /// Independent copy with a fresh test case identity. The evaluation
    /// state carries over since the statements are identical.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        Self {
            test_case: self.test_case.deep_clone(),
            changed: self.changed,
            fitness: self.fitness,
            coverage: self.coverage,
            last_result: self.last_result.clone(),
        }
    }
}

impl Chromosome for TestCaseChromosome {
    fn size(&self) -> usize {
        self.test_case.size()
    }

    fn length(&self) -> usize {
        self.test_case.size()
    }

    fn fitness(&self) -> f64 {
        self.fitness
    }

    fn coverage(&self) -> f64 {
        self.coverage
    }

    fn is_changed(&self) -> bool {
        self.changed
    }
}

/// A test suite: the unit of selection in whole-suite search.
#[derive(Debug, Clone)]
pub struct TestSuiteChromosome {
    test_cases: Vec<TestCaseChromosome>,
    fitness: f64,
    coverage: f64,
    changed: bool,
}

impl Default for TestSuiteChromosome {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSuiteChromosome {
    pub const fn new() -> Self {
        Self {
            test_cases: Vec::new(),
            fitness: f64::INFINITY,
            coverage: 0.0,
            changed: true,
        }
    }

    pub fn from_test_cases(test_cases: impl IntoIterator<Item = TestCase>) -> Self {
        let mut suite = Self::new();
        for tc in test_cases {
            suite.add_test_case(TestCaseChromosome::new(tc));
        }
        suite
    }

    pub fn add_test_case(&mut self, test_case: TestCaseChromosome) {
        self.test_cases.push(test_case);
        self.changed = true;
    }

    pub fn test_cases(&self) -> &[TestCaseChromosome] {
        &self.test_cases
    }

    /// Mutable access; marks the suite changed.
    pub fn test_cases_mut(&mut self) -> &mut Vec<TestCaseChromosome> {
        self.changed = true;
        &mut self.test_cases
    }

    /// Drop test cases without statements. Returns how many were dropped.
    pub fn remove_empty_test_cases(&mut self) -> usize {
        let before = self.test_cases.len();
        self.test_cases.retain(|tc| !tc.test_case().is_empty());
        let removed = before - self.test_cases.len();
        if removed > 0 {
            self.changed = true;
        }
        removed
    }

    pub fn total_length_of_test_cases(&self) -> usize {
        self.test_cases.iter().map(Chromosome::length).sum()
    }

    /// Store the result of an evaluation pass and clear the changed flag.
    pub fn set_evaluation(&mut self, fitness: f64, coverage: f64) {
        self.fitness = fitness;
        self.coverage = coverage;
        self.changed = false;
    }

    pub fn set_changed(&mut self) {
        self.changed = true;
    }

    /// Whether any test case still awaits execution.
    pub fn has_changed_test_cases(&self) -> bool {
        self.test_cases.iter().any(Chromosome::is_changed)
    }

    /// Independent copy; every test case gets a fresh identity.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        Self {
            test_cases: self
                .test_cases
                .iter()
                .map(TestCaseChromosome::deep_clone)
                .collect(),
            fitness: self.fitness,
            coverage: self.coverage,
            changed: self.changed,
        }
    }
}

impl Chromosome for TestSuiteChromosome {
    fn size(&self) -> usize {
        self.test_cases.len()
    }

    fn length(&self) -> usize {
        self.total_length_of_test_cases()
    }

    fn fitness(&self) -> f64 {
        self.fitness
    }

    fn coverage(&self) -> f64 {
        self.coverage
    }

    fn is_changed(&self) -> bool {
        self.changed
    }

    fn as_test_suite(&self) -> Option<&TestSuiteChromosome> {
        Some(self)
    }
}
