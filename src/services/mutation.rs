//! Suite and test case mutation.

use rand::Rng;

use crate::domain::models::{SearchConfig, TestCase, TestCaseChromosome, TestSuiteChromosome};
use crate::services::test_factory::TestFactory;

/// Mutation operator for whole test suites.
#[derive(Debug, Clone)]
pub struct SuiteMutation {
    test_insertion_probability: f64,
    statement_insertion_probability: f64,
    delete_probability: f64,
    change_probability: f64,
    insert_probability: f64,
    max_suite_size: usize,
    chromosome_length: usize,
}

impl SuiteMutation {
    pub const fn new(config: &SearchConfig) -> Self {
        Self {
            test_insertion_probability: config.test_insertion_probability,
            statement_insertion_probability: config.statement_insertion_probability,
            delete_probability: config.test_delete_probability,
            change_probability: config.test_change_probability,
            insert_probability: config.test_insert_probability,
            max_suite_size: config.max_suite_size,
            chromosome_length: config.chromosome_length,
        }
    }

    /// Mutate `suite` in place.
    ///
    /// Each test case is mutated with probability `1/size`; afterwards new
    /// random test cases are appended with probability
    /// `test_insertion_probability^k` for the k-th insertion, and empty test
    /// cases are dropped.
    #[allow(clippy::cast_precision_loss)]
    pub fn mutate<R: Rng + ?Sized>(
        &self,
        factory: &TestFactory,
        suite: &mut TestSuiteChromosome,
        rng: &mut R,
    ) {
        let size = suite.test_cases().len();
        if size > 0 {
            let probability = 1.0 / size as f64;
            for test_case in suite.test_cases_mut() {
                if rng.gen::<f64>() < probability {
                    self.mutate_test_case(factory, test_case, rng);
                }
            }
        }

        let mut exponent = 1;
        while suite.test_cases().len() < self.max_suite_size
            && rng.gen::<f64>() <= self.test_insertion_probability.powi(exponent)
        {
            match factory.random_test_case(rng, self.chromosome_length) {
                Ok(test_case) => suite.add_test_case(TestCaseChromosome::new(test_case)),
                Err(e) => {
                    tracing::debug!(error = %e, "could not generate test case during mutation");
                    break;
                }
            }
            exponent += 1;
        }

        suite.remove_empty_test_cases();
        suite.set_changed();
    }

    /// Mutate one test case. Returns whether anything changed; only then is
    /// the chromosome marked changed.
    pub fn mutate_test_case<R: Rng + ?Sized>(
        &self,
        factory: &TestFactory,
        chromosome: &mut TestCaseChromosome,
        rng: &mut R,
    ) -> bool {
        let mut working = chromosome.test_case().clone();
        let mut changed = false;

        if rng.gen::<f64>() < self.delete_probability {
            changed |= Self::delete_statements(&mut working, rng);
        }
        if rng.gen::<f64>() < self.change_probability {
            changed |= Self::change_statements(factory, &mut working, rng);
        }
        if rng.gen::<f64>() < self.insert_probability {
            changed |= self.insert_statements(factory, &mut working, rng);
        }

        if changed {
            *chromosome.test_case_mut() = working;
        }
        changed
    }

    #[allow(clippy::cast_precision_loss)]
    fn delete_statements<R: Rng + ?Sized>(test_case: &mut TestCase, rng: &mut R) -> bool {
        let size = test_case.size();
        if size == 0 {
            return false;
        }
        let probability = 1.0 / size as f64;
        let mut changed = false;
        // Back to front: removal only touches positions at or after the one removed.
        for position in (0..size).rev() {
            if position < test_case.size() && rng.gen::<f64>() < probability {
                test_case.remove_statement(position);
                changed = true;
            }
        }
        changed
    }

    #[allow(clippy::cast_precision_loss)]
    fn change_statements<R: Rng + ?Sized>(
        factory: &TestFactory,
        test_case: &mut TestCase,
        rng: &mut R,
    ) -> bool {
        let size = test_case.size();
        if size == 0 {
            return false;
        }
        let probability = 1.0 / size as f64;
        let mut changed = false;
        for position in 0..size {
            if rng.gen::<f64>() < probability {
                changed |= factory.change_statement(test_case, position, rng);
            }
        }
        changed
    }

    fn insert_statements<R: Rng + ?Sized>(
        &self,
        factory: &TestFactory,
        test_case: &mut TestCase,
        rng: &mut R,
    ) -> bool {
        let mut changed = false;
        let mut exponent = 1;
        while test_case.size() < self.chromosome_length
            && rng.gen::<f64>() <= self.statement_insertion_probability.powi(exponent)
        {
            let position = rng.gen_range(0..=test_case.size());
            if factory.insert_random_call(test_case, position, rng).is_ok() {
                changed = true;
            }
            exponent += 1;
        }
        changed
    }
}
