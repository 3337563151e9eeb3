use rand::Rng;

use crate::domain::models::TestSuiteChromosome;

/// Single point relative crossover on test suites.
///
/// One relative split point is drawn and applied to both parents, so suites of
/// different sizes exchange proportional tails. Test cases move with their
/// evaluation state; only the suites are marked changed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinglePointRelativeCrossover;

impl SinglePointRelativeCrossover {
    /// Cross `first` and `second` in place. Suites with fewer than two test
    /// cases are left alone.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn cross_over<R: Rng + ?Sized>(
        &self,
        first: &mut TestSuiteChromosome,
        second: &mut TestSuiteChromosome,
        rng: &mut R,
    ) {
        let (first_size, second_size) = (first.test_cases().len(), second.test_cases().len());
        if first_size < 2 || second_size < 2 {
            return;
        }

        let split: f64 = rng.gen();
        let first_point = ((split * first_size as f64).floor() as usize).clamp(1, first_size - 1);
        let second_point = ((split * second_size as f64).floor() as usize).clamp(1, second_size - 1);

        let first_tail = first.test_cases_mut().split_off(first_point);
        let second_tail = second.test_cases_mut().split_off(second_point);
        first.test_cases_mut().extend(second_tail);
        second.test_cases_mut().extend(first_tail);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Chromosome, PrimitiveValue, Statement, TestCase};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn suite(count: usize) -> TestSuiteChromosome {
        TestSuiteChromosome::from_test_cases((0..count).map(|i| {
            let mut tc = TestCase::new();
            tc.add_statement(Statement::primitive(PrimitiveValue::Int(i64::try_from(i).unwrap())));
            tc
        }))
    }

    fn ids(suite: &TestSuiteChromosome) -> HashSet<Uuid> {
        suite.test_cases().iter().map(|tc| tc.test_case().id()).collect()
    }

    #[test]
    fn test_crossover_exchanges_tails_and_preserves_test_cases() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut first = suite(4);
        let mut second = suite(6);
        let all: HashSet<Uuid> = ids(&first).union(&ids(&second)).copied().collect();
        first.set_evaluation(0.0, 1.0);
        second.set_evaluation(0.0, 1.0);

        SinglePointRelativeCrossover.cross_over(&mut first, &mut second, &mut rng);

        assert_eq!(first.size() + second.size(), 10);
        let after: HashSet<Uuid> = ids(&first).union(&ids(&second)).copied().collect();
        assert_eq!(all, after);
        assert!(first.is_changed());
        assert!(second.is_changed());
    }

    #[test]
    fn test_small_suites_are_untouched() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut first = suite(1);
        let mut second = suite(5);
        let before = ids(&first);

        SinglePointRelativeCrossover.cross_over(&mut first, &mut second, &mut rng);

        assert_eq!(ids(&first), before);
        assert_eq!(second.size(), 5);
    }
}
