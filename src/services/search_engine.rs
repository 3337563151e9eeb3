//! Whole-suite genetic search.
//!
//! One control task drives the loop: build and evaluate the initial
//! population, then select, reproduce, evaluate and replace until a stopping
//! condition holds. Test case executions fan out to the executor with bounded
//! concurrency; their results are applied back by the control task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::domain::errors::{ExecutionError, SearchError};
use crate::domain::models::{
    Chromosome, ExecutionResult, InitialPopulationKind, RuntimeVariable, SearchConfig,
    TestCase, TestCaseChromosome, TestSuiteChromosome,
};
use crate::domain::ports::{StatisticsSink, TestCaseExecutor};
use crate::services::crossover::SinglePointRelativeCrossover;
use crate::services::fitness::{self, fitness_from_kind, SuiteFitnessFunction};
use crate::services::mutation::SuiteMutation;
use crate::services::selection::{selection_from_config, SelectionFunction};
use crate::services::stopping_condition::{
    self, stopping_conditions_from_config, SearchProgress, StopReason, StoppingCondition,
};
use crate::services::test_factory::TestFactory;

/// Result of a completed search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Best suite of the final generation
    pub best: TestSuiteChromosome,
    /// Generations evaluated, the initial population included
    pub generations: usize,
    /// Test case executions attempted
    pub evaluations: usize,
    /// Faulting plus failed executions
    pub total_exceptions: usize,
    pub stop_reason: StopReason,
    pub elapsed: Duration,
}

/// Summary of one generation, as logged and printed.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GenerationSummary {
    /// 1-based generation number
    pub generation: usize,
    pub best_fitness: f64,
    /// Coverage of the best suite, in `[0, 1]`
    pub best_coverage: f64,
    /// Test cases in the best suite
    pub best_size: usize,
    /// Statements in the best suite
    pub best_length: usize,
}

/// Counts of one evaluation pass.
#[derive(Debug, Clone, Copy, Default)]
struct EvaluationReport {
    successes: usize,
    failures: usize,
    faults: usize,
}

impl EvaluationReport {
    const fn attempted(&self) -> usize {
        self.successes + self.failures
    }
}

pub struct SearchEngine {
    executor: Arc<dyn TestCaseExecutor>,
    config: SearchConfig,
    factory: TestFactory,
    mutation: SuiteMutation,
    crossover: SinglePointRelativeCrossover,
    selection: Box<dyn SelectionFunction>,
    fitness: Box<dyn SuiteFitnessFunction>,
    stopping_conditions: Vec<Box<dyn StoppingCondition>>,
    rng: ChaCha8Rng,
    seed: u64,
    seed_population: Vec<TestSuiteChromosome>,
    history: Vec<GenerationSummary>,
    evaluations: usize,
    total_exceptions: usize,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("config", &self.config)
            .field("seed", &self.seed)
            .field("evaluations", &self.evaluations)
            .finish_non_exhaustive()
    }
}

impl SearchEngine {
    /// Create an engine for `executor`. The seed is taken from the
    /// configuration or drawn once here.
    pub fn new(executor: Arc<dyn TestCaseExecutor>, config: SearchConfig) -> Result<Self, SearchError> {
        if config.population_size == 0 {
            return Err(SearchError::Configuration("population_size must be at least 1".to_string()));
        }
        if config.elite_count == 0 || config.elite_count > config.population_size {
            return Err(SearchError::Configuration(format!(
                "elite_count {} must be between 1 and population_size {}",
                config.elite_count, config.population_size
            )));
        }
        if config.max_generations.is_none() && config.max_search_time_secs.is_none() {
            return Err(SearchError::Configuration(
                "either max_generations or max_search_time_secs must be set".to_string(),
            ));
        }
        if config.min_initial_tests > config.max_initial_tests {
            return Err(SearchError::Configuration(
                "min_initial_tests exceeds max_initial_tests".to_string(),
            ));
        }

        let seed = config.seed.unwrap_or_else(rand::random);
        let factory = TestFactory::new(executor.schema().clone(), &config);

        Ok(Self {
            factory,
            mutation: SuiteMutation::new(&config),
            crossover: SinglePointRelativeCrossover,
            selection: selection_from_config(&config),
            fitness: fitness_from_kind(config.fitness),
            stopping_conditions: stopping_conditions_from_config(&config),
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            seed_population: Vec::new(),
            history: Vec::new(),
            evaluations: 0,
            total_exceptions: 0,
            executor,
            config,
        })
    }

    /// Suites placed into the initial population before random top-up when
    /// the `seeded` policy is configured.
    #[must_use]
    pub fn with_seed_population(mut self, suites: Vec<TestSuiteChromosome>) -> Self {
        self.seed_population = suites;
        self
    }

    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Per-generation summaries of the last run.
    pub fn history(&self) -> &[GenerationSummary] {
        &self.history
    }

    /// Run the search to completion.
    ///
    /// # Errors
    ///
    /// Fails when no execution of the initial population succeeds, or when
    /// `max_failed_generations` consecutive generations produce no successful
    /// execution.
    pub async fn run(&mut self, statistics: &mut dyn StatisticsSink) -> Result<SearchOutcome, SearchError> {
        let start = Instant::now();
        self.history.clear();
        self.evaluations = 0;
        self.total_exceptions = 0;

        statistics.set_output_variable_for_runtime_variable(
            RuntimeVariable::TargetClass,
            self.factory.schema().module.clone().into(),
        );
        statistics.set_output_variable_for_runtime_variable(
            RuntimeVariable::Criterion,
            self.config.fitness.criterion().into(),
        );

        tracing::info!(
            population_size = self.config.population_size,
            seed = self.seed,
            target = %self.factory.schema().module,
            "Starting search"
        );

        let mut population = self.initial_population()?;
        let report = self.evaluate(&mut population).await;
        if report.successes == 0 {
            tracing::error!(
                failures = report.failures,
                "No individual of the initial population could be evaluated"
            );
            return Err(SearchError::NoSuccessfulEvaluation);
        }
        self.sort(&mut population);

        let mut generation = 1;
        self.report_generation(generation, &population, statistics);

        let mut failed_generations = 0;
        let stop_reason = loop {
            let progress = SearchProgress {
                generation,
                elapsed: start.elapsed(),
                best_coverage: population[0].coverage(),
            };
            if let Some(reason) = stopping_condition::check(&self.stopping_conditions, &progress) {
                break reason;
            }

            let (next, report) = self.next_generation(&population).await;
            if report.successes > 0 {
                failed_generations = 0;
            } else if report.attempted() > 0 {
                failed_generations += 1;
                tracing::warn!(
                    generation = generation + 1,
                    failed_generations,
                    "No successful execution in generation"
                );
                if failed_generations >= self.config.max_failed_generations {
                    return Err(SearchError::RepeatedEvaluationFailure {
                        generations: failed_generations,
                    });
                }
            }

            population = next;
            self.sort(&mut population);
            generation += 1;
            self.report_generation(generation, &population, statistics);
        };

        statistics.set_output_variable_for_runtime_variable(RuntimeVariable::Generations, generation.into());
        statistics.set_output_variable_for_runtime_variable(RuntimeVariable::Evaluations, self.evaluations.into());

        let elapsed = start.elapsed();
        let best = population
            .into_iter()
            .next()
            .ok_or(SearchError::NoSuccessfulEvaluation)?;

        tracing::info!(
            generations = generation,
            evaluations = self.evaluations,
            coverage = best.coverage(),
            fitness = best.fitness(),
            reason = %stop_reason,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "Search finished"
        );

        Ok(SearchOutcome {
            best,
            generations: generation,
            evaluations: self.evaluations,
            total_exceptions: self.total_exceptions,
            stop_reason,
            elapsed,
        })
    }

    fn initial_population(&mut self) -> Result<Vec<TestSuiteChromosome>, SearchError> {
        let size = self.config.population_size;
        let mut population = Vec::with_capacity(size);

        let seeds = std::mem::take(&mut self.seed_population);
        match self.config.initial_population {
            InitialPopulationKind::Seeded => {
                tracing::debug!(seeds = seeds.len(), "Seeding initial population");
                population.extend(seeds.into_iter().take(size));
            }
            InitialPopulationKind::Random if !seeds.is_empty() => {
                tracing::warn!(
                    seeds = seeds.len(),
                    "Seed suites ignored by the random initial population policy"
                );
            }
            InitialPopulationKind::Random => {}
        }

        while population.len() < size {
            population.push(self.random_suite()?);
        }
        Ok(population)
    }

    fn random_suite(&mut self) -> Result<TestSuiteChromosome, SearchError> {
        let count = self
            .rng
            .gen_range(self.config.min_initial_tests..=self.config.max_initial_tests);
        let mut suite = TestSuiteChromosome::new();
        for _ in 0..count {
            let test_case = self
                .factory
                .random_test_case(&mut self.rng, self.config.chromosome_length)?;
            if !test_case.is_empty() {
                suite.add_test_case(TestCaseChromosome::new(test_case));
            }
        }
        Ok(suite)
    }

    /// Breed offspring pairs, evaluate them, and keep each pair only if it is
    /// not worse than its parents. Elites are carried over unchanged.
    async fn next_generation(
        &mut self,
        population: &[TestSuiteChromosome],
    ) -> (Vec<TestSuiteChromosome>, EvaluationReport) {
        let size = population.len();
        let elites = self.config.elite_count.min(size);
        let pairs = (size - elites).div_ceil(2);

        let mut parents = Vec::with_capacity(pairs);
        let mut offspring = Vec::with_capacity(pairs * 2);
        for _ in 0..pairs {
            let first = self.selection.select_index(size, &mut self.rng);
            let second = self.selection.select_index(size, &mut self.rng);
            let mut first_child = population[first].deep_clone();
            let mut second_child = population[second].deep_clone();

            if self.rng.gen::<f64>() < self.config.crossover_rate {
                self.crossover
                    .cross_over(&mut first_child, &mut second_child, &mut self.rng);
            }
            self.mutation.mutate(&self.factory, &mut first_child, &mut self.rng);
            self.mutation.mutate(&self.factory, &mut second_child, &mut self.rng);

            parents.push((first, second));
            offspring.push(first_child);
            offspring.push(second_child);
        }

        let report = self.evaluate(&mut offspring).await;

        let mut next: Vec<TestSuiteChromosome> = population.iter().take(elites).cloned().collect();
        let mut children = offspring.into_iter();
        for (first, second) in parents {
            let (Some(first_child), Some(second_child)) = (children.next(), children.next()) else {
                break;
            };
            let best_child = self.best_fitness(&first_child, &second_child);
            let best_parent = self.best_fitness(&population[first], &population[second]);
            if self.fitness.is_not_worse(best_child, best_parent) {
                next.push(first_child);
                next.push(second_child);
            } else {
                next.push(population[first].clone());
                next.push(population[second].clone());
            }
        }
        next.truncate(size);

        (next, report)
    }

    fn best_fitness(&self, a: &TestSuiteChromosome, b: &TestSuiteChromosome) -> f64 {
        if self.fitness.is_not_worse(a.fitness(), b.fitness()) {
            a.fitness()
        } else {
            b.fitness()
        }
    }

    /// Execute every changed test case, then recompute fitness and coverage
    /// of every changed suite.
    async fn evaluate(&mut self, population: &mut [TestSuiteChromosome]) -> EvaluationReport {
        let pending: Vec<(usize, usize, TestCase)> = population
            .iter()
            .enumerate()
            .flat_map(|(s, suite)| {
                suite
                    .test_cases()
                    .iter()
                    .enumerate()
                    .filter(|(_, tc)| tc.is_changed())
                    .map(move |(t, tc)| (s, t, tc.test_case().clone()))
            })
            .collect();

        let timeout = Duration::from_millis(self.config.candidate_timeout_ms);
        let workers = self.config.evaluation_workers.max(1);
        let executor = Arc::clone(&self.executor);

        let outcomes: Vec<(usize, usize, Result<ExecutionResult, ExecutionError>)> =
            stream::iter(pending)
                .map(|(s, t, test_case)| {
                    let executor = Arc::clone(&executor);
                    async move {
                        let result = match tokio::time::timeout(timeout, executor.execute(&test_case)).await {
                            Ok(result) => result,
                            Err(_) => Err(ExecutionError::Timeout(timeout)),
                        };
                        (s, t, result)
                    }
                })
                .buffer_unordered(workers)
                .collect()
                .await;

        let goal_count = self.executor.goal_count();
        let mut report = EvaluationReport::default();
        for (s, t, outcome) in outcomes {
            let Some(chromosome) = population
                .get_mut(s)
                .and_then(|suite| suite.test_cases_mut().get_mut(t))
            else {
                continue;
            };
            match outcome {
                Ok(result) => {
                    report.successes += 1;
                    if let Some(fault) = result.fault() {
                        report.faults += 1;
                        tracing::debug!(%fault, "Test case raised a fault");
                    }
                    let fitness = self.fitness.compute(&[&result], goal_count);
                    let coverage = fitness::coverage([&result], goal_count);
                    chromosome.set_evaluation(Some(result), fitness, coverage);
                }
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(error = %e, "Test case evaluation failed");
                    let fitness = self.fitness.compute(&[], goal_count);
                    chromosome.set_evaluation(None, fitness, 0.0);
                }
            }
        }

        for suite in population.iter_mut().filter(|s| s.is_changed()) {
            let (fitness, coverage) = {
                let results: Vec<&ExecutionResult> = suite
                    .test_cases()
                    .iter()
                    .filter_map(|tc| tc.last_result())
                    .collect();
                (
                    self.fitness.compute(&results, goal_count),
                    fitness::coverage(results.iter().copied(), goal_count),
                )
            };
            suite.set_evaluation(fitness, coverage);
        }

        self.evaluations += report.attempted();
        self.total_exceptions += report.faults + report.failures;
        report
    }

    fn sort(&self, population: &mut [TestSuiteChromosome]) {
        population.sort_by(|a, b| self.fitness.compare(a, b));
    }

    fn report_generation(
        &mut self,
        generation: usize,
        population: &[TestSuiteChromosome],
        statistics: &mut dyn StatisticsSink,
    ) {
        let best = &population[0];
        let summary = GenerationSummary {
            generation,
            best_fitness: best.fitness(),
            best_coverage: best.coverage(),
            best_size: best.size(),
            best_length: best.length(),
        };
        tracing::info!(
            generation,
            fitness = summary.best_fitness,
            coverage = summary.best_coverage,
            size = summary.best_size,
            length = summary.best_length,
            "Generation evaluated"
        );
        self.history.push(summary);

        statistics.set_output_variable_for_runtime_variable(
            RuntimeVariable::TotalExceptionsTimeline,
            self.total_exceptions.into(),
        );
        statistics.current_individual(best);
    }
}
