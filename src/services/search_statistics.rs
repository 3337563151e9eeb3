//! Collects statistics about a search run and writes them to a backend.
//!
//! The collector is an explicit context object owned by the caller. The
//! engine reports to it through [`StatisticsSink`] from its control task,
//! and the caller writes the result once the run is over.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::domain::errors::StatisticsError;
use crate::domain::models::{
    Chromosome, OutputValue, OutputVariable, RuntimeVariable, StatisticsConfig,
    TestSuiteChromosome,
};
use crate::domain::ports::{StatisticsBackend, StatisticsSink};
use crate::services::output_variable_factory::{
    chromosome_factories, sequence_factories, ChromosomeOutputVariableFactory,
    SequenceOutputVariableFactory,
};

pub struct SearchStatistics {
    backend: Option<Box<dyn StatisticsBackend>>,
    output_variables: BTreeMap<String, OutputVariable>,
    variable_factories: BTreeMap<RuntimeVariable, ChromosomeOutputVariableFactory>,
    sequence_factories: BTreeMap<RuntimeVariable, SequenceOutputVariableFactory>,
    requested: Vec<String>,
    skip_missing: bool,
    start: Instant,
    best_individual: Option<TestSuiteChromosome>,
}

impl std::fmt::Debug for SearchStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchStatistics")
            .field("has_backend", &self.backend.is_some())
            .field("output_variables", &self.output_variables)
            .field("requested", &self.requested)
            .field("skip_missing", &self.skip_missing)
            .finish_non_exhaustive()
    }
}

impl SearchStatistics {
    /// Create a collector. `seed` is recorded as `Random_Seed`.
    pub fn new(
        backend: Option<Box<dyn StatisticsBackend>>,
        config: &StatisticsConfig,
        seed: u64,
    ) -> Self {
        let requested = config.requested_variables().unwrap_or_else(|| {
            RuntimeVariable::DEFAULT_OUTPUT
                .iter()
                .map(|v| v.name().to_string())
                .collect()
        });

        let mut statistics = Self {
            backend,
            output_variables: BTreeMap::new(),
            variable_factories: chromosome_factories(),
            sequence_factories: sequence_factories(),
            requested,
            skip_missing: config.skip_missing,
            start: Instant::now(),
            best_individual: None,
        };

        let seed = i64::try_from(seed).map_or_else(|_| OutputValue::Text(seed.to_string()), OutputValue::Int);
        statistics.set_output_variable_for_runtime_variable(RuntimeVariable::RandomSeed, seed);
        statistics
    }

    /// Set a variable directly. A name that belongs to a registered sequence
    /// appends to that sequence instead of creating a flat entry.
    pub fn set_output_variable(&mut self, variable: OutputVariable) {
        let sequence = variable
            .name()
            .parse::<RuntimeVariable>()
            .ok()
            .and_then(|v| self.sequence_factories.get_mut(&v));

        match sequence {
            Some(factory) => factory.set_value(variable.value().clone()),
            None => {
                self.output_variables.insert(variable.name().to_string(), variable);
            }
        }
    }

    /// Directly set variables, excluding sequences.
    pub const fn output_variables(&self) -> &BTreeMap<String, OutputVariable> {
        &self.output_variables
    }

    /// Values accumulated so far for a sequence variable.
    pub fn sequence_values(&self, variable: RuntimeVariable) -> Option<&[OutputValue]> {
        self.sequence_factories.get(&variable).map(SequenceOutputVariableFactory::values)
    }

    pub const fn best_individual(&self) -> Option<&TestSuiteChromosome> {
        self.best_individual.as_ref()
    }

    pub const fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Resolve the requested names: direct values first, then chromosome
    /// factories, then sequences expanded into one variable per entry. A
    /// single entry can be requested as `Name_N`.
    fn resolve_output_variables(
        &self,
        individual: &TestSuiteChromosome,
    ) -> BTreeMap<String, OutputVariable> {
        let mut variables = BTreeMap::new();

        for name in &self.requested {
            if let Some(variable) = self.output_variables.get(name) {
                variables.insert(name.clone(), variable.clone());
                continue;
            }

            let runtime = name.parse::<RuntimeVariable>().ok();
            if let Some(factory) = runtime.and_then(|v| self.variable_factories.get(&v)) {
                variables.insert(name.clone(), factory.get_variable(individual));
            } else if let Some(factory) = runtime.and_then(|v| self.sequence_factories.get(&v)) {
                for variable in factory.get_output_variables() {
                    variables.insert(variable.name().to_string(), variable);
                }
            } else if let Some(value) = self.sequence_entry(name) {
                variables.insert(name.clone(), OutputVariable::new(name.clone(), value));
            } else if self.skip_missing {
                variables.insert(name.clone(), OutputVariable::new(name.clone(), OutputValue::empty()));
            } else {
                tracing::error!(variable = %name, "No obtained value for output variable");
                return BTreeMap::new();
            }
        }

        variables
    }

    /// The `index`-th value of a sequence requested as `Name_index`.
    fn sequence_entry(&self, name: &str) -> Option<OutputValue> {
        let (variable, index) = RuntimeVariable::parse_sequence_entry(name)?;
        self.sequence_factories
            .get(&variable)?
            .values()
            .get(index - 1)
            .cloned()
    }

    /// Write the collected statistics to the backend.
    ///
    /// Fails without a backend, or when no valid individual was ever
    /// reported; in the latter case the backend is not called.
    pub fn write_statistics(&mut self) -> Result<(), StatisticsError> {
        tracing::info!("Writing statistics");
        if self.backend.is_none() {
            return Err(StatisticsError::NoBackend);
        }

        let elapsed = u64::try_from(self.start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.set_output_variable_for_runtime_variable(RuntimeVariable::TotalTime, elapsed.into());

        let Some(individual) = self.best_individual.as_ref() else {
            tracing::error!("No statistics could be written because no test case was generated");
            return Err(StatisticsError::NoTestCaseGenerated);
        };

        let variables = self.resolve_output_variables(individual);
        match &self.backend {
            Some(backend) => backend.write_data(&variables),
            None => Err(StatisticsError::NoBackend),
        }
    }
}

impl StatisticsSink for SearchStatistics {
    fn current_individual(&mut self, individual: &dyn Chromosome) {
        if self.backend.is_none() {
            return;
        }

        let Some(suite) = individual.as_test_suite() else {
            tracing::warn!("SearchStatistics expected a test suite chromosome");
            return;
        };
        if suite.is_changed() {
            tracing::warn!("Ignoring individual that has not been evaluated");
            return;
        }

        tracing::debug!(
            size = suite.size(),
            coverage = suite.coverage(),
            "Received individual"
        );
        let values: Vec<OutputVariable> = self
            .variable_factories
            .values()
            .map(|factory| factory.get_variable(suite))
            .collect();
        for variable in values {
            self.set_output_variable(variable);
        }
        for factory in self.sequence_factories.values_mut() {
            factory.update(suite);
        }
        self.best_individual = Some(suite.clone());
    }

    fn set_output_variable_for_runtime_variable(
        &mut self,
        variable: RuntimeVariable,
        value: OutputValue,
    ) {
        self.set_output_variable(OutputVariable::new(variable.name(), value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{PrimitiveValue, Statement, TestCase, TestCaseChromosome};
    use std::sync::{Arc, Mutex};

    type Written = Arc<Mutex<Vec<BTreeMap<String, OutputVariable>>>>;

    struct RecordingBackend(Written);

    impl StatisticsBackend for RecordingBackend {
        fn write_data(&self, data: &BTreeMap<String, OutputVariable>) -> Result<(), StatisticsError> {
            self.0.lock().unwrap().push(data.clone());
            Ok(())
        }
    }

    fn collector(output_variables: &str, skip_missing: bool) -> (SearchStatistics, Written) {
        let written = Written::default();
        let config = StatisticsConfig {
            output_variables: output_variables.to_string(),
            skip_missing,
            ..Default::default()
        };
        (
            SearchStatistics::new(Some(Box::new(RecordingBackend(Arc::clone(&written)))), &config, 42),
            written,
        )
    }

    fn evaluated_suite(coverage: f64) -> TestSuiteChromosome {
        let mut tc = TestCase::new();
        tc.add_statement(Statement::primitive(PrimitiveValue::Bool(true)));
        let mut suite = TestSuiteChromosome::from_test_cases(vec![tc]);
        suite.set_evaluation(1.0 - coverage, coverage);
        suite
    }

    #[test]
    fn test_seed_is_recorded() {
        let (statistics, _) = collector("", false);
        assert_eq!(
            statistics.output_variables()["Random_Seed"].value(),
            &OutputValue::Int(42)
        );
    }

    #[test]
    fn test_sequence_names_never_become_flat_entries() {
        let (mut statistics, _) = collector("", false);
        statistics.set_output_variable(OutputVariable::new("TotalExceptionsTimeline", 3_usize));
        statistics.set_output_variable(OutputVariable::new("CoverageTimeline", 0.5));

        assert!(!statistics.output_variables().contains_key("TotalExceptionsTimeline"));
        assert!(!statistics.output_variables().contains_key("CoverageTimeline"));
        assert_eq!(
            statistics.sequence_values(RuntimeVariable::TotalExceptionsTimeline),
            Some(&[OutputValue::Int(3)][..])
        );
        assert_eq!(
            statistics.sequence_values(RuntimeVariable::CoverageTimeline),
            Some(&[OutputValue::Float(0.5)][..])
        );
    }

    #[test]
    fn test_non_suite_individual_is_ignored() {
        let (mut statistics, _) = collector("", false);
        let mut chromosome = TestCaseChromosome::new(TestCase::new());
        chromosome.set_evaluation(None, 0.0, 1.0);

        statistics.current_individual(&chromosome);

        assert!(statistics.best_individual().is_none());
        assert!(!statistics.output_variables().contains_key("Coverage"));
    }

    #[test]
    fn test_changed_suite_is_ignored() {
        let (mut statistics, _) = collector("", false);
        let mut suite = evaluated_suite(0.5);
        suite.set_changed();

        statistics.current_individual(&suite);

        assert!(statistics.best_individual().is_none());
    }

    #[test]
    fn test_without_backend_everything_is_a_no_op() {
        let mut statistics = SearchStatistics::new(None, &StatisticsConfig::default(), 1);
        statistics.current_individual(&evaluated_suite(1.0));

        assert!(statistics.best_individual().is_none());
        assert!(matches!(statistics.write_statistics(), Err(StatisticsError::NoBackend)));
    }

    #[test]
    fn test_write_without_individual_leaves_backend_untouched() {
        let (mut statistics, written) = collector("", false);

        let result = statistics.write_statistics();

        assert!(matches!(result, Err(StatisticsError::NoTestCaseGenerated)));
        assert!(written.lock().unwrap().is_empty());
        assert!(statistics.output_variables().contains_key("total_time"));
    }

    #[test]
    fn test_default_output_set() {
        let (mut statistics, written) = collector("", false);
        statistics.set_output_variable_for_runtime_variable(RuntimeVariable::TargetClass, "calc".into());
        statistics.set_output_variable_for_runtime_variable(RuntimeVariable::Criterion, "BRANCH".into());
        statistics.current_individual(&evaluated_suite(0.75));

        statistics.write_statistics().unwrap();

        let written = written.lock().unwrap();
        let row = &written[0];
        let names: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Coverage", "TARGET_CLASS", "criterion"]);
        assert_eq!(row["Coverage"].value(), &OutputValue::Float(0.75));
    }

    #[test]
    fn test_direct_value_overrides_factory() {
        let (mut statistics, written) = collector("Coverage", false);
        statistics.current_individual(&evaluated_suite(0.25));
        statistics.set_output_variable_for_runtime_variable(RuntimeVariable::Coverage, 0.9.into());

        statistics.write_statistics().unwrap();

        assert_eq!(
            written.lock().unwrap()[0]["Coverage"].value(),
            &OutputValue::Float(0.9)
        );
    }

    #[test]
    fn test_missing_variable_handling() {
        let (mut strict, strict_written) = collector("Coverage,Nonexistent", false);
        strict.current_individual(&evaluated_suite(0.5));
        strict.write_statistics().unwrap();
        assert!(strict_written.lock().unwrap()[0].is_empty());

        let (mut lenient, lenient_written) = collector("Coverage,Nonexistent", true);
        lenient.current_individual(&evaluated_suite(0.5));
        lenient.write_statistics().unwrap();
        let row = &lenient_written.lock().unwrap()[0];
        assert_eq!(row["Nonexistent"].value(), &OutputValue::empty());
        assert_eq!(row["Coverage"].value(), &OutputValue::Float(0.5));
    }

    #[test]
    fn test_single_timeline_entry_is_resolved() {
        let (mut statistics, written) = collector("Coverage,CoverageTimeline_2", false);
        for coverage in [0.25, 0.5, 1.0] {
            statistics.current_individual(&evaluated_suite(coverage));
        }

        statistics.write_statistics().unwrap();

        let written = written.lock().unwrap();
        let row = &written[0];
        let names: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Coverage", "CoverageTimeline_2"]);
        assert_eq!(row["CoverageTimeline_2"].value(), &OutputValue::Float(0.5));
    }

    #[test]
    fn test_timeline_entry_beyond_run_is_missing() {
        let (mut strict, strict_written) = collector("CoverageTimeline_4", false);
        strict.current_individual(&evaluated_suite(0.5));
        strict.write_statistics().unwrap();
        assert!(strict_written.lock().unwrap()[0].is_empty());

        let (mut lenient, lenient_written) = collector("CoverageTimeline_4", true);
        lenient.current_individual(&evaluated_suite(0.5));
        lenient.write_statistics().unwrap();
        assert_eq!(
            lenient_written.lock().unwrap()[0]["CoverageTimeline_4"].value(),
            &OutputValue::empty()
        );
    }

    #[test]
    fn test_timeline_expands_per_generation() {
        let (mut statistics, written) = collector("CoverageTimeline", false);
        for coverage in [0.25, 0.5, 1.0] {
            statistics.current_individual(&evaluated_suite(coverage));
        }

        statistics.write_statistics().unwrap();

        let written = written.lock().unwrap();
        let row = &written[0];
        assert_eq!(row.len(), 3);
        assert_eq!(row["CoverageTimeline_3"].value(), &OutputValue::Float(1.0));
    }
}
