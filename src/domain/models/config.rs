use serde::{Deserialize, Serialize};

/// Main configuration structure for suitegen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Name of the bundled target to generate tests for
    #[serde(default = "default_target")]
    pub target: String,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Statistics configuration
    #[serde(default)]
    pub statistics: StatisticsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_target() -> String {
    "calculator".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: default_target(),
            search: SearchConfig::default(),
            statistics: StatisticsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Selection function used to pick parents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionKind {
    Rank,
    Tournament,
}

/// Suite fitness function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessKind {
    /// Sum of normalised branch distances (minimised)
    BranchDistance,
    /// Covered goal fraction (maximised)
    Coverage,
}

impl FitnessKind {
    /// Criterion name reported in the statistics
    pub const fn criterion(self) -> &'static str {
        match self {
            Self::BranchDistance => "BRANCH",
            Self::Coverage => "COVERAGE",
        }
    }
}

/// How the first generation is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialPopulationKind {
    Random,
    Seeded,
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SearchConfig {
    /// Number of suites per generation
    #[serde(default = "default_population_size")]
    pub population_size: usize,

    /// Generation budget; the initial population counts as generation one
    #[serde(default = "default_max_generations")]
    pub max_generations: Option<usize>,

    /// Wall-clock budget in seconds
    #[serde(default = "default_max_search_time_secs")]
    pub max_search_time_secs: Option<u64>,

    /// Stop once the best suite reaches this coverage
    #[serde(default = "default_target_coverage")]
    pub target_coverage: f64,

    /// Best suites copied unchanged into the next generation; at least 1
    #[serde(default = "default_elite_count")]
    pub elite_count: usize,

    /// Probability of crossing two selected parents
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,

    #[serde(default = "default_selection")]
    pub selection: SelectionKind,

    /// Bias of rank selection (between 1 and 2)
    #[serde(default = "default_rank_bias")]
    pub rank_bias: f64,

    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,

    #[serde(default = "default_fitness")]
    pub fitness: FitnessKind,

    #[serde(default = "default_initial_population")]
    pub initial_population: InitialPopulationKind,

    #[serde(default = "default_min_initial_tests")]
    pub min_initial_tests: usize,

    #[serde(default = "default_max_initial_tests")]
    pub max_initial_tests: usize,

    /// Upper bound on test cases per suite
    #[serde(default = "default_max_suite_size")]
    pub max_suite_size: usize,

    /// Upper bound on statements per test case
    #[serde(default = "default_chromosome_length")]
    pub chromosome_length: usize,

    /// Base probability of adding a new test case during suite mutation
    #[serde(default = "default_test_insertion_probability")]
    pub test_insertion_probability: f64,

    /// Base probability of inserting a statement during test case mutation
    #[serde(default = "default_statement_insertion_probability")]
    pub statement_insertion_probability: f64,

    #[serde(default = "default_one_third")]
    pub test_delete_probability: f64,

    #[serde(default = "default_one_third")]
    pub test_change_probability: f64,

    #[serde(default = "default_one_third")]
    pub test_insert_probability: f64,

    /// Maximum nesting when building constructor arguments
    #[serde(default = "default_max_recursion")]
    pub max_recursion: usize,

    /// Bound for generated integers (and floats)
    #[serde(default = "default_max_int")]
    pub max_int: i64,

    /// Bound for value perturbation
    #[serde(default = "default_max_delta")]
    pub max_delta: i64,

    /// Maximum length of generated strings
    #[serde(default = "default_string_length")]
    pub string_length: usize,

    /// Concurrent test case executions
    #[serde(default = "default_evaluation_workers")]
    pub evaluation_workers: usize,

    /// Per test case execution timeout in milliseconds
    #[serde(default = "default_candidate_timeout_ms")]
    pub candidate_timeout_ms: u64,

    /// Consecutive generations without any successful execution before giving up
    #[serde(default = "default_max_failed_generations")]
    pub max_failed_generations: usize,

    /// Random seed; drawn at startup when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

const fn default_population_size() -> usize {
    50
}

#[allow(clippy::unnecessary_wraps)]
const fn default_max_generations() -> Option<usize> {
    Some(100)
}

#[allow(clippy::unnecessary_wraps)]
const fn default_max_search_time_secs() -> Option<u64> {
    Some(60)
}

const fn default_target_coverage() -> f64 {
    1.0
}

const fn default_elite_count() -> usize {
    1
}

const fn default_crossover_rate() -> f64 {
    0.75
}

const fn default_selection() -> SelectionKind {
    SelectionKind::Rank
}

const fn default_rank_bias() -> f64 {
    1.7
}

const fn default_tournament_size() -> usize {
    5
}

const fn default_fitness() -> FitnessKind {
    FitnessKind::BranchDistance
}

const fn default_initial_population() -> InitialPopulationKind {
    InitialPopulationKind::Random
}

const fn default_min_initial_tests() -> usize {
    1
}

const fn default_max_initial_tests() -> usize {
    10
}

const fn default_max_suite_size() -> usize {
    50
}

const fn default_chromosome_length() -> usize {
    40
}

const fn default_test_insertion_probability() -> f64 {
    0.1
}

const fn default_statement_insertion_probability() -> f64 {
    0.5
}

const fn default_one_third() -> f64 {
    1.0 / 3.0
}

const fn default_max_recursion() -> usize {
    10
}

const fn default_max_int() -> i64 {
    256
}

const fn default_max_delta() -> i64 {
    20
}

const fn default_string_length() -> usize {
    20
}

const fn default_evaluation_workers() -> usize {
    1
}

const fn default_candidate_timeout_ms() -> u64 {
    5000
}

const fn default_max_failed_generations() -> usize {
    3
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            max_generations: default_max_generations(),
            max_search_time_secs: default_max_search_time_secs(),
            target_coverage: default_target_coverage(),
            elite_count: default_elite_count(),
            crossover_rate: default_crossover_rate(),
            selection: default_selection(),
            rank_bias: default_rank_bias(),
            tournament_size: default_tournament_size(),
            fitness: default_fitness(),
            initial_population: default_initial_population(),
            min_initial_tests: default_min_initial_tests(),
            max_initial_tests: default_max_initial_tests(),
            max_suite_size: default_max_suite_size(),
            chromosome_length: default_chromosome_length(),
            test_insertion_probability: default_test_insertion_probability(),
            statement_insertion_probability: default_statement_insertion_probability(),
            test_delete_probability: default_one_third(),
            test_change_probability: default_one_third(),
            test_insert_probability: default_one_third(),
            max_recursion: default_max_recursion(),
            max_int: default_max_int(),
            max_delta: default_max_delta(),
            string_length: default_string_length(),
            evaluation_workers: default_evaluation_workers(),
            candidate_timeout_ms: default_candidate_timeout_ms(),
            max_failed_generations: default_max_failed_generations(),
            seed: None,
        }
    }
}

/// Statistics backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticsBackendKind {
    Console,
    Csv,
    None,
}

/// Statistics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StatisticsConfig {
    #[serde(default = "default_backend")]
    pub backend: StatisticsBackendKind,

    /// Comma-separated output variable names; empty selects the default set
    #[serde(default)]
    pub output_variables: String,

    /// Directory the CSV backend writes into
    #[serde(default = "default_report_dir")]
    pub report_dir: String,

    /// Report unresolvable variables as empty values instead of failing
    #[serde(default)]
    pub skip_missing: bool,
}

const fn default_backend() -> StatisticsBackendKind {
    StatisticsBackendKind::Console
}

fn default_report_dir() -> String {
    "suitegen-report".to_string()
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            output_variables: String::new(),
            report_dir: default_report_dir(),
            skip_missing: false,
        }
    }
}

impl StatisticsConfig {
    /// Requested names in configured order, or `None` when the default set applies.
    pub fn requested_variables(&self) -> Option<Vec<String>> {
        let names: Vec<String> = self
            .output_variables
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect();
        (!names.is_empty()).then_some(names)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when absent
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}
