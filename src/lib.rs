//! suitegen - evolutionary unit test suite generation
//!
//! suitegen searches for test suites that maximise branch coverage of a
//! target. A genetic algorithm evolves suites of test cases (sequences of
//! primitive bindings and calls into the target), scores them by branch
//! distance, and records per-generation statistics. The winning suite is
//! then re-executed to synthesise regression assertions from observed values.
//!
//! # Architecture
//!
//! This crate follows a hexagonal layout:
//!
//! - **Domain Layer** (`domain`): values, test cases, chromosomes, assertions,
//!   traces, output variables, and the executor/statistics ports
//! - **Service Layer** (`services`): variation operators, selection, fitness,
//!   the search engine, assertion generation, and search statistics
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging,
//!   statistics backends, and bundled targets
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use suitegen::infrastructure::targets;
//! use suitegen::services::{SearchEngine, SearchStatistics};
//! use suitegen::{Config, StatisticsConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let executor = targets::executor_for("calculator").expect("bundled target");
//!     let mut engine = SearchEngine::new(executor, config.search)?;
//!     let mut statistics = SearchStatistics::new(None, &StatisticsConfig::default(), engine.seed());
//!     let outcome = engine.run(&mut statistics).await?;
//!     println!("coverage after {} generations", outcome.generations);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{ExecutionError, GenerationError, SearchError, StatisticsError};
pub use domain::models::{
    Assertion, Config, ExecutionResult, LoggingConfig, OutputValue, OutputVariable,
    RuntimeVariable, SearchConfig, StatisticsConfig, TestCase, TestSuiteChromosome,
};
pub use domain::ports::{StatisticsBackend, StatisticsSink, TestCaseExecutor};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{AssertionGenerator, SearchEngine, SearchOutcome, SearchStatistics};
