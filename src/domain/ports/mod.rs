//! Port trait definitions (Hexagonal Architecture)
//!
//! - TestCaseExecutor: runs a test case against the instrumented target
//! - StatisticsBackend: persists the resolved output variables
//! - StatisticsSink: receives per-generation reports from the search engine

pub mod statistics_backend;
pub mod statistics_sink;
pub mod test_case_executor;

pub use statistics_backend::StatisticsBackend;
pub use statistics_sink::{NullStatisticsSink, StatisticsSink};
pub use test_case_executor::TestCaseExecutor;
