//! Domain errors for the suitegen search core.

use std::time::Duration;
use thiserror::Error;

/// Failure of the executor itself, as opposed to a fault raised by the target.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Sandbox failure: {0}")]
    Sandbox(String),

    #[error("Execution exceeded {0:?}")]
    Timeout(Duration),

    #[error("Target panicked: {0}")]
    Panicked(String),

    #[error("Execution cancelled")]
    Cancelled,

    #[error("Unknown callable: {0}")]
    UnknownCallable(String),
}

/// Errors raised while building statements.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Target exposes no callables")]
    NoCallables,

    #[error("Cannot produce a value of type {0}")]
    Unsatisfiable(String),
}

/// Fatal outcomes of a search run.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid search configuration: {0}")]
    Configuration(String),

    #[error("Test generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("No individual of the initial population could be evaluated")]
    NoSuccessfulEvaluation,

    #[error("Evaluation failed for {generations} consecutive generations")]
    RepeatedEvaluationFailure { generations: usize },
}

/// Outcome of writing the collected statistics.
#[derive(Debug, Error)]
pub enum StatisticsError {
    #[error("No statistics backend configured")]
    NoBackend,

    #[error("No statistics could be written because no test case was generated")]
    NoTestCaseGenerated,

    #[error("Statistics I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SearchResult<T> = Result<T, SearchError>;
