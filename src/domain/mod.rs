//! Domain layer for suitegen
//!
//! Core search model (values, test cases, assertions, chromosomes) plus the
//! ports the services drive.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{ExecutionError, GenerationError, SearchError, StatisticsError};
