//! Bundled in-process targets implementing [`TestCaseExecutor`].

pub mod calculator;

use std::sync::Arc;

use crate::domain::ports::TestCaseExecutor;

pub use calculator::CalculatorTarget;

/// Names accepted by the `target` configuration key.
pub const TARGET_NAMES: &[&str] = &[calculator::NAME];

/// Executor for the named target.
pub fn executor_for(name: &str) -> Option<Arc<dyn TestCaseExecutor>> {
    match name {
        calculator::NAME => Some(Arc::new(CalculatorTarget::new())),
        _ => None,
    }
}
