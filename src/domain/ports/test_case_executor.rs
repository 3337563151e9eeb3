use async_trait::async_trait;

use crate::domain::errors::ExecutionError;
use crate::domain::models::{ExecutionResult, TargetSchema, TestCase};

/// Port to the instrumented target.
///
/// Every call to [`TestCaseExecutor::execute`] must run against a fresh
/// target state: no mutable target state may leak between executions, which
/// makes concurrent calls safe.
///
/// The engine abandons an execution that exceeds its timeout by dropping the
/// returned future. Implementations that run work outside the future must
/// stop that work once the future is dropped.
///
/// # Examples
///
/// ```no_run
/// use suitegen::domain::models::TestCase;
/// use suitegen::domain::ports::TestCaseExecutor;
///
/// async fn example(executor: &dyn TestCaseExecutor, test_case: &TestCase) {
///     match executor.execute(test_case).await {
///         Ok(result) => println!("reached {} goals", result.covered_goals().count()),
///         Err(e) => eprintln!("executor failed: {e}"),
///     }
/// }
/// ```
#[async_trait]
pub trait TestCaseExecutor: Send + Sync {
    /// Callables available to test generation.
    fn schema(&self) -> &TargetSchema;

    /// Number of coverage goals of the target.
    fn goal_count(&self) -> usize;

    /// Run `test_case` and report coverage, fault and trace.
    ///
    /// A fault raised by the target is part of a successful result; `Err`
    /// means the executor could not produce a result at all.
    async fn execute(&self, test_case: &TestCase) -> Result<ExecutionResult, ExecutionError>;
}
