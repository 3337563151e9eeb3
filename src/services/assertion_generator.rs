//! Regression assertion synthesis.
//!
//! A test case is executed twice against fresh target state. Assertions are
//! derived from the first trace and kept only when they also hold on the
//! second, which filters out observations of nondeterministic values.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::errors::ExecutionError;
use crate::domain::models::{
    Assertion, AssertionVisitor, ComplexAssertion, FieldAssertion, PrimitiveAssertion, TestCase,
    TraceEntry, TraceKey, TraceStore, Value,
};
use crate::domain::ports::TestCaseExecutor;

/// Checks an assertion against a trace.
pub struct AssertionVerifier<'a> {
    trace: &'a TraceStore,
    holds: bool,
}

impl<'a> AssertionVerifier<'a> {
    pub const fn new(trace: &'a TraceStore) -> Self {
        Self { trace, holds: false }
    }

    /// Whether `assertion` holds on `trace`.
    pub fn holds(assertion: &Assertion, trace: &'a TraceStore) -> bool {
        let mut verifier = Self::new(trace);
        assertion.accept(&mut verifier);
        verifier.holds
    }

    fn observed(&self, key: &TraceKey) -> Option<Value> {
        self.trace.get(key).map(TraceEntry::value)
    }
}

impl AssertionVisitor for AssertionVerifier<'_> {
    fn visit_primitive_assertion(&mut self, assertion: &PrimitiveAssertion) {
        self.holds = assertion
            .source()
            .and_then(|source| self.observed(&TraceKey::Variable(source)))
            .is_some_and(|value| value.as_primitive() == Some(assertion.value()));
    }

    fn visit_field_assertion(&mut self, assertion: &FieldAssertion) {
        self.holds = match (assertion.source(), assertion.owners()) {
            (Some(source), _) => match self.observed(&TraceKey::Variable(source)) {
                Some(Value::Object(snapshot)) => {
                    snapshot.fields.get(assertion.field()) == Some(assertion.value())
                }
                _ => false,
            },
            (None, Some(owners)) => self
                .observed(&TraceKey::StaticField {
                    owners: owners.clone(),
                    field: assertion.field().to_string(),
                })
                .is_some_and(|value| &value == assertion.value()),
            (None, None) => false,
        };
    }

    fn visit_complex_assertion(&mut self, assertion: &ComplexAssertion) {
        self.holds = assertion
            .source()
            .and_then(|source| self.observed(&TraceKey::Variable(source)))
            .is_some_and(|value| &value == assertion.value());
    }
}

/// Counts from one assertion generation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssertionReport {
    /// Assertions attached to statements
    pub added: usize,
    /// Assertions dropped because a second execution contradicted them
    pub unstable: usize,
    /// Test cases the executor could not run
    pub failed_test_cases: usize,
}

pub struct AssertionGenerator {
    executor: Arc<dyn TestCaseExecutor>,
}

impl AssertionGenerator {
    pub fn new(executor: Arc<dyn TestCaseExecutor>) -> Self {
        Self { executor }
    }

    /// Replace the assertions of `test_case` with those observed on two
    /// executions. Returns how many were added and how many were unstable.
    pub async fn add_assertions(&self, test_case: &mut TestCase) -> Result<(usize, usize), ExecutionError> {
        test_case.clear_assertions();
        let first = self.executor.execute(test_case).await?;
        let second = self.executor.execute(test_case).await?;

        let mut added = 0;
        let mut unstable = 0;
        for (position, assertions) in first.trace().assertions_by_position() {
            let mut assertions: Vec<Assertion> = assertions.into_iter().collect();
            assertions.sort_by_cached_key(ToString::to_string);

            let Some(statement) = test_case.statement_mut(position) else {
                continue;
            };
            for assertion in assertions {
                if !AssertionVerifier::holds(&assertion, second.trace()) {
                    tracing::debug!(%assertion, "Discarding unstable assertion");
                    unstable += 1;
                } else if statement.add_assertion(assertion) {
                    added += 1;
                }
            }
        }
        Ok((added, unstable))
    }

    /// Add assertions to every test case; failures are logged and counted.
    pub async fn add_assertions_to_all(&self, test_cases: &mut [TestCase]) -> AssertionReport {
        let mut report = AssertionReport::default();
        for test_case in test_cases.iter_mut() {
            match self.add_assertions(test_case).await {
                Ok((added, unstable)) => {
                    report.added += added;
                    report.unstable += unstable;
                }
                Err(e) => {
                    tracing::warn!(test_case = %test_case.id(), error = %e, "Assertion generation failed");
                    report.failed_test_cases += 1;
                }
            }
        }
        tracing::info!(
            added = report.added,
            unstable = report.unstable,
            failed = report.failed_test_cases,
            "Assertion generation finished"
        );
        report
    }
}
