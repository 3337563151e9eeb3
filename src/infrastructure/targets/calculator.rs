//! Bundled demonstration target: a four-operation calculator that keeps a
//! class-level history of its results.
//!
//! Goals:
//!
//! | goal | reached when                                  |
//! |------|-----------------------------------------------|
//! | 0    | a `Calculator` is constructed                 |
//! | 1    | `add` is called                               |
//! | 2    | `sub` is called                               |
//! | 3    | `mult` is called                              |
//! | 4    | `div` is called with a non-zero divisor       |
//! | 5    | `div` is called with a zero divisor           |
//! | 6    | `output_results` is called with no history    |
//! | 7    | `output_results` is called with a history     |

use std::any::Any;
use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::ExecutionError;
use crate::domain::models::{
    CallableSpec, CoverageGoal, ExecutionFault, ExecutionResult, FieldTraceEntry, ObjectSnapshot,
    PrimitiveValue, StatementKind, TargetSchema, TestCase, TraceEntry, Value, ValueType,
    VariableRef,
};
use crate::domain::ports::TestCaseExecutor;

pub const NAME: &str = "calculator";

const CALCULATOR: &str = "Calculator";
const RESULT: &str = "CalculatorResult";
const OUTPUT_RESULTS: &str = "output_results";

const CONSTRUCTED: CoverageGoal = CoverageGoal(0);
const DIV_NON_ZERO: CoverageGoal = CoverageGoal(4);
const DIV_ZERO: CoverageGoal = CoverageGoal(5);
const OUTPUT_EMPTY: CoverageGoal = CoverageGoal(6);
const OUTPUT_NON_EMPTY: CoverageGoal = CoverageGoal(7);
const GOAL_COUNT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Add,
    Sub,
    Mult,
    Div,
}

impl Operation {
    const ALL: [Self; 4] = [Self::Add, Self::Sub, Self::Mult, Self::Div];

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mult => "mult",
            Self::Div => "div",
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mult => "MULT",
            Self::Div => "DIV",
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mult => a * b,
            Self::Div => a / b,
        }
    }
}

/// Why a statement did not produce a value.
enum Interrupt {
    /// The target raised; the test case stops here.
    Raised { kind: &'static str, message: String },
    Executor(ExecutionError),
}

impl From<ExecutionError> for Interrupt {
    fn from(e: ExecutionError) -> Self {
        Self::Executor(e)
    }
}

/// Target state of one execution. Never shared between executions.
#[derive(Debug, Default)]
struct Session {
    amount_calculation: i64,
    results: Vec<(Operation, f64)>,
    /// Value bound by each executed statement.
    values: Vec<Value>,
}

impl Session {
    fn call(
        &mut self,
        callable: &str,
        receiver: Option<VariableRef>,
        args: &[VariableRef],
        result: &mut ExecutionResult,
    ) -> Result<Value, Interrupt> {
        if callable == CALCULATOR {
            result.mark_covered(CONSTRUCTED);
            return Ok(ObjectSnapshot::new(CALCULATOR).into());
        }
        if callable == OUTPUT_RESULTS {
            self.receiver(receiver)?;
            return Ok(Value::from(self.output_results(result).as_str()));
        }

        let op = Operation::from_name(callable)
            .ok_or_else(|| ExecutionError::UnknownCallable(callable.to_string()))?;
        self.receiver(receiver)?;
        let a = self.float_arg(args, 0)?;
        let b = self.float_arg(args, 1)?;

        if op == Operation::Div {
            result.record_distance(DIV_NON_ZERO, if b == 0.0 { 1.0 } else { 0.0 });
            result.record_distance(DIV_ZERO, b.abs());
            if b == 0.0 {
                return Err(Interrupt::Raised {
                    kind: "ZeroDivisionError",
                    message: "float division by zero".to_string(),
                });
            }
        } else {
            result.mark_covered(Self::entry_goal(op));
        }

        let value = op.apply(a, b);
        self.amount_calculation += 1;
        self.results.push((op, value));
        Ok(Value::from(value))
    }

    const fn entry_goal(op: Operation) -> CoverageGoal {
        match op {
            Operation::Add => CoverageGoal(1),
            Operation::Sub => CoverageGoal(2),
            Operation::Mult => CoverageGoal(3),
            Operation::Div => DIV_NON_ZERO,
        }
    }

    fn output_results(&self, result: &mut ExecutionResult) -> String {
        if self.results.is_empty() {
            result.mark_covered(OUTPUT_EMPTY);
            result.record_distance(OUTPUT_NON_EMPTY, 1.0);
        } else {
            result.mark_covered(OUTPUT_NON_EMPTY);
            result.record_distance(OUTPUT_EMPTY, self.results.len() as f64);
        }
        self.results
            .iter()
            .map(|(op, value)| format!("{}: {value:?}", op.label()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn bound(&self, var: VariableRef) -> Option<&Value> {
        self.values.get(var.position())
    }

    fn receiver(&self, receiver: Option<VariableRef>) -> Result<(), ExecutionError> {
        match receiver.and_then(|var| self.bound(var)) {
            Some(Value::Object(snapshot)) if snapshot.type_name == CALCULATOR => Ok(()),
            _ => Err(ExecutionError::Sandbox(format!("receiver is not a {CALCULATOR}"))),
        }
    }

    fn float_arg(&self, args: &[VariableRef], index: usize) -> Result<f64, ExecutionError> {
        args.get(index)
            .and_then(|var| self.bound(*var))
            .and_then(Value::as_primitive)
            .and_then(PrimitiveValue::as_f64)
            .ok_or_else(|| ExecutionError::Sandbox(format!("argument {index} is not a number")))
    }

    /// Class-level fields as seen after a statement.
    fn static_fields(&self) -> [FieldTraceEntry; 2] {
        let owners = BTreeSet::from([CALCULATOR.to_string()]);
        let results = self
            .results
            .iter()
            .map(|(op, value)| {
                ObjectSnapshot::new(RESULT)
                    .with_field("last_op", op.name())
                    .with_field("last_result", *value)
                    .into()
            })
            .collect();
        [
            FieldTraceEntry::new(owners.clone(), "amount_calculation", Value::from(self.amount_calculation)),
            FieldTraceEntry::new(owners, "results", Value::List(results)),
        ]
    }
}

/// Execute `test_case` against a fresh session. The `cancelled` flag is
/// checked before every statement.
fn run(test_case: &TestCase, cancelled: &AtomicBool) -> Result<ExecutionResult, ExecutionError> {
    let mut session = Session::default();
    let mut result = ExecutionResult::new();
    let mut executed = 0;

    for (position, statement) in test_case.statements().iter().enumerate() {
        if cancelled.load(Ordering::Relaxed) {
            return Err(ExecutionError::Cancelled);
        }
        executed = position + 1;
        let (callable, receiver, args) = match statement.kind() {
            StatementKind::Primitive(value) => {
                session.values.push(value.clone().into());
                continue;
            }
            StatementKind::Call { callable, receiver, args } => (callable, receiver, args),
        };

        match session.call(callable, *receiver, args, &mut result) {
            Ok(value) => {
                let var = VariableRef::new(test_case.id(), position);
                result.trace_mut().record(position, TraceEntry::observe(var, value.clone()));
                for field in session.static_fields() {
                    result.trace_mut().record(position, TraceEntry::Field(field));
                }
                session.values.push(value);
            }
            Err(Interrupt::Raised { kind, message }) => {
                result.set_fault(ExecutionFault {
                    position,
                    kind: kind.to_string(),
                    message,
                });
                break;
            }
            Err(Interrupt::Executor(e)) => return Err(e),
        }
    }

    result.set_executed_statements(executed);
    Ok(result)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Raises the flag when the awaiting future is dropped, so the blocking
/// task stops at its next statement.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// In-process executor for the calculator.
#[derive(Debug, Clone)]
pub struct CalculatorTarget {
    schema: TargetSchema,
}

impl CalculatorTarget {
    pub fn new() -> Self {
        let binary = vec![ValueType::Float, ValueType::Float];
        let mut callables = vec![CallableSpec::constructor(CALCULATOR, vec![])];
        callables.extend(
            Operation::ALL
                .iter()
                .map(|op| CallableSpec::method(CALCULATOR, op.name(), binary.clone(), ValueType::Float)),
        );
        callables.push(CallableSpec::method(CALCULATOR, OUTPUT_RESULTS, vec![], ValueType::Str));

        Self {
            schema: TargetSchema {
                module: NAME.to_string(),
                callables,
            },
        }
    }
}

impl Default for CalculatorTarget {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TestCaseExecutor for CalculatorTarget {
    fn schema(&self) -> &TargetSchema {
        &self.schema
    }

    fn goal_count(&self) -> usize {
        GOAL_COUNT
    }

    async fn execute(&self, test_case: &TestCase) -> Result<ExecutionResult, ExecutionError> {
        let test_case = test_case.clone();
        let cancelled = Arc::new(AtomicBool::new(false));
        let _guard = CancelOnDrop(Arc::clone(&cancelled));
        tokio::task::spawn_blocking(move || {
            match catch_unwind(AssertUnwindSafe(|| run(&test_case, &cancelled))) {
                Ok(result) => result,
                Err(payload) => Err(ExecutionError::Panicked(panic_message(payload.as_ref()))),
            }
        })
        .await
        .map_err(|e| ExecutionError::Sandbox(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Assertion, FieldAssertion, Statement, TraceKey};

    fn calculator_type() -> ValueType {
        ValueType::Object(CALCULATOR.to_string())
    }

    /// `calc = Calculator(); a = lhs; b = rhs; calc.<op>(a, b)`
    fn binary_call(op: &str, lhs: f64, rhs: f64) -> TestCase {
        let mut tc = TestCase::new();
        let calc = tc.add_statement(Statement::call(CALCULATOR, None, vec![], calculator_type()));
        let a = tc.add_statement(Statement::primitive(PrimitiveValue::Float(lhs)));
        let b = tc.add_statement(Statement::primitive(PrimitiveValue::Float(rhs)));
        tc.add_statement(Statement::call(op, Some(calc), vec![a, b], ValueType::Float));
        tc
    }

    #[test]
    fn test_schema_lists_all_callables() {
        let target = CalculatorTarget::new();
        let names: Vec<&str> = target.schema().callables.iter().map(|c| c.name.as_str()).collect();

        assert_eq!(names, vec!["Calculator", "add", "sub", "mult", "div", "output_results"]);
        assert!(target.schema().constructor_for(CALCULATOR).is_some());
        assert_eq!(target.goal_count(), 8);
    }

    #[tokio::test]
    async fn test_add_records_value_and_class_state() {
        let tc = binary_call("add", 1.5, 2.0);
        let result = CalculatorTarget::new().execute(&tc).await.unwrap();

        assert!(result.fault().is_none());
        assert_eq!(result.executed_statements(), 4);
        assert_eq!(result.distance(CoverageGoal(1)), Some(0.0));

        let sum = result
            .trace()
            .get(&TraceKey::Variable(tc.variable_at(3).unwrap()))
            .map(TraceEntry::value);
        assert_eq!(sum, Some(Value::from(3.5)));

        let amount = result.trace().get(&TraceKey::StaticField {
            owners: BTreeSet::from([CALCULATOR.to_string()]),
            field: "amount_calculation".to_string(),
        });
        assert_eq!(amount.map(TraceEntry::value), Some(Value::from(1_i64)));
    }

    #[tokio::test]
    async fn test_division_by_zero_raises() {
        let mut tc = binary_call("div", 1.0, 0.0);
        tc.add_statement(Statement::call(
            OUTPUT_RESULTS,
            tc.variable_at(0),
            vec![],
            ValueType::Str,
        ));

        let result = CalculatorTarget::new().execute(&tc).await.unwrap();

        let fault = result.fault().unwrap();
        assert_eq!(fault.position, 3);
        assert_eq!(fault.kind, "ZeroDivisionError");
        assert_eq!(result.executed_statements(), 4);
        assert_eq!(result.distance(DIV_ZERO), Some(0.0));
        assert_eq!(result.distance(DIV_NON_ZERO), Some(1.0));
        assert_eq!(result.distance(OUTPUT_EMPTY), None);
    }

    #[tokio::test]
    async fn test_division_distance_tracks_divisor() {
        let tc = binary_call("div", 1.0, -4.0);
        let result = CalculatorTarget::new().execute(&tc).await.unwrap();

        assert_eq!(result.distance(DIV_NON_ZERO), Some(0.0));
        assert_eq!(result.distance(DIV_ZERO), Some(4.0));
    }

    #[tokio::test]
    async fn test_output_results_formats_history() {
        let mut tc = binary_call("mult", 2.0, 3.0);
        tc.add_statement(Statement::call(
            OUTPUT_RESULTS,
            tc.variable_at(0),
            vec![],
            ValueType::Str,
        ));

        let result = CalculatorTarget::new().execute(&tc).await.unwrap();
        let text = result
            .trace()
            .get(&TraceKey::Variable(tc.variable_at(4).unwrap()))
            .map(TraceEntry::value);

        assert_eq!(text, Some(Value::from("MULT: 6.0")));
        assert_eq!(result.distance(OUTPUT_NON_EMPTY), Some(0.0));
        assert_eq!(result.distance(OUTPUT_EMPTY), Some(1.0));
    }

    #[tokio::test]
    async fn test_state_does_not_leak_between_executions() {
        let target = CalculatorTarget::new();
        let tc = binary_call("sub", 5.0, 1.0);

        let first = target.execute(&tc).await.unwrap();
        let second = target.execute(&tc).await.unwrap();

        let amount = Assertion::from(
            FieldAssertion::new(None, 1_i64, "amount_calculation")
                .with_owners(BTreeSet::from([CALCULATOR.to_string()])),
        );
        assert!(first.trace().assertions_by_position()[&3].contains(&amount));
        assert!(second.trace().assertions_by_position()[&3].contains(&amount));
    }

    #[tokio::test]
    async fn test_unknown_callable_is_an_executor_error() {
        let mut tc = TestCase::new();
        let calc = tc.add_statement(Statement::call(CALCULATOR, None, vec![], calculator_type()));
        tc.add_statement(Statement::call("pow", Some(calc), vec![], ValueType::Float));

        let err = CalculatorTarget::new().execute(&tc).await.unwrap_err();

        assert_eq!(err, ExecutionError::UnknownCallable("pow".to_string()));
    }

    #[tokio::test]
    async fn test_missing_receiver_is_rejected() {
        let mut tc = TestCase::new();
        tc.add_statement(Statement::call(OUTPUT_RESULTS, None, vec![], ValueType::Str));

        let err = CalculatorTarget::new().execute(&tc).await.unwrap_err();

        assert!(matches!(err, ExecutionError::Sandbox(_)));
    }

    #[test]
    fn test_panic_message_reads_payload() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }

    #[test]
    fn test_cancelled_run_stops_before_next_statement() {
        let tc = binary_call("add", 1.0, 2.0);

        let err = run(&tc, &AtomicBool::new(true)).unwrap_err();
        assert_eq!(err, ExecutionError::Cancelled);

        let result = run(&tc, &AtomicBool::new(false)).unwrap();
        assert_eq!(result.executed_statements(), 4);
    }

    #[test]
    fn test_dropped_guard_raises_cancel_flag() {
        let cancelled = Arc::new(AtomicBool::new(false));
        let guard = CancelOnDrop(Arc::clone(&cancelled));
        assert!(!cancelled.load(Ordering::Relaxed));

        drop(guard);

        assert!(cancelled.load(Ordering::Relaxed));
    }
}
