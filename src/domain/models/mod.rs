pub mod assertion;
pub mod chromosome;
pub mod config;
pub mod execution;
pub mod output_variable;
pub mod schema;
pub mod statement;
pub mod test_case;
pub mod trace;
pub mod value;
pub mod variable;

pub use assertion::{
    Assertion, AssertionVisitor, ComplexAssertion, FieldAssertion, PrimitiveAssertion,
};
pub use chromosome::{Chromosome, TestCaseChromosome, TestSuiteChromosome};
pub use config::{
    Config, FitnessKind, InitialPopulationKind, LoggingConfig, SearchConfig, SelectionKind,
    StatisticsBackendKind, StatisticsConfig,
};
pub use execution::{CoverageGoal, ExecutionFault, ExecutionResult};
pub use output_variable::{OutputValue, OutputVariable, RuntimeVariable};
pub use schema::{CallableKind, CallableSpec, TargetSchema};
pub use statement::{Statement, StatementKind};
pub use test_case::TestCase;
pub use trace::{
    ComplexTraceEntry, FieldTraceEntry, PrimitiveTraceEntry, TraceEntry, TraceKey, TraceStore,
};
pub use value::{ObjectSnapshot, PrimitiveValue, Value, ValueType};
pub use variable::VariableRef;
