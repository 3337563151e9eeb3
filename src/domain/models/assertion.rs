//! Regression oracle assertions.
//!
//! Assertions are immutable once built. Equality and hashing cover exactly
//! the variant, the source variable, the expected value and, for field
//! assertions, the field name and owners, so synthesized assertions can be
//! deduplicated through set semantics.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use super::test_case::TestCase;
use super::value::{PrimitiveValue, Value};
use super::variable::VariableRef;

/// Expects a variable to hold a scalar value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PrimitiveAssertion {
    source: Option<VariableRef>,
    value: PrimitiveValue,
}

impl PrimitiveAssertion {
    pub const fn new(source: Option<VariableRef>, value: PrimitiveValue) -> Self {
        Self { source, value }
    }

    pub const fn source(&self) -> Option<VariableRef> {
        self.source
    }

    pub const fn value(&self) -> &PrimitiveValue {
        &self.value
    }

    pub fn clone_into(&self, target: &TestCase, offset: isize) -> Self {
        Self {
            source: self.source.map(|s| s.clone_into(target, offset)),
            value: self.value.clone(),
        }
    }
}

/// Expects a field of an object (or of a type, when `source` is absent) to
/// hold a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FieldAssertion {
    source: Option<VariableRef>,
    value: Value,
    field: String,
    owners: Option<BTreeSet<String>>,
}

impl FieldAssertion {
    pub fn new(source: Option<VariableRef>, value: impl Into<Value>, field: impl Into<String>) -> Self {
        Self {
            source,
            value: value.into(),
            field: field.into(),
            owners: None,
        }
    }

    /// Field assertion naming the types that own the field.
    #[must_use]
    pub fn with_owners(mut self, owners: BTreeSet<String>) -> Self {
        self.owners = Some(owners);
        self
    }

    pub const fn source(&self) -> Option<VariableRef> {
        self.source
    }

    pub const fn value(&self) -> &Value {
        &self.value
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub const fn owners(&self) -> Option<&BTreeSet<String>> {
        self.owners.as_ref()
    }

    pub fn clone_into(&self, target: &TestCase, offset: isize) -> Self {
        Self {
            source: self.source.map(|s| s.clone_into(target, offset)),
            value: self.value.clone(),
            field: self.field.clone(),
            owners: self.owners.clone(),
        }
    }
}

/// Expects a collection or object to be structurally equal to a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ComplexAssertion {
    source: Option<VariableRef>,
    value: Value,
}

impl ComplexAssertion {
    pub fn new(source: Option<VariableRef>, value: impl Into<Value>) -> Self {
        Self {
            source,
            value: value.into(),
        }
    }

    pub const fn source(&self) -> Option<VariableRef> {
        self.source
    }

    pub const fn value(&self) -> &Value {
        &self.value
    }

    pub fn clone_into(&self, target: &TestCase, offset: isize) -> Self {
        Self {
            source: self.source.map(|s| s.clone_into(target, offset)),
            value: self.value.clone(),
        }
    }
}

/// One method per assertion variant, none of them defaulted, so a new
/// variant fails to compile until every visitor handles it.
pub trait AssertionVisitor {
    fn visit_primitive_assertion(&mut self, assertion: &PrimitiveAssertion);
    fn visit_field_assertion(&mut self, assertion: &FieldAssertion);
    fn visit_complex_assertion(&mut self, assertion: &ComplexAssertion);
}

/// A regression assertion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Assertion {
    Primitive(PrimitiveAssertion),
    Field(FieldAssertion),
    Complex(ComplexAssertion),
}

impl Assertion {
    pub const fn source(&self) -> Option<VariableRef> {
        match self {
            Self::Primitive(a) => a.source(),
            Self::Field(a) => a.source(),
            Self::Complex(a) => a.source(),
        }
    }

    /// Same assertion bound to another source.
    #[must_use]
    pub fn with_source(self, source: Option<VariableRef>) -> Self {
        match self {
            Self::Primitive(a) => Self::Primitive(PrimitiveAssertion { source, ..a }),
            Self::Field(a) => Self::Field(FieldAssertion { source, ..a }),
            Self::Complex(a) => Self::Complex(ComplexAssertion { source, ..a }),
        }
    }

    pub fn accept<V: AssertionVisitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            Self::Primitive(a) => visitor.visit_primitive_assertion(a),
            Self::Field(a) => visitor.visit_field_assertion(a),
            Self::Complex(a) => visitor.visit_complex_assertion(a),
        }
    }

    /// Structurally identical copy whose source is rebound into `target`
    /// at the shifted position.
    pub fn clone_into(&self, target: &TestCase, offset: isize) -> Self {
        match self {
            Self::Primitive(a) => Self::Primitive(a.clone_into(target, offset)),
            Self::Field(a) => Self::Field(a.clone_into(target, offset)),
            Self::Complex(a) => Self::Complex(a.clone_into(target, offset)),
        }
    }
}

impl From<PrimitiveAssertion> for Assertion {
    fn from(value: PrimitiveAssertion) -> Self {
        Self::Primitive(value)
    }
}

impl From<FieldAssertion> for Assertion {
    fn from(value: FieldAssertion) -> Self {
        Self::Field(value)
    }
}

impl From<ComplexAssertion> for Assertion {
    fn from(value: ComplexAssertion) -> Self {
        Self::Complex(value)
    }
}

/// Renders assertions for log output.
struct Describer<'a, 'b> {
    f: &'a mut fmt::Formatter<'b>,
    result: fmt::Result,
}

fn subject(source: Option<VariableRef>) -> String {
    source.map_or_else(|| "<static>".to_string(), |s| s.to_string())
}

impl AssertionVisitor for Describer<'_, '_> {
    fn visit_primitive_assertion(&mut self, assertion: &PrimitiveAssertion) {
        self.result = write!(self.f, "{} == {}", subject(assertion.source), assertion.value);
    }

    fn visit_field_assertion(&mut self, assertion: &FieldAssertion) {
        let owner = match (&assertion.source, &assertion.owners) {
            (Some(source), _) => source.to_string(),
            (None, Some(owners)) => owners.iter().cloned().collect::<Vec<_>>().join("|"),
            (None, None) => subject(None),
        };
        self.result = write!(self.f, "{owner}.{} == {}", assertion.field, assertion.value);
    }

    fn visit_complex_assertion(&mut self, assertion: &ComplexAssertion) {
        self.result = write!(self.f, "{} == {}", subject(assertion.source), assertion.value);
    }
}

impl fmt::Display for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut describer = Describer { f, result: Ok(()) };
        self.accept(&mut describer);
        describer.result
    }
}
