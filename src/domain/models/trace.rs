//! Per-execution record of observed values and the assertions they imply.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use super::assertion::{Assertion, ComplexAssertion, FieldAssertion, PrimitiveAssertion};
use super::value::{PrimitiveValue, Value};
use super::variable::VariableRef;

/// Last observed scalar value of a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrimitiveTraceEntry {
    variable: VariableRef,
    value: PrimitiveValue,
}

impl PrimitiveTraceEntry {
    pub const fn new(variable: VariableRef, value: PrimitiveValue) -> Self {
        Self { variable, value }
    }

    pub const fn variable(&self) -> VariableRef {
        self.variable
    }

    pub const fn value(&self) -> &PrimitiveValue {
        &self.value
    }

    /// Exactly one primitive assertion over the variable and its value.
    pub fn get_assertions(&self) -> HashSet<Assertion> {
        HashSet::from([Assertion::Primitive(PrimitiveAssertion::new(
            Some(self.variable),
            self.value.clone(),
        ))])
    }
}

/// Last observed structured value of a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplexTraceEntry {
    variable: VariableRef,
    value: Value,
}

impl ComplexTraceEntry {
    pub const fn new(variable: VariableRef, value: Value) -> Self {
        Self { variable, value }
    }

    pub const fn variable(&self) -> VariableRef {
        self.variable
    }

    pub const fn value(&self) -> &Value {
        &self.value
    }

    /// Objects with readable fields fan out into one field assertion per
    /// public field, keyed by the variable alone; anything else becomes a
    /// single holistic assertion.
    pub fn get_assertions(&self) -> HashSet<Assertion> {
        let source = Some(self.variable);
        match &self.value {
            Value::Primitive(p) => HashSet::from([Assertion::Primitive(PrimitiveAssertion::new(
                source,
                p.clone(),
            ))]),
            Value::Object(obj) if obj.public_fields().next().is_some() => obj
                .public_fields()
                .map(|(name, value)| {
                    Assertion::Field(FieldAssertion::new(source, value.clone(), name.clone()))
                })
                .collect(),
            Value::Object(_) | Value::List(_) => HashSet::from([Assertion::Complex(
                ComplexAssertion::new(source, self.value.clone()),
            )]),
        }
    }
}

/// Last observed value of a class-level field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldTraceEntry {
    owners: BTreeSet<String>,
    field: String,
    value: Value,
}

impl FieldTraceEntry {
    pub fn new(owners: BTreeSet<String>, field: impl Into<String>, value: Value) -> Self {
        Self {
            owners,
            field: field.into(),
            value,
        }
    }

    pub const fn owners(&self) -> &BTreeSet<String> {
        &self.owners
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub const fn value(&self) -> &Value {
        &self.value
    }

    pub fn get_assertions(&self) -> HashSet<Assertion> {
        HashSet::from([Assertion::Field(
            FieldAssertion::new(None, self.value.clone(), self.field.clone())
                .with_owners(self.owners.clone()),
        )])
    }
}

/// Key a trace store indexes entries by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TraceKey {
    Variable(VariableRef),
    StaticField {
        owners: BTreeSet<String>,
        field: String,
    },
}

/// One observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEntry {
    Primitive(PrimitiveTraceEntry),
    Complex(ComplexTraceEntry),
    Field(FieldTraceEntry),
}

impl TraceEntry {
    /// Observation of `value` in `variable`; scalars get a primitive entry.
    pub fn observe(variable: VariableRef, value: Value) -> Self {
        match value {
            Value::Primitive(p) => Self::Primitive(PrimitiveTraceEntry::new(variable, p)),
            other => Self::Complex(ComplexTraceEntry::new(variable, other)),
        }
    }

    pub fn key(&self) -> TraceKey {
        match self {
            Self::Primitive(e) => TraceKey::Variable(e.variable()),
            Self::Complex(e) => TraceKey::Variable(e.variable()),
            Self::Field(e) => TraceKey::StaticField {
                owners: e.owners().clone(),
                field: e.field().to_string(),
            },
        }
    }

    /// The observed value, widened to [`Value`].
    pub fn value(&self) -> Value {
        match self {
            Self::Primitive(e) => Value::Primitive(e.value().clone()),
            Self::Complex(e) => e.value().clone(),
            Self::Field(e) => e.value().clone(),
        }
    }

    pub fn get_assertions(&self) -> HashSet<Assertion> {
        match self {
            Self::Primitive(e) => e.get_assertions(),
            Self::Complex(e) => e.get_assertions(),
            Self::Field(e) => e.get_assertions(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Recorded {
    position: usize,
    entry: TraceEntry,
}

/// Observations of a single execution, at most one per variable or field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceStore {
    entries: BTreeMap<TraceKey, Recorded>,
}

impl TraceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation made after the statement at `position`.
    /// A later observation of the same variable replaces the earlier one.
    pub fn record(&mut self, position: usize, entry: TraceEntry) {
        self.entries.insert(entry.key(), Recorded { position, entry });
    }

    pub fn get(&self, key: &TraceKey) -> Option<&TraceEntry> {
        self.entries.get(key).map(|r| &r.entry)
    }

    /// Position of the statement after which `key` was last observed.
    pub fn position_of(&self, key: &TraceKey) -> Option<usize> {
        self.entries.get(key).map(|r| r.position)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deduplicated assertions grouped by the statement they follow.
    pub fn assertions_by_position(&self) -> BTreeMap<usize, HashSet<Assertion>> {
        let mut grouped: BTreeMap<usize, HashSet<Assertion>> = BTreeMap::new();
        for recorded in self.entries.values() {
            grouped
                .entry(recorded.position)
                .or_default()
                .extend(recorded.entry.get_assertions());
        }
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::value::ObjectSnapshot;
    use uuid::Uuid;

    fn var(position: usize) -> VariableRef {
        VariableRef::new(Uuid::new_v4(), position)
    }

    #[test]
    fn test_primitive_entry_clone_shares_variable() {
        let entry = PrimitiveTraceEntry::new(var(0), PrimitiveValue::Bool(true));
        let cloned = entry.clone();
        assert_eq!(cloned.variable(), entry.variable());
        assert_eq!(cloned.value(), entry.value());
    }

    #[test]
    fn test_primitive_entry_yields_single_assertion() {
        let variable = var(0);
        let entry = PrimitiveTraceEntry::new(variable, PrimitiveValue::Bool(true));
        assert_eq!(
            entry.get_assertions(),
            HashSet::from([Assertion::Primitive(PrimitiveAssertion::new(
                Some(variable),
                PrimitiveValue::Bool(true)
            ))])
        );
    }

    #[test]
    fn test_complex_object_fans_out_per_public_field() {
        let variable = var(1);
        let snapshot = ObjectSnapshot::new("CalculatorResult")
            .with_field("last_op", "add")
            .with_field("last_result", 3.0)
            .with_field("_hidden", 1_i64);
        let entry = ComplexTraceEntry::new(variable, Value::Object(snapshot));

        let assertions = entry.get_assertions();

        assert_eq!(assertions.len(), 2);
        assert!(assertions.contains(&Assertion::Field(FieldAssertion::new(
            Some(variable),
            "add",
            "last_op"
        ))));
        // instance fields carry their variable; owners are for class-level fields
        assert!(assertions.iter().all(|a| matches!(a, Assertion::Field(f)
            if f.source() == Some(variable) && f.owners().is_none())));
    }

    #[test]
    fn test_complex_object_without_fields_is_holistic() {
        let variable = var(1);
        let value = Value::Object(ObjectSnapshot::new("Calculator"));
        let entry = ComplexTraceEntry::new(variable, value.clone());
        assert_eq!(
            entry.get_assertions(),
            HashSet::from([Assertion::Complex(ComplexAssertion::new(Some(variable), value))])
        );
    }

    #[test]
    fn test_store_overwrites_and_moves_position() {
        let variable = var(0);
        let mut store = TraceStore::new();
        store.record(0, TraceEntry::observe(variable, Value::from(1_i64)));
        store.record(3, TraceEntry::observe(variable, Value::from(2_i64)));

        assert_eq!(store.len(), 1);
        let key = TraceKey::Variable(variable);
        assert_eq!(store.position_of(&key), Some(3));
        assert_eq!(store.get(&key).map(TraceEntry::value), Some(Value::from(2_i64)));

        let grouped = store.assertions_by_position();
        assert!(!grouped.contains_key(&0));
        assert_eq!(grouped[&3].len(), 1);
    }

    #[test]
    fn test_static_field_entry_is_sourceless() {
        let entry = FieldTraceEntry::new(
            BTreeSet::from(["Calculator".to_string()]),
            "amount_calculation",
            Value::from(4_i64),
        );
        let assertions = entry.get_assertions();
        assert_eq!(assertions.len(), 1);
        assert!(assertions.iter().all(|a| a.source().is_none()));
    }
}
