//! Property tests for assertion identity and trace entry synthesis.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use proptest::prelude::*;
use suitegen::domain::models::{
    Assertion, ComplexAssertion, ObjectSnapshot, PrimitiveAssertion, PrimitiveTraceEntry,
    PrimitiveValue, Statement, TestCase, TraceEntry, TraceStore, Value,
};

fn hash_of<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn primitive_value() -> impl Strategy<Value = PrimitiveValue> {
    prop_oneof![
        Just(PrimitiveValue::None),
        any::<bool>().prop_map(PrimitiveValue::Bool),
        any::<i64>().prop_map(PrimitiveValue::Int),
        any::<f64>().prop_map(PrimitiveValue::Float),
        "[a-z ]{0,12}".prop_map(PrimitiveValue::Str),
    ]
}

fn test_case_with(size: usize) -> TestCase {
    let mut tc = TestCase::new();
    for _ in 0..size {
        tc.add_statement(Statement::primitive(PrimitiveValue::None));
    }
    tc
}

proptest! {
    /// Property: equal assertions hash equally
    #[test]
    fn prop_equal_assertions_hash_equally(value in primitive_value(), position in 0usize..4) {
        let tc = test_case_with(4);
        let var = tc.variable_at(position).unwrap();

        let a = Assertion::from(PrimitiveAssertion::new(Some(var), value.clone()));
        let b = Assertion::from(PrimitiveAssertion::new(Some(var), value));

        prop_assert_eq!(&a, &b);
        prop_assert_eq!(hash_of(&a), hash_of(&b));
    }

    /// Property: a set of assertions collapses duplicates
    #[test]
    fn prop_assertion_set_deduplicates(values in prop::collection::vec(primitive_value(), 1..8)) {
        let tc = test_case_with(1);
        let var = tc.variable_at(0).unwrap();

        let doubled: HashSet<Assertion> = values
            .iter()
            .chain(values.iter())
            .map(|v| Assertion::from(PrimitiveAssertion::new(Some(var), v.clone())))
            .collect();
        let distinct: HashSet<&PrimitiveValue> = values.iter().collect();

        prop_assert_eq!(doubled.len(), distinct.len());
    }

    /// Property: assertions on different variables never compare equal
    #[test]
    fn prop_source_distinguishes_assertions(value in primitive_value()) {
        let tc = test_case_with(2);
        let first = Assertion::from(PrimitiveAssertion::new(tc.variable_at(0), value.clone()));
        let second = Assertion::from(PrimitiveAssertion::new(tc.variable_at(1), value));

        prop_assert_ne!(first, second);
    }

    /// Property: a primitive trace entry yields exactly one assertion, on its
    /// own variable and value
    #[test]
    fn prop_primitive_entry_yields_one_assertion(value in primitive_value(), position in 0usize..3) {
        let tc = test_case_with(3);
        let var = tc.variable_at(position).unwrap();

        let assertions = PrimitiveTraceEntry::new(var, value.clone()).get_assertions();

        prop_assert_eq!(assertions.len(), 1);
        prop_assert!(assertions.contains(&Assertion::from(PrimitiveAssertion::new(Some(var), value))));
    }

    /// Property: the store keeps only the latest observation per variable
    #[test]
    fn prop_later_observation_replaces_earlier(first in primitive_value(), second in primitive_value()) {
        let tc = test_case_with(2);
        let var = tc.variable_at(0).unwrap();

        let mut trace = TraceStore::new();
        trace.record(0, TraceEntry::observe(var, Value::Primitive(first)));
        trace.record(1, TraceEntry::observe(var, Value::Primitive(second.clone())));

        let by_position = trace.assertions_by_position();
        prop_assert_eq!(trace.len(), 1);
        prop_assert!(!by_position.contains_key(&0));
        let expected = Assertion::from(PrimitiveAssertion::new(Some(var), second));
        prop_assert_eq!(
            by_position[&1].iter().collect::<Vec<_>>(),
            vec![&expected]
        );
    }

    /// Property: objects without public fields are asserted as a whole
    #[test]
    fn prop_opaque_object_yields_complex_assertion(hidden in any::<i64>()) {
        let tc = test_case_with(1);
        let var = tc.variable_at(0).unwrap();
        let object: Value = ObjectSnapshot::new("Opaque").with_field("_state", hidden).into();

        let assertions = TraceEntry::observe(var, object.clone()).get_assertions();

        prop_assert_eq!(assertions.len(), 1);
        prop_assert!(assertions.contains(&Assertion::from(ComplexAssertion::new(Some(var), object))));
    }
}
