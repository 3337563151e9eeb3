//! Random statement and test case generation against a target schema.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::errors::GenerationError;
use crate::domain::models::{
    CallableKind, CallableSpec, PrimitiveValue, SearchConfig, Statement, StatementKind,
    TargetSchema, TestCase, ValueType, VariableRef,
};

/// Probability of reusing an existing primitive variable instead of
/// creating a new literal.
const REUSE_PROBABILITY: f64 = 0.5;

/// Probability of drawing a small special constant (-1, 0, 1) for numbers.
const SPECIAL_CONSTANT_PROBABILITY: f64 = 0.1;

/// Builds statements and test cases for one target.
#[derive(Debug, Clone)]
pub struct TestFactory {
    schema: TargetSchema,
    max_recursion: usize,
    max_int: i64,
    max_delta: i64,
    string_length: usize,
}

impl TestFactory {
    pub fn new(schema: TargetSchema, config: &SearchConfig) -> Self {
        Self {
            schema,
            max_recursion: config.max_recursion,
            max_int: config.max_int.max(1),
            max_delta: config.max_delta.max(1),
            string_length: config.string_length,
        }
    }

    pub const fn schema(&self) -> &TargetSchema {
        &self.schema
    }

    /// A random test case with between one and `max_length` calls.
    pub fn random_test_case<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        max_length: usize,
    ) -> Result<TestCase, GenerationError> {
        if self.schema.callables.is_empty() {
            return Err(GenerationError::NoCallables);
        }

        let target_length = rng.gen_range(1..=max_length.max(1));
        let mut test_case = TestCase::new();
        let mut attempts = 0;
        while test_case.size() < target_length && attempts < target_length * 2 {
            attempts += 1;
            let position = test_case.size();
            if let Err(e) = self.insert_random_call(&mut test_case, position, rng) {
                tracing::debug!(error = %e, "skipping unsatisfiable call");
            }
        }
        Ok(test_case)
    }

    /// Insert a random call (and whatever it needs) at `position`.
    ///
    /// Returns how many statements were inserted. On failure the test case is
    /// left untouched.
    pub fn insert_random_call<R: Rng + ?Sized>(
        &self,
        test_case: &mut TestCase,
        position: usize,
        rng: &mut R,
    ) -> Result<usize, GenerationError> {
        let callable = self
            .schema
            .callables
            .choose(rng)
            .ok_or(GenerationError::NoCallables)?;

        let backup = test_case.clone();
        let position = position.min(test_case.size());
        match self.insert_callable(test_case, callable, position, 0, rng) {
            Ok(inserted) => Ok(inserted),
            Err(e) => {
                *test_case = backup;
                Err(e)
            }
        }
    }

    fn insert_callable<R: Rng + ?Sized>(
        &self,
        test_case: &mut TestCase,
        callable: &CallableSpec,
        mut position: usize,
        depth: usize,
        rng: &mut R,
    ) -> Result<usize, GenerationError> {
        let mut inserted = 0;

        let receiver = match &callable.kind {
            CallableKind::Method { owner } => {
                let owner_type = ValueType::Object(owner.clone());
                let (var, n) = self.resolve(test_case, &owner_type, position, depth, rng)?;
                position += n;
                inserted += n;
                Some(var)
            }
            CallableKind::Constructor { .. } | CallableKind::Function => None,
        };

        let mut args = Vec::with_capacity(callable.parameters.len());
        for parameter in &callable.parameters {
            let (var, n) = self.resolve(test_case, parameter, position, depth, rng)?;
            position += n;
            inserted += n;
            args.push(var);
        }

        test_case.insert_statement(
            position,
            Statement::call(callable.name.clone(), receiver, args, callable.returns.clone()),
        );
        Ok(inserted + 1)
    }

    /// Find or create a variable of type `ty` usable at `position`.
    fn resolve<R: Rng + ?Sized>(
        &self,
        test_case: &mut TestCase,
        ty: &ValueType,
        position: usize,
        depth: usize,
        rng: &mut R,
    ) -> Result<(VariableRef, usize), GenerationError> {
        let candidates = test_case.variables_of_type(ty, position);
        let reuse = !candidates.is_empty() && (!ty.is_primitive() || rng.gen_bool(REUSE_PROBABILITY));
        if reuse {
            if let Some(var) = candidates.choose(rng) {
                return Ok((*var, 0));
            }
        }

        match ty {
            ValueType::None => {
                let var = test_case.insert_statement(position, Statement::primitive(PrimitiveValue::None));
                Ok((var, 1))
            }
            ValueType::Bool | ValueType::Int | ValueType::Float | ValueType::Str => {
                let value = self.random_primitive(ty, rng);
                let var = test_case.insert_statement(position, Statement::primitive(value));
                Ok((var, 1))
            }
            ValueType::Object(type_name) => {
                if depth >= self.max_recursion {
                    return Err(GenerationError::Unsatisfiable(type_name.clone()));
                }
                let constructor = self
                    .schema
                    .constructor_for(type_name)
                    .ok_or_else(|| GenerationError::Unsatisfiable(type_name.clone()))?;
                let n = self.insert_callable(test_case, constructor, position, depth + 1, rng)?;
                let var = test_case
                    .variable_at(position + n - 1)
                    .ok_or_else(|| GenerationError::Unsatisfiable(type_name.clone()))?;
                Ok((var, n))
            }
        }
    }

    /// A random literal of a primitive type.
    #[allow(clippy::cast_precision_loss)]
    pub fn random_primitive<R: Rng + ?Sized>(&self, ty: &ValueType, rng: &mut R) -> PrimitiveValue {
        let special = rng.gen_bool(SPECIAL_CONSTANT_PROBABILITY);
        match ty {
            ValueType::Bool => PrimitiveValue::Bool(rng.gen_bool(0.5)),
            ValueType::Int if special => PrimitiveValue::Int(rng.gen_range(-1..=1)),
            ValueType::Int => PrimitiveValue::Int(rng.gen_range(-self.max_int..=self.max_int)),
            ValueType::Float if special => PrimitiveValue::Float(f64::from(rng.gen_range(-1_i32..=1))),
            ValueType::Float => {
                let bound = self.max_int as f64;
                PrimitiveValue::Float(rng.gen_range(-bound..=bound))
            }
            ValueType::Str => {
                let length = rng.gen_range(0..=self.string_length);
                PrimitiveValue::Str((0..length).map(|_| rng.gen_range(b'a'..=b'z') as char).collect())
            }
            ValueType::None | ValueType::Object(_) => PrimitiveValue::None,
        }
    }

    /// A small random change of `value`.
    #[allow(clippy::cast_precision_loss)]
    pub fn perturb<R: Rng + ?Sized>(&self, value: &PrimitiveValue, rng: &mut R) -> PrimitiveValue {
        match value {
            PrimitiveValue::None => PrimitiveValue::None,
            PrimitiveValue::Bool(b) => PrimitiveValue::Bool(!b),
            PrimitiveValue::Int(v) => PrimitiveValue::Int(v.saturating_add(self.delta(rng))),
            PrimitiveValue::Float(v) => match rng.gen_range(0..3) {
                0 => PrimitiveValue::Float(v + self.max_delta as f64 * rng.gen_range(-1.0..=1.0)),
                1 => PrimitiveValue::Float(v + self.delta(rng) as f64),
                _ => {
                    let scale = 10_f64.powi(rng.gen_range(0..=7));
                    PrimitiveValue::Float((v * scale).round() / scale)
                }
            },
            PrimitiveValue::Str(s) => PrimitiveValue::Str(self.perturb_string(s, rng)),
        }
    }

    fn delta<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        match rng.gen_range(-self.max_delta..=self.max_delta) {
            0 => 1,
            d => d,
        }
    }

    fn perturb_string<R: Rng + ?Sized>(&self, value: &str, rng: &mut R) -> String {
        let mut chars: Vec<char> = value.chars().collect();
        let letter = rng.gen_range(b'a'..=b'z') as char;
        match rng.gen_range(0..3) {
            0 if !chars.is_empty() => {
                let index = rng.gen_range(0..chars.len());
                chars.remove(index);
            }
            1 if !chars.is_empty() => {
                let index = rng.gen_range(0..chars.len());
                chars[index] = letter;
            }
            _ if chars.len() < self.string_length.max(1) => {
                let index = rng.gen_range(0..=chars.len());
                chars.insert(index, letter);
            }
            _ => {}
        }
        chars.into_iter().collect()
    }

    /// Change the statement at `position`: perturb a literal, or point one
    /// argument of a call at another variable of the same type.
    pub fn change_statement<R: Rng + ?Sized>(
        &self,
        test_case: &mut TestCase,
        position: usize,
        rng: &mut R,
    ) -> bool {
        let Some(statement) = test_case.statement(position) else {
            return false;
        };

        match statement.kind() {
            StatementKind::Primitive(value) => {
                let perturbed = self.perturb(value, rng);
                if let Some(StatementKind::Primitive(v)) =
                    test_case.statement_mut(position).map(Statement::kind_mut)
                {
                    *v = perturbed;
                    return true;
                }
                false
            }
            StatementKind::Call { args, .. } => {
                if args.is_empty() {
                    return false;
                }
                let index = rng.gen_range(0..args.len());
                let current = args[index];
                let Some(arg_type) = test_case
                    .statement(current.position())
                    .map(|s| s.return_type().clone())
                else {
                    return false;
                };
                let alternatives: Vec<VariableRef> = test_case
                    .variables_of_type(&arg_type, position)
                    .into_iter()
                    .filter(|v| *v != current)
                    .collect();
                let Some(replacement) = alternatives.choose(rng).copied() else {
                    return false;
                };
                if let Some(StatementKind::Call { args, .. }) =
                    test_case.statement_mut(position).map(Statement::kind_mut)
                {
                    args[index] = replacement;
                    return true;
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn schema() -> TargetSchema {
        TargetSchema {
            module: "calc".to_string(),
            callables: vec![
                CallableSpec::constructor("Calc", vec![]),
                CallableSpec::method(
                    "Calc",
                    "add",
                    vec![ValueType::Float, ValueType::Float],
                    ValueType::Float,
                ),
            ],
        }
    }

    fn factory() -> TestFactory {
        TestFactory::new(schema(), &SearchConfig::default())
    }

    fn assert_well_formed(test_case: &TestCase) {
        for (position, statement) in test_case.statements().iter().enumerate() {
            for var in statement.references() {
                assert!(var.position() < position, "forward reference in {statement}");
                assert_eq!(var.test_case(), test_case.id());
            }
        }
    }

    #[test]
    fn test_random_test_case_is_well_formed() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..20 {
            let tc = factory().random_test_case(&mut rng, 10).unwrap();
            assert!(!tc.is_empty());
            assert_well_formed(&tc);
        }
    }

    #[test]
    fn test_method_call_gets_receiver_constructed() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let factory = factory();
        let add = factory.schema().callable("add").unwrap().clone();
        let mut tc = TestCase::new();

        let inserted = factory.insert_callable(&mut tc, &add, 0, 0, &mut rng).unwrap();

        assert_eq!(inserted, tc.size());
        assert!(matches!(
            tc.statement(0).map(Statement::kind),
            Some(StatementKind::Call { callable, .. }) if callable == "Calc"
        ));
        assert_well_formed(&tc);
    }

    #[test]
    fn test_insert_in_middle_keeps_references_valid() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let factory = factory();
        let mut tc = factory.random_test_case(&mut rng, 6).unwrap();
        for _ in 0..10 {
            let position = rng.gen_range(0..=tc.size());
            let _ = factory.insert_random_call(&mut tc, position, &mut rng);
            assert_well_formed(&tc);
        }
    }

    #[test]
    fn test_unsatisfiable_object_leaves_test_case_untouched() {
        let schema = TargetSchema {
            module: "m".to_string(),
            callables: vec![CallableSpec::method("Ghost", "boo", vec![], ValueType::None)],
        };
        let factory = TestFactory::new(schema, &SearchConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut tc = TestCase::new();
        tc.add_statement(Statement::primitive(PrimitiveValue::Int(1)));

        let result = factory.insert_random_call(&mut tc, 1, &mut rng);

        assert_eq!(result, Err(GenerationError::Unsatisfiable("Ghost".to_string())));
        assert_eq!(tc.size(), 1);
    }

    #[test]
    fn test_perturb_changes_value() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let factory = factory();
        assert_eq!(
            factory.perturb(&PrimitiveValue::Bool(true), &mut rng),
            PrimitiveValue::Bool(false)
        );
        assert_ne!(
            factory.perturb(&PrimitiveValue::Int(5), &mut rng),
            PrimitiveValue::Int(5)
        );
    }

    #[test]
    fn test_no_callables_is_an_error() {
        let factory = TestFactory::new(
            TargetSchema {
                module: "empty".to_string(),
                callables: vec![],
            },
            &SearchConfig::default(),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(
            factory.random_test_case(&mut rng, 5).unwrap_err(),
            GenerationError::NoCallables
        );
    }
}
