//! Factories deriving output variables from the best individual.

use std::collections::BTreeMap;

use crate::domain::models::{
    Chromosome, OutputValue, OutputVariable, RuntimeVariable, TestSuiteChromosome,
};

type Extractor = fn(&TestSuiteChromosome) -> OutputValue;

/// Computes one scalar variable from a suite.
#[derive(Debug, Clone, Copy)]
pub struct ChromosomeOutputVariableFactory {
    variable: RuntimeVariable,
    extract: Extractor,
}

impl ChromosomeOutputVariableFactory {
    pub const fn new(variable: RuntimeVariable, extract: Extractor) -> Self {
        Self { variable, extract }
    }

    pub const fn variable(&self) -> RuntimeVariable {
        self.variable
    }

    pub fn get_variable(&self, individual: &TestSuiteChromosome) -> OutputVariable {
        OutputVariable::new(self.variable.name(), (self.extract)(individual))
    }
}

/// Where a sequence gets its values from.
#[derive(Debug, Clone, Copy)]
enum SequenceSource {
    /// Sampled from the best individual every generation.
    Derived(Extractor),
    /// Only fed through explicitly set values.
    Direct,
}

/// Accumulates one value per generation.
#[derive(Debug, Clone)]
pub struct SequenceOutputVariableFactory {
    variable: RuntimeVariable,
    source: SequenceSource,
    values: Vec<OutputValue>,
}

impl SequenceOutputVariableFactory {
    pub const fn derived(variable: RuntimeVariable, extract: Extractor) -> Self {
        Self {
            variable,
            source: SequenceSource::Derived(extract),
            values: Vec::new(),
        }
    }

    pub const fn direct(variable: RuntimeVariable) -> Self {
        Self {
            variable,
            source: SequenceSource::Direct,
            values: Vec::new(),
        }
    }

    pub const fn variable(&self) -> RuntimeVariable {
        self.variable
    }

    /// Sample `individual`; direct sequences ignore it.
    pub fn update(&mut self, individual: &TestSuiteChromosome) {
        if let SequenceSource::Derived(extract) = self.source {
            self.values.push(extract(individual));
        }
    }

    /// Append an explicitly set value.
    pub fn set_value(&mut self, value: OutputValue) {
        self.values.push(value);
    }

    pub fn values(&self) -> &[OutputValue] {
        &self.values
    }

    /// One variable per recorded value: `Name_1`, `Name_2`, ...
    pub fn get_output_variables(&self) -> Vec<OutputVariable> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, value)| OutputVariable::new(format!("{}_{}", self.variable.name(), i + 1), value.clone()))
            .collect()
    }
}

/// Scalar factories registered by default.
pub fn chromosome_factories() -> BTreeMap<RuntimeVariable, ChromosomeOutputVariableFactory> {
    [
        ChromosomeOutputVariableFactory::new(RuntimeVariable::Length, |s| {
            s.total_length_of_test_cases().into()
        }),
        ChromosomeOutputVariableFactory::new(RuntimeVariable::Size, |s| s.size().into()),
        ChromosomeOutputVariableFactory::new(RuntimeVariable::Coverage, |s| s.coverage().into()),
        ChromosomeOutputVariableFactory::new(RuntimeVariable::Fitness, |s| s.fitness().into()),
    ]
    .into_iter()
    .map(|f| (f.variable(), f))
    .collect()
}

/// Sequence factories registered by default.
pub fn sequence_factories() -> BTreeMap<RuntimeVariable, SequenceOutputVariableFactory> {
    [
        SequenceOutputVariableFactory::derived(RuntimeVariable::CoverageTimeline, |s| {
            s.coverage().into()
        }),
        SequenceOutputVariableFactory::derived(RuntimeVariable::SizeTimeline, |s| s.size().into()),
        SequenceOutputVariableFactory::derived(RuntimeVariable::LengthTimeline, |s| {
            s.total_length_of_test_cases().into()
        }),
        SequenceOutputVariableFactory::derived(RuntimeVariable::FitnessTimeline, |s| {
            s.fitness().into()
        }),
        SequenceOutputVariableFactory::direct(RuntimeVariable::TotalExceptionsTimeline),
    ]
    .into_iter()
    .map(|f| (f.variable(), f))
    .collect()
}
