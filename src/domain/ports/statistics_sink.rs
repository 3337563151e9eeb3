use crate::domain::models::{Chromosome, OutputValue, RuntimeVariable};

/// What the search engine reports to while it runs.
///
/// Only the engine's control task writes to a sink, so implementations need
/// no internal synchronisation.
pub trait StatisticsSink: Send {
    /// Called once per generation with that generation's best individual.
    fn current_individual(&mut self, individual: &dyn Chromosome);

    /// Set a runtime variable directly.
    fn set_output_variable_for_runtime_variable(
        &mut self,
        variable: RuntimeVariable,
        value: OutputValue,
    );
}

/// A sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStatisticsSink;

impl StatisticsSink for NullStatisticsSink {
    fn current_individual(&mut self, _individual: &dyn Chromosome) {}

    fn set_output_variable_for_runtime_variable(
        &mut self,
        _variable: RuntimeVariable,
        _value: OutputValue,
    ) {
    }
}
