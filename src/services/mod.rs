pub mod assertion_generator;
pub mod crossover;
pub mod fitness;
pub mod mutation;
pub mod output_variable_factory;
pub mod search_engine;
pub mod search_statistics;
pub mod selection;
pub mod stopping_condition;
pub mod test_factory;

pub use assertion_generator::{AssertionGenerator, AssertionReport, AssertionVerifier};
pub use crossover::SinglePointRelativeCrossover;
pub use fitness::{BranchDistanceFitness, CoverageFitness, SuiteFitnessFunction};
pub use mutation::SuiteMutation;
pub use search_engine::{GenerationSummary, SearchEngine, SearchOutcome};
pub use search_statistics::SearchStatistics;
pub use selection::{RankSelection, SelectionFunction, TournamentSelection};
pub use stopping_condition::{StopReason, StoppingCondition};
pub use test_factory::TestFactory;
