//! Implementation of the `suitegen run` command.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::output::{output, CommandOutput, TableFormatter};
use crate::domain::errors::StatisticsError;
use crate::domain::models::{
    Chromosome, Config, StatisticsBackendKind, StatisticsConfig, TestCase,
};
use crate::domain::ports::StatisticsBackend;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::{LogConfig, LoggerImpl};
use crate::infrastructure::statistics::{backend_from_config, ConsoleStatisticsBackend};
use crate::infrastructure::targets;
use crate::services::{
    AssertionGenerator, AssertionReport, GenerationSummary, SearchEngine, SearchStatistics,
    StopReason,
};

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Configuration file (defaults to .suitegen/config.yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Bundled target to generate tests for
    #[arg(short, long)]
    pub target: Option<String>,

    /// Random seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Maximum number of generations
    #[arg(short, long)]
    pub generations: Option<usize>,

    /// Search time budget in seconds
    #[arg(long)]
    pub time_budget: Option<u64>,

    /// Population size
    #[arg(short, long)]
    pub population: Option<usize>,

    /// Directory for CSV statistics
    #[arg(long)]
    pub report_dir: Option<String>,

    /// Skip regression assertion generation
    #[arg(long)]
    pub no_assertions: bool,
}

impl RunArgs {
    /// Apply command-line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut Config) {
        if let Some(target) = &self.target {
            config.target.clone_from(target);
        }
        if let Some(seed) = self.seed {
            config.search.seed = Some(seed);
        }
        if let Some(generations) = self.generations {
            config.search.max_generations = Some(generations);
        }
        if let Some(secs) = self.time_budget {
            config.search.max_search_time_secs = Some(secs);
        }
        if let Some(population) = self.population {
            config.search.population_size = population;
        }
        if let Some(dir) = &self.report_dir {
            config.statistics.report_dir.clone_from(dir);
        }
    }
}

/// Result of `suitegen run`, printed as tables or JSON.
#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub success: bool,
    /// When the search started
    pub started_at: DateTime<Utc>,
    /// Name of the target under test
    pub target: String,
    /// Seed the search ran with; pass it to `--seed` to reproduce the run
    pub seed: u64,
    /// Generations evaluated, the initial population included
    pub generations: usize,
    /// Test case executions attempted
    pub evaluations: usize,
    pub stop_reason: StopReason,
    /// Coverage of the best suite
    pub coverage: f64,
    /// Fitness of the best suite
    pub fitness: f64,
    /// Test cases in the best suite
    pub test_case_count: usize,
    /// Statements in the best suite
    pub statement_count: usize,
    /// Faulting plus failed executions
    pub total_exceptions: usize,
    /// Wall-clock duration of the search
    pub elapsed_ms: u64,
    /// Outcome of assertion generation on the best suite
    pub assertions: AssertionReport,
    /// Whether the statistics backend received a row
    pub statistics_written: bool,
    /// Per-generation summaries
    pub history: Vec<GenerationSummary>,
    /// Test cases of the best suite, with their assertions
    pub test_cases: Vec<TestCase>,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let formatter = TableFormatter::new();
        let summary = formatter.format_summary(&[
            ("Target", self.target.clone()),
            ("Started", self.started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
            ("Seed", self.seed.to_string()),
            ("Generations", self.generations.to_string()),
            ("Evaluations", self.evaluations.to_string()),
            ("Stopped by", self.stop_reason.to_string()),
            ("Coverage", format!("{:.1}%", self.coverage * 100.0)),
            ("Fitness", format!("{:.4}", self.fitness)),
            ("Test cases", self.test_case_count.to_string()),
            ("Statements", self.statement_count.to_string()),
            ("Exceptions", self.total_exceptions.to_string()),
            ("Assertions", self.assertions.added.to_string()),
            ("Elapsed", format!("{} ms", self.elapsed_ms)),
        ]);

        let mut sections = vec![summary, formatter.format_generations(&self.history)];
        sections.extend(
            self.test_cases
                .iter()
                .enumerate()
                .map(|(i, tc)| formatter.format_test_case(i, tc)),
        );
        if self.assertions.unstable > 0 {
            sections.push(format!(
                "{} unstable assertion(s) discarded",
                self.assertions.unstable
            ));
        }
        sections.join("\n\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Statistics backend for this invocation. Console statistics move to stderr
/// in JSON mode so stdout carries a single document.
fn statistics_backend(config: &StatisticsConfig, json_mode: bool) -> Option<Box<dyn StatisticsBackend>> {
    if json_mode && config.backend == StatisticsBackendKind::Console {
        return Some(Box::new(ConsoleStatisticsBackend::with_writer(Box::new(std::io::stderr()))));
    }
    backend_from_config(config)
}

pub async fn execute(args: RunArgs, json_mode: bool) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    args.apply(&mut config);
    ConfigLoader::validate(&config).context("Invalid configuration after command-line overrides")?;

    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging)).context("Failed to initialize logging")?;

    let executor = targets::executor_for(&config.target)
        .with_context(|| format!("Unknown target '{}'", config.target))?;
    let mut engine = SearchEngine::new(Arc::clone(&executor), config.search.clone())
        .context("Failed to set up the search")?;
    let mut statistics = SearchStatistics::new(
        statistics_backend(&config.statistics, json_mode),
        &config.statistics,
        engine.seed(),
    );

    let started_at = Utc::now();
    let outcome = engine.run(&mut statistics).await.context("Search failed")?;

    let mut test_cases: Vec<TestCase> = outcome
        .best
        .test_cases()
        .iter()
        .map(|tc| tc.test_case().clone())
        .collect();
    let assertions = if args.no_assertions {
        AssertionReport::default()
    } else {
        AssertionGenerator::new(executor)
            .add_assertions_to_all(&mut test_cases)
            .await
    };

    let statistics_written = match statistics.write_statistics() {
        Ok(()) => true,
        Err(StatisticsError::NoBackend) => false,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to write statistics");
            false
        }
    };

    let output_data = RunOutput {
        success: true,
        started_at,
        target: config.target,
        seed: engine.seed(),
        generations: outcome.generations,
        evaluations: outcome.evaluations,
        stop_reason: outcome.stop_reason,
        coverage: outcome.best.coverage(),
        fitness: outcome.best.fitness(),
        test_case_count: outcome.best.size(),
        statement_count: outcome.best.total_length_of_test_cases(),
        total_exceptions: outcome.total_exceptions,
        elapsed_ms: u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX),
        assertions,
        statistics_written,
        history: engine.history().to_vec(),
        test_cases,
    };
    output(&output_data, json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_loaded_values() {
        let mut config = Config::default();
        let args = RunArgs {
            target: Some("calculator".to_string()),
            seed: Some(11),
            generations: Some(4),
            time_budget: Some(2),
            population: Some(6),
            report_dir: Some("out".to_string()),
            ..RunArgs::default()
        };

        args.apply(&mut config);

        assert_eq!(config.search.seed, Some(11));
        assert_eq!(config.search.max_generations, Some(4));
        assert_eq!(config.search.max_search_time_secs, Some(2));
        assert_eq!(config.search.population_size, 6);
        assert_eq!(config.statistics.report_dir, "out");
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut config = Config::default();
        let before = config.search.population_size;

        RunArgs::default().apply(&mut config);

        assert_eq!(config.search.population_size, before);
        assert_eq!(config.search.seed, None);
    }

    #[test]
    fn test_json_mode_keeps_console_statistics_off_stdout() {
        let config = StatisticsConfig::default();
        assert!(statistics_backend(&config, true).is_some());

        let none = StatisticsConfig {
            backend: StatisticsBackendKind::None,
            ..StatisticsConfig::default()
        };
        assert!(statistics_backend(&none, true).is_none());
    }
}
