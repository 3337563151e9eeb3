use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::RuntimeVariable;
use crate::infrastructure::targets;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid population_size: {0}. Must be at least 1")]
    InvalidPopulationSize(usize),

    #[error("Invalid elite_count: {0}. Must be between 1 and population_size ({1})")]
    InvalidEliteCount(usize, usize),

    #[error("Invalid probability for {0}: {1}. Must be between 0 and 1")]
    InvalidProbability(&'static str, f64),

    #[error("Invalid rank_bias: {0}. Must be between 1 and 2")]
    InvalidRankBias(f64),

    #[error("Invalid evaluation_workers: {0}. Must be at least 1")]
    InvalidWorkers(usize),

    #[error("Invalid initial test range: min {0} exceeds max {1}")]
    InvalidInitialTests(usize, usize),

    #[error("No search budget: set max_generations or max_search_time_secs")]
    UnboundedSearch,

    #[error("Unknown target: {0}. Available: {1}")]
    UnknownTarget(String, String),

    #[error("Unknown output variable: {0}")]
    UnknownOutputVariable(String),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .suitegen/config.yaml (project config)
    /// 3. .suitegen/local.yaml (project local overrides, optional)
    /// 4. Environment variables (SUITEGEN_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".suitegen/config.yaml"))
            .merge(Yaml::file(".suitegen/local.yaml"))
            .merge(Env::prefixed("SUITEGEN_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("SUITEGEN_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if !targets::TARGET_NAMES.contains(&config.target.as_str()) {
            return Err(ConfigError::UnknownTarget(
                config.target.clone(),
                targets::TARGET_NAMES.join(", "),
            ));
        }

        let search = &config.search;
        if search.population_size == 0 {
            return Err(ConfigError::InvalidPopulationSize(search.population_size));
        }

        if search.elite_count == 0 || search.elite_count > search.population_size {
            return Err(ConfigError::InvalidEliteCount(
                search.elite_count,
                search.population_size,
            ));
        }

        let probabilities = [
            ("crossover_rate", search.crossover_rate),
            ("target_coverage", search.target_coverage),
            ("test_insertion_probability", search.test_insertion_probability),
            (
                "statement_insertion_probability",
                search.statement_insertion_probability,
            ),
            ("test_delete_probability", search.test_delete_probability),
            ("test_change_probability", search.test_change_probability),
            ("test_insert_probability", search.test_insert_probability),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability(name, value));
            }
        }

        if !(1.0..=2.0).contains(&search.rank_bias) {
            return Err(ConfigError::InvalidRankBias(search.rank_bias));
        }

        if search.evaluation_workers == 0 {
            return Err(ConfigError::InvalidWorkers(search.evaluation_workers));
        }

        if search.min_initial_tests > search.max_initial_tests {
            return Err(ConfigError::InvalidInitialTests(
                search.min_initial_tests,
                search.max_initial_tests,
            ));
        }

        if search.max_generations.is_none() && search.max_search_time_secs.is_none() {
            return Err(ConfigError::UnboundedSearch);
        }

        if search.chromosome_length == 0 || search.max_suite_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "chromosome_length and max_suite_size must be at least 1".to_string(),
            ));
        }

        if let Some(names) = config.statistics.requested_variables() {
            for name in names {
                let known = name.parse::<RuntimeVariable>().is_ok()
                    || RuntimeVariable::parse_sequence_entry(&name).is_some();
                if !known && !config.statistics.skip_missing {
                    return Err(ConfigError::UnknownOutputVariable(name));
                }
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::config::{FitnessKind, SelectionKind, StatisticsBackendKind};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.target, "calculator");
        assert_eq!(config.search.population_size, 50);
        assert_eq!(config.search.fitness, FitnessKind::BranchDistance);
        assert_eq!(config.statistics.backend, StatisticsBackendKind::Console);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
target: calculator
search:
  population_size: 20
  selection: tournament
  tournament_size: 3
  fitness: coverage
  max_generations: 10
  seed: 99
statistics:
  backend: csv
  output_variables: Coverage,CoverageTimeline
  report_dir: out
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.search.population_size, 20);
        assert_eq!(config.search.selection, SelectionKind::Tournament);
        assert_eq!(config.search.tournament_size, 3);
        assert_eq!(config.search.fitness, FitnessKind::Coverage);
        assert_eq!(config.search.max_generations, Some(10));
        assert_eq!(config.search.seed, Some(99));
        assert_eq!(config.search.elite_count, 1, "unset fields keep defaults");
        assert_eq!(config.statistics.backend, StatisticsBackendKind::Csv);
        assert_eq!(config.statistics.report_dir, "out");
        assert_eq!(config.logging.format, "json");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_zero_population() {
        let mut config = Config::default();
        config.search.population_size = 0;

        let result = ConfigLoader::validate(&config);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidPopulationSize(0)
        ));
    }

    #[test]
    fn test_validate_elite_count() {
        let mut config = Config::default();
        config.search.population_size = 4;
        config.search.elite_count = 5;

        let result = ConfigLoader::validate(&config);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidEliteCount(5, 4)
        ));
    }

    #[test]
    fn test_validate_zero_elite_count() {
        let mut config = Config::default();
        config.search.elite_count = 0;

        let result = ConfigLoader::validate(&config);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidEliteCount(0, 50)
        ));
    }

    #[test]
    fn test_validate_probability_range() {
        let mut config = Config::default();
        config.search.crossover_rate = 1.5;

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidProbability(name, value) => {
                assert_eq!(name, "crossover_rate");
                assert!((value - 1.5).abs() < f64::EPSILON);
            }
            other => panic!("Expected InvalidProbability, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rank_bias() {
        let mut config = Config::default();
        config.search.rank_bias = 2.5;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidRankBias(_)
        ));
    }

    #[test]
    fn test_validate_zero_workers() {
        let mut config = Config::default();
        config.search.evaluation_workers = 0;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidWorkers(0)
        ));
    }

    #[test]
    fn test_validate_unbounded_search() {
        let mut config = Config::default();
        config.search.max_generations = None;
        config.search.max_search_time_secs = None;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::UnboundedSearch
        ));
    }

    #[test]
    fn test_validate_unknown_target() {
        let config = Config {
            target: "spreadsheet".to_string(),
            ..Default::default()
        };

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::UnknownTarget(name, available) => {
                assert_eq!(name, "spreadsheet");
                assert!(available.contains("calculator"));
            }
            other => panic!("Expected UnknownTarget, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_output_variables() {
        let mut config = Config::default();
        config.statistics.output_variables = "Coverage,CoverageTimeline_2,Size".to_string();
        assert!(ConfigLoader::validate(&config).is_ok());

        config.statistics.output_variables = "Coverage_2".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::UnknownOutputVariable(name) if name == "Coverage_2"
        ));

        config.statistics.output_variables = "Coverage,Bogus".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::UnknownOutputVariable(name) if name == "Bogus"
        ));

        config.statistics.skip_missing = true;
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            _ => panic!("Expected InvalidLogLevel error"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogFormat(format) => assert_eq!(format, "xml"),
            _ => panic!("Expected InvalidLogFormat error"),
        }
    }

    #[test]
    fn test_env_override() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "search:\n  population_size: 8\n  elite_count: 2").unwrap();
        file.flush().unwrap();

        temp_env::with_vars(
            [
                ("SUITEGEN_SEARCH__POPULATION_SIZE", Some("12")),
                ("SUITEGEN_LOGGING__LEVEL", Some("debug")),
            ],
            || {
                let config = ConfigLoader::load_from_file(file.path()).unwrap();
                assert_eq!(config.search.population_size, 12, "env beats file");
                assert_eq!(config.search.elite_count, 2, "file beats defaults");
                assert_eq!(config.logging.level, "debug");
            },
        );
    }

    #[test]
    fn test_hierarchical_merging() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "search:\n  population_size: 5\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "search:\n  population_size: 15\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.search.population_size, 15, "Override should win");
        assert_eq!(
            config.logging.level, "debug",
            "Override should win for nested fields"
        );
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
    }
}
