//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};

use crate::cli::commands::run::RunArgs;

#[derive(Parser)]
#[command(name = "suitegen")]
#[command(about = "suitegen - evolutionary unit test suite generation", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for a test suite covering a bundled target
    Run(RunArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "suitegen", "--json", "run", "--seed", "7", "--generations", "3", "--no-assertions",
        ])
        .unwrap();

        assert!(cli.json);
        let Commands::Run(args) = cli.command;
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.generations, Some(3));
        assert!(args.no_assertions);
    }
}
