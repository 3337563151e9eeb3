//! suitegen CLI entry point.

use clap::Parser;

use suitegen::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => suitegen::cli::commands::run::execute(args, cli.json).await,
    };

    if let Err(err) = result {
        suitegen::cli::handle_error(err, cli.json);
    }
}
