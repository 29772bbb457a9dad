//! SafePath CLI - Command-line interface
//!
//! Drives the SafePath route services from the command line: a scripted
//! planning session against the simulated planner, persisted-cache
//! inspection, and configuration management.

mod commands;
mod error;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use commands::simulate::SimulateArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(
    name = "safepath",
    version,
    about = "Route cache and prefetch engine for the SafePath navigation app"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a scripted route-planning session against the simulated planner
    Simulate(SimulateArgs),

    /// Inspect or clear the persisted route cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// View and modify configuration settings
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _log_guard = safepath::app::init_logging(cli.verbose, None);

    if let Err(err) = run(cli.command).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Simulate(args) => commands::simulate::run(args).await,
        Commands::Cache { action } => commands::cache::run(action).await,
        Commands::Config { action } => commands::config::run(action),
    }
}
