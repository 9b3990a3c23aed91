//! nsvtrack CLI - command-line interface
//!
//! Runs tracking sessions against the simulated provider and manages the
//! configuration file.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use nsvtrack::logging::{init_logging, LoggingConfig};

use commands::common::load_config;
use commands::config::ConfigCommands;
use commands::track::TrackArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "nsvtrack", version, about = "Location tracking sessions")]
struct Cli {
    /// Config file (default: <config dir>/nsvtrack/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (overrides logging.level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Track a simulated walk and print position updates
    Track(TrackArgs),

    /// View or modify configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Track(args) => {
            let logging = logging_config(config_path, cli.verbose)?;
            let _guard = init_logging(&logging)?;
            commands::track::run(args, config_path)
        }
        Commands::Config(command) => commands::config::run(command, config_path),
    }
}

fn logging_config(
    config_path: Option<&std::path::Path>,
    verbose: bool,
) -> Result<LoggingConfig, CliError> {
    let logging = load_config(config_path)?.logging;
    Ok(if verbose {
        logging.with_level("debug")
    } else {
        logging
    })
}
