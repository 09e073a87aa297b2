//! Operator CLI.
//!
//! # Modules
//!
//! - [`command`]: clap definitions
//! - [`check`], [`simulate`], [`sweep`]: subcommand handlers
//! - [`output`]: styled and JSON output
//! - [`diagnostic`]: miette error presentation

pub mod check;
pub mod command;
pub mod diagnostic;
pub mod output;
pub mod simulate;
pub mod sweep;

use std::path::Path;

use self::command::{CheckCommand, Cli, Commands};
use self::diagnostic::ConfigDiagnostic;
use self::output::OutputConfig;
use crate::infrastructure::config::settings::Config;

/// Dispatch a parsed command line.
///
/// # Errors
///
/// Returns a diagnostic describing why the command failed.
pub async fn run(cli: Cli) -> miette::Result<()> {
    let flags = OutputConfig::new(cli.json, cli.quiet, cli.verbose);
    output::configure(flags);

    match cli.command {
        Commands::Check(CheckCommand::Config(arg)) => check::execute_config(&arg.path, flags),
        Commands::Simulate(args) => simulate::execute(args, flags).await,
        Commands::Sweep(arg) => sweep::execute(&arg.path, flags),
    }
}

/// Read and validate a configuration file.
pub(crate) fn load_config(path: &Path) -> Result<Config, ConfigDiagnostic> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigDiagnostic::unreadable(path, &e))?;
    Config::parse_toml(&content).map_err(|e| ConfigDiagnostic::from_error(path, &content, &e))
}

/// Install the tracing subscriber, letting `-q`/`-v` override the configured level.
pub(crate) fn init_logging(config: &Config, flags: OutputConfig) {
    match flags.log_level() {
        Some(level) => config.logging.init_with_level(level),
        None => config.logging.init(),
    }
}
