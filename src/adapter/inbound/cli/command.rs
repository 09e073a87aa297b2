//! Command-line interface definitions.
//!
//! Defines the operator CLI using `clap`: configuration checks, a dry-run
//! confirm-and-execute cycle against paper collaborators, and one-shot
//! cleanup of expired store entries.

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

/// Confirmation and concurrency-safe execution pipeline for swap quotes
#[derive(Parser, Debug)]
#[command(name = "swapguard")]
#[command(version, about)]
pub struct Cli {
    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),

    /// Open a confirmation and race concurrent executions against paper collaborators
    Simulate(SimulateArgs),

    /// Delete expired confirmations, leases and rate limit windows
    Sweep(ConfigPathArg),
}

/// Subcommands for `swapguard check`.
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate the configuration file syntax and values.
    Config(ConfigPathArg),
}

/// Shared argument for commands that take only a configuration path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to the configuration file.
    #[arg(default_value = "config.toml")]
    pub path: PathBuf,
}

/// Arguments for the `simulate` subcommand.
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Configuration file; defaults apply when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Amount of the asset to buy.
    #[arg(long, default_value = "0.5")]
    pub amount: Decimal,

    /// Asset to buy.
    #[arg(long, default_value = "SOL")]
    pub asset: String,

    /// Subject the confirmation belongs to.
    #[arg(long, default_value = "operator")]
    pub subject: String,

    /// Concurrent execute calls racing for the same confirmation.
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(u16).range(1..=64))]
    pub concurrency: u16,

    /// Simulated executor latency in milliseconds.
    #[arg(long, default_value = "50")]
    pub latency_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use rust_decimal_macros::dec;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_name() {
        assert_eq!(Cli::command().get_name(), "swapguard");
    }

    #[test]
    fn simulate_defaults() {
        let cli = Cli::try_parse_from(["swapguard", "simulate"]).unwrap();
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.amount, dec!(0.5));
        assert_eq!(args.asset, "SOL");
        assert_eq!(args.concurrency, 2);
        assert!(args.config.is_none());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["swapguard", "sweep", "state.toml", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        let Commands::Sweep(arg) = cli.command else {
            panic!("expected sweep");
        };
        assert_eq!(arg.path, PathBuf::from("state.toml"));
    }

    #[test]
    fn check_config_defaults_path() {
        let cli = Cli::try_parse_from(["swapguard", "check", "config"]).unwrap();
        let Commands::Check(CheckCommand::Config(arg)) = cli.command else {
            panic!("expected check config");
        };
        assert_eq!(arg.path, PathBuf::from("config.toml"));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        assert!(Cli::try_parse_from(["swapguard", "simulate", "--concurrency", "0"]).is_err());
    }
}
