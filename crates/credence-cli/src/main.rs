//! # credence CLI entry point
//!
//! Parses command-line arguments, installs the tracing subscriber and
//! dispatches to the subcommand handlers in the library.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use credence_cli::keys::{run_keygen, KeygenArgs};
use credence_cli::signing::{run_sign, SignArgs};
use credence_cli::simulate::{run_simulate, SimulateArgs};

/// Credence: credit scoring and loan lifecycle engine.
///
/// Generates signing keys, signs requests, and replays scenarios against an
/// in-memory engine.
#[derive(Parser, Debug)]
#[command(name = "credence", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    /// Ignored when RUST_LOG is set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines on standard error.
    #[arg(long, global = true)]
    json_logs: bool,

    /// Engine configuration file (YAML). Falls back to $CREDENCE_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an Ed25519 signing key, or derive one from a seed.
    Keygen(KeygenArgs),

    /// Sign a request payload.
    Sign(SignArgs),

    /// Replay a scenario and print committed events as JSON lines.
    Simulate(SimulateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let result = match &cli.command {
        Commands::Keygen(args) => run_keygen(args),
        Commands::Sign(args) => run_sign(args),
        Commands::Simulate(args) => run_simulate(args, cli.config.as_deref()),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: u8, json: bool) {
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simulate_with_global_flags() {
        let cli = Cli::try_parse_from([
            "credence",
            "simulate",
            "scenario.yaml",
            "--config",
            "engine.yaml",
            "--json-logs",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.json_logs);
        assert_eq!(cli.config, Some(PathBuf::from("engine.yaml")));
        match cli.command {
            Commands::Simulate(args) => {
                assert_eq!(args.scenario, PathBuf::from("scenario.yaml"));
                assert!(!args.fail_fast);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parse_sign() {
        let cli = Cli::try_parse_from([
            "credence", "sign", "-", "--signer", "bureau", "--seed", "00",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Sign(ref a) if a.signer == "bureau"));
    }

    #[test]
    fn sign_requires_a_signer() {
        assert!(Cli::try_parse_from(["credence", "sign", "p.json", "--seed", "00"]).is_err());
    }

    #[test]
    fn parse_keygen_without_seed() {
        let cli = Cli::try_parse_from(["credence", "keygen"]).unwrap();
        assert!(matches!(cli.command, Commands::Keygen(ref a) if a.seed.is_none()));
    }
}
