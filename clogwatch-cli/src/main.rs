// clogwatch CLI - Clogging detection from the command line
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # clogwatch
//!
//! Train on nominal plant exports, then flag clogging in new ones.
//!
//! ## Usage
//!
//! ```bash
//! # Synthetic data to try it out
//! clogwatch generate --output nominal.csv --rows 2000
//! clogwatch generate --output clogged.csv --scenario clogging --seed 7
//!
//! # Fit scaler and model, stored under the threshold's key
//! clogwatch train --input nominal.csv --artifacts ./artifacts
//!
//! # Anomalous timestamps on stdout, full report as JSON
//! clogwatch detect --input clogged.csv --artifacts ./artifacts --output report.json
//! ```

mod commands;

use clap::{Parser, Subcommand};
use commands::{CliError, DetectArgs, GenerateArgs, TrainArgs};
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// Clogging anomaly detection for drying lines
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit scaler and autoencoder on nominal data
    Train(TrainArgs),
    /// Score a series and report anomalous timestamps
    Detect(DetectArgs),
    /// Write a synthetic drying line CSV
    Generate(GenerateArgs),
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Train(args) => {
            let diagnostics = commands::train(&args)?;
            println!("{}", serde_json::to_string_pretty(&diagnostics)?);
        }
        Command::Detect(args) => {
            let report = commands::detect(&args)?;
            print!("{}", commands::format_anomalies(&report));
        }
        Command::Generate(args) => {
            commands::generate(&args)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    info!("clogwatch v{}", env!("CARGO_PKG_VERSION"));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_train_with_negative_threshold() {
        let cli = Cli::try_parse_from([
            "clogwatch",
            "train",
            "--input",
            "a.csv",
            "--artifacts",
            "out",
            "--pressure-threshold",
            "-0.5",
            "--epochs",
            "10",
        ])
        .unwrap();
        match cli.command {
            Command::Train(args) => {
                assert_eq!(args.config.pressure_threshold, Some(-0.5));
                assert_eq!(args.epochs, Some(10));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_generate_defaults() {
        let cli = Cli::try_parse_from(["clogwatch", "generate", "--output", "x.csv"]).unwrap();
        match cli.command {
            Command::Generate(args) => {
                assert_eq!(args.rows, 1440);
                assert_eq!(args.scenario, "nominal");
                assert_eq!(args.seed, 42);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
