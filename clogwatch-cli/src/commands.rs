// clogwatch CLI - Subcommands
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! `train`, `detect` and `generate`.

use chrono::NaiveDateTime;
use clap::Args;
use clogwatch::{
    AnomalyReport, ClogError, FileBackend, Pipeline, PipelineConfig, TrainingDiagnostics,
};
use clogwatch_testdata::industries::{create_drying_line_sensors, DryingLineScenario};
use clogwatch_testdata::{generate_dataset, Dataset, DatasetError, GeneratorConfig};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Timestamp format for CLI input and output.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// CLI error types.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Clog(#[from] ClogError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Options shared by `train` and `detect`.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// JSON pipeline configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Pressure floor for outlier capping; selects the artifact key
    #[arg(long, allow_hyphen_values = true)]
    pub pressure_threshold: Option<f64>,

    /// Window length in time steps
    #[arg(long)]
    pub n_past: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Nominal operation CSV
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory holding scaler and model artifacts
    #[arg(short, long)]
    pub artifacts: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Training epochs
    #[arg(long)]
    pub epochs: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
    /// CSV to score
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory holding scaler and model artifacts
    #[arg(short, long)]
    pub artifacts: PathBuf,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Write the full report as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// CSV file to write
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of one-minute samples
    #[arg(long, default_value = "1440")]
    pub rows: usize,

    /// nominal, clogging or dropout
    #[arg(long, default_value = "nominal")]
    pub scenario: String,

    /// Random seed
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// First timestamp (YYYY-MM-DD HH:MM:SS)
    #[arg(long)]
    pub start: Option<String>,

    /// Write injected anomaly ground truth as JSON
    #[arg(long)]
    pub truth: Option<PathBuf>,
}

/// Resolve the pipeline configuration: file (or defaults), then flags.
pub fn resolve_config(args: &ConfigArgs) -> Result<PipelineConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => {
            let text = read_text(path)?;
            serde_json::from_str(&text).map_err(|source| CliError::Config {
                path: path.clone(),
                source,
            })?
        }
        None => PipelineConfig::default(),
    };

    if let Some(threshold) = args.pressure_threshold {
        config.pressure_threshold = threshold;
    }
    if let Some(n_past) = args.n_past {
        config.n_past = n_past;
    }
    Ok(config)
}

pub fn train(args: &TrainArgs) -> Result<TrainingDiagnostics, CliError> {
    let mut config = resolve_config(&args.config)?;
    if let Some(epochs) = args.epochs {
        config.training.epochs = epochs;
    }

    let raw = clogwatch::load_path(&args.input, &config.schema)?;
    let mut pipeline = Pipeline::with_autoencoder(config, FileBackend::new(&args.artifacts))?;
    if pipeline.is_trained() {
        warn!(
            "Overwriting artifacts for key '{}' in {}",
            pipeline.key(),
            args.artifacts.display()
        );
    }

    let diagnostics = pipeline.train(&raw)?;
    info!(
        "Trained key '{}': {} windows, final loss {:?}",
        diagnostics.key,
        diagnostics.windows,
        diagnostics.history.final_train_loss()
    );
    Ok(diagnostics)
}

pub fn detect(args: &DetectArgs) -> Result<AnomalyReport, CliError> {
    let config = resolve_config(&args.config)?;
    let raw = clogwatch::load_path(&args.input, &config.schema)?;
    let pipeline = Pipeline::with_autoencoder(config, FileBackend::new(&args.artifacts))?;

    let report = pipeline.infer(&raw)?;
    info!(
        "{} of {} timestamps anomalous in {} episode(s)",
        report.anomaly_count(),
        report.points().len(),
        report.episodes().len()
    );

    if let Some(path) = &args.output {
        write_text(path, &serde_json::to_string_pretty(&report)?)?;
        info!("Report written to {}", path.display());
    }
    Ok(report)
}

pub fn generate(args: &GenerateArgs) -> Result<Dataset, CliError> {
    let scenario: DryingLineScenario = args.scenario.parse().map_err(CliError::InvalidArgument)?;

    let mut config = GeneratorConfig::new()
        .with_num_samples(args.rows)
        .with_seed(args.seed);
    if let Some(start) = &args.start {
        let start = NaiveDateTime::parse_from_str(start, TIME_FORMAT)
            .map_err(|e| CliError::InvalidArgument(format!("--start '{}': {}", start, e)))?;
        config = config.with_start(start);
    }

    let dataset = generate_dataset(&config, &create_drying_line_sensors(scenario, args.rows))
        .with_name(scenario.as_str());
    dataset.to_csv(&args.output)?;
    info!(
        "Wrote {} {} rows to {}",
        dataset.len(),
        scenario.as_str(),
        args.output.display()
    );

    if let Some(path) = &args.truth {
        write_text(path, &dataset.metadata_json()?)?;
    }
    Ok(dataset)
}

/// One line per anomalous timestamp.
pub fn format_anomalies(report: &AnomalyReport) -> String {
    report
        .anomaly_timestamps()
        .iter()
        .map(|t| format!("{}\n", t.format(TIME_FORMAT)))
        .collect()
}

fn read_text(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_text(path: &Path, text: &str) -> Result<(), CliError> {
    std::fs::write(path, text).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}
