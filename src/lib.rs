//! # clogwatch - Clogging detection for industrial drying lines
//!
//! Reconstruction-error anomaly detection over plant sensor series
//! (two pressures, feed flow, product moisture).
//!
//! ## How it works
//!
//! - **Cleaning**: weekend rows are dropped, gaps forward-filled, the
//!   configured channels selected, and at training time outliers capped
//! - **Scaling**: a min-max scaler fitted on training data, persisted per
//!   configuration key
//! - **Reconstruction**: an autoencoder learns nominal windows of `n_past`
//!   steps; at inference the per-timestamp reconstruction error is folded
//!   from overlapping windows
//! - **Decision**: a timestamp is anomalous when both the trailing average
//!   error (AE) and the trailing share of high-error timestamps (DC) are
//!   above threshold
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{Duration, NaiveDate};
//! use clogwatch::{
//!     FeatureSchema, MemoryBackend, Pipeline, PipelineConfig, RawRow, RawSeries,
//! };
//!
//! let schema = FeatureSchema::default();
//! let channels: Vec<String> = schema.names().map(str::to_string).collect();
//! let start = NaiveDate::from_ymd_opt(2024, 2, 5).unwrap().and_hms_opt(8, 0, 0).unwrap();
//! let rows = (0..120)
//!     .map(|i| {
//!         let t = i as f64 * 0.1;
//!         RawRow::new(
//!             start + Duration::minutes(i),
//!             vec![Some(0.2 + 0.05 * t.sin()), Some(0.1), Some(8.0 + t.cos()), Some(3.0)],
//!         )
//!     })
//!     .collect();
//! let raw = RawSeries::new(channels, rows).unwrap();
//!
//! let mut config = PipelineConfig::default();
//! config.training.epochs = 3;
//! let mut pipeline = Pipeline::with_autoencoder(config, MemoryBackend::new()).unwrap();
//!
//! let diagnostics = pipeline.train(&raw).unwrap();
//! assert_eq!(diagnostics.windows, 120 - 6);
//!
//! let report = pipeline.infer(&raw).unwrap();
//! assert_eq!(report.points().len(), 119);
//! ```
//!
//! ## Modules
//!
//! - [`series`]: Raw and cleaned time series, feature schema
//! - [`calendar`]: Production-calendar row filter
//! - [`preprocess`]: Forward fill, feature selection, outlier caps
//! - [`scaler`]: Min-max scaling
//! - [`window`]: Time-lagged windows
//! - [`model`]: Sequence model contract and the dense autoencoder
//! - [`scoring`]: Per-timestamp reconstruction error
//! - [`classifier`]: AE/DC anomaly rule
//! - [`store`]: Scaler and model persistence
//! - [`loader`]: CSV loading
//! - [`pipeline`]: Training and inference entry points

// Modules
pub mod calendar;
pub mod classifier;
pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod preprocess;
pub mod scaler;
pub mod scoring;
pub mod series;
pub mod store;
pub mod window;

// Re-exports for convenient access
pub use classifier::{AnomalyClassifier, AnomalyEpisode, AnomalyReport, ClassifiedPoint};
pub use config::{
    ClassifierConfig, ConfigKey, PipelineConfig, RollingDivisor, TrainingConfig,
    DEFAULT_N_PAST, DEFAULT_PRESSURE_THRESHOLD,
};
pub use error::{ClogError, ComputationError, FormatError, Result, SchemaError, StoreError};
pub use loader::load_path;
pub use model::{AutoencoderTrainer, DenseAutoencoder, ModelTrainer, SequenceModel, TrainingHistory};
pub use pipeline::{Pipeline, TrainingDiagnostics};
pub use preprocess::{Cap, CleaningReport, OutlierCaps};
pub use scaler::MinMaxScaler;
pub use scoring::ErrorSeries;
pub use series::{Feature, FeatureRole, FeatureSchema, RawRow, RawSeries, Series};
pub use store::{ArtifactBackend, ArtifactStore, FileBackend, MemoryBackend};
pub use window::WindowSet;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_key() {
        assert_eq!(PipelineConfig::default().key().as_str(), "0_3");
    }
}
