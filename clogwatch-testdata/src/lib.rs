// clogwatch testdata - Synthetic drying-line datasets
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # clogwatch testdata
//!
//! Synthetic plant series for exercising the clogging detector.
//!
//! - **Signal patterns**: constant, sine, mean-reverting random walk, sums
//! - **Anomaly injection**: clog blocks, spikes, drift, stuck sensors, dropouts
//! - **Plant presets**: the drying line's four channels
//!
//! ## Quick Start
//!
//! ```rust
//! use clogwatch_testdata::{generate_dataset, GeneratorConfig};
//! use clogwatch_testdata::industries::{create_drying_line_sensors, DryingLineScenario};
//!
//! let config = GeneratorConfig::new().with_num_samples(240).with_seed(42);
//! let sensors = create_drying_line_sensors(DryingLineScenario::Clogging, 240);
//! let dataset = generate_dataset(&config, &sensors);
//!
//! assert_eq!(dataset.len(), 240);
//! assert_eq!(dataset.metadata.anomalies.len(), 2);
//! let csv = dataset.to_csv_string().unwrap();
//! assert!(csv.starts_with("Date,"));
//! ```

pub mod anomalies;
pub mod dataset;
pub mod generator;
pub mod industries;
pub mod patterns;

// Re-exports for convenience
pub use anomalies::{AnomalyConfig, AnomalyType};
pub use dataset::{Dataset, DatasetError, DatasetRow, InjectedAnomaly};
pub use generator::{generate_dataset, GeneratorConfig, SensorConfig};
pub use patterns::SignalPattern;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
