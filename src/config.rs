// clogwatch - Clogging anomaly detection for drying lines
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Pipeline configuration.
//!
//! All thresholds and caps live here as defaults instead of being spread
//! through the stages. Every struct round-trips through JSON so the CLI can
//! read a config file.

use crate::error::{ComputationError, Result};
use crate::preprocess::OutlierCaps;
use crate::series::FeatureSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default lower bound for pressure readings (bar)
pub const DEFAULT_PRESSURE_THRESHOLD: f64 = -0.3;

/// Default window length in timesteps
pub const DEFAULT_N_PAST: usize = 6;

/// Identifier of a trained configuration.
///
/// Derived from the pressure threshold: absolute value with the decimal
/// point replaced by `_`, so `-0.3` becomes `0_3`. Scalers and models are
/// persisted and looked up under this key only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigKey(String);

impl ConfigKey {
    pub fn from_threshold(threshold: f64) -> Self {
        Self(format!("{}", threshold.abs()).replace('.', "_"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Training parameters for the reconstruction model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Passes over the training windows.
    pub epochs: usize,

    /// Windows per gradient step.
    pub batch_size: usize,

    /// Adam step size.
    pub learning_rate: f64,

    /// Fraction of windows (taken from the end) held out for validation.
    pub validation_split: f64,

    /// Width of the two tanh layers.
    pub hidden_units: usize,

    /// Width of the bottleneck.
    pub latent_units: usize,

    /// Seed for weight init and shuffling.
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 60,
            batch_size: 32,
            learning_rate: 0.005,
            validation_split: 0.1,
            hidden_units: 16,
            latent_units: 8,
            seed: 42,
        }
    }
}

impl TrainingConfig {
    /// Reject values training cannot run with.
    pub fn validate(&self) -> Result<()> {
        let reason = if self.epochs == 0 {
            Some("epochs must be at least 1".to_string())
        } else if self.batch_size == 0 {
            Some("batch_size must be at least 1".to_string())
        } else if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            Some(format!("learning_rate must be positive, got {}", self.learning_rate))
        } else if !(0.0..1.0).contains(&self.validation_split) {
            Some(format!(
                "validation_split must be in [0, 1), got {}",
                self.validation_split
            ))
        } else if self.hidden_units == 0 || self.latent_units == 0 {
            Some("layer widths must be at least 1".to_string())
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ComputationError::InvalidConfig(reason).into()),
            None => Ok(()),
        }
    }
}

/// Divisor used by the trailing means while fewer than `window` values exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RollingDivisor {
    /// Always divide by the window length. A short run at the start of the
    /// series is diluted and cannot trigger on its own.
    #[default]
    FullWindow,
    /// Divide by the number of values present.
    Available,
}

/// Dual-threshold anomaly rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Trailing window for both AE and DC.
    pub window: usize,

    /// Per-timestamp error above this is flagged.
    pub flag_threshold: f64,

    /// DC must exceed this.
    pub danger_threshold: f64,

    /// AE must exceed this.
    pub average_threshold: f64,

    /// Warm-up behavior of the rolling means.
    pub divisor: RollingDivisor,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            window: 6,
            flag_threshold: 0.27,
            danger_threshold: 0.66,
            average_threshold: 0.23,
            divisor: RollingDivisor::FullWindow,
        }
    }
}

/// Everything a pipeline run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Lower pressure cap; also selects the artifact key.
    pub pressure_threshold: f64,

    /// Explicit caps. `None` derives them from the threshold and schema.
    pub caps: Option<OutlierCaps>,

    /// Window length.
    pub n_past: usize,

    /// Channels the model is built on.
    pub schema: FeatureSchema,

    pub training: TrainingConfig,

    pub classifier: ClassifierConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pressure_threshold: DEFAULT_PRESSURE_THRESHOLD,
            caps: None,
            n_past: DEFAULT_N_PAST,
            schema: FeatureSchema::default(),
            training: TrainingConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Default configuration for another pressure threshold.
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            pressure_threshold: threshold,
            ..Self::default()
        }
    }

    pub fn key(&self) -> ConfigKey {
        ConfigKey::from_threshold(self.pressure_threshold)
    }

    /// Caps applied at training time.
    pub fn effective_caps(&self) -> OutlierCaps {
        match &self.caps {
            Some(caps) => caps.clone(),
            None => OutlierCaps::for_threshold(&self.schema, self.pressure_threshold),
        }
    }

    /// Check the parts that would otherwise fail deep inside a stage.
    pub fn validate(&self) -> Result<()> {
        if self.n_past == 0 {
            return Err(ComputationError::InvalidConfig("n_past must be at least 1".into()).into());
        }
        if self.classifier.window == 0 {
            return Err(ComputationError::InvalidConfig(
                "classifier window must be at least 1".into(),
            )
            .into());
        }
        if !self.pressure_threshold.is_finite() {
            return Err(ComputationError::InvalidConfig(format!(
                "pressure threshold must be finite, got {}",
                self.pressure_threshold
            ))
            .into());
        }
        self.training.validate()
    }
}
