// clogwatch testdata - Anomaly injection
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Anomaly injection for generated channels.
//!
//! A clog shows up on the line as a sustained block offset on the
//! pressures; the other types model sensor faults that a detector should
//! also see or tolerate.

use serde::{Deserialize, Serialize};

/// Where and what to inject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Type of anomaly to inject.
    pub anomaly_type: AnomalyType,
    /// Sample index when the anomaly starts.
    pub start_sample: usize,
    /// Duration in samples (None = until end).
    pub duration_samples: Option<usize>,
}

impl AnomalyConfig {
    pub fn new(anomaly_type: AnomalyType, start_sample: usize) -> Self {
        Self {
            anomaly_type,
            start_sample,
            duration_samples: None,
        }
    }

    pub fn with_duration(mut self, samples: usize) -> Self {
        self.duration_samples = Some(samples);
        self
    }

    /// Check if the anomaly is active at a sample index.
    pub fn is_active(&self, sample_idx: usize) -> bool {
        if sample_idx < self.start_sample {
            return false;
        }
        match self.duration_samples {
            Some(duration) => sample_idx < self.start_sample + duration,
            None => true,
        }
    }

    pub fn samples_since_start(&self, sample_idx: usize) -> usize {
        sample_idx.saturating_sub(self.start_sample)
    }

    /// Sample range covered, clipped to `total` samples.
    pub fn active_range(&self, total: usize) -> std::ops::Range<usize> {
        let start = self.start_sample.min(total);
        let end = match self.duration_samples {
            Some(d) => (self.start_sample + d).min(total),
            None => total,
        };
        start..end
    }
}

/// Type of anomaly to inject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnomalyType {
    /// Constant offset for the whole block (clogged line).
    Clog { offset: f64 },

    /// One-sample jump at the start of the block.
    Spike { magnitude: f64 },

    /// Offset growing by `rate_per_sample` each sample.
    Drift { rate_per_sample: f64 },

    /// Reading frozen at the first value of the block.
    Stuck,

    /// Missing readings.
    Dropout,
}

impl AnomalyType {
    pub fn clog(offset: f64) -> Self {
        AnomalyType::Clog { offset }
    }

    pub fn spike(magnitude: f64) -> Self {
        AnomalyType::Spike { magnitude }
    }

    pub fn drift(rate_per_sample: f64) -> Self {
        AnomalyType::Drift { rate_per_sample }
    }

    /// Short label used in dataset metadata.
    pub fn label(&self) -> &'static str {
        match self {
            AnomalyType::Clog { .. } => "clog",
            AnomalyType::Spike { .. } => "spike",
            AnomalyType::Drift { .. } => "drift",
            AnomalyType::Stuck => "stuck",
            AnomalyType::Dropout => "dropout",
        }
    }
}

/// Running state while an anomaly is applied.
#[derive(Debug, Clone, Default)]
pub struct AnomalyState {
    /// Frozen reading (for Stuck).
    pub last_value: Option<f64>,
    /// Accumulated drift.
    pub drift_accumulated: f64,
}

impl AnomalyState {
    /// Apply the anomaly to a value; `None` means the reading is missing.
    pub fn apply(
        &mut self,
        anomaly: &AnomalyType,
        value: f64,
        samples_since_start: usize,
    ) -> Option<f64> {
        match anomaly {
            AnomalyType::Clog { offset } => Some(value + offset),

            AnomalyType::Spike { magnitude } => {
                if samples_since_start == 0 {
                    Some(value + magnitude)
                } else {
                    Some(value)
                }
            }

            AnomalyType::Drift { rate_per_sample } => {
                self.drift_accumulated += rate_per_sample;
                Some(value + self.drift_accumulated)
            }

            AnomalyType::Stuck => {
                if self.last_value.is_none() {
                    self.last_value = Some(value);
                }
                self.last_value
            }

            AnomalyType::Dropout => None,
        }
    }
}
