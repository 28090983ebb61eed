// clogwatch - Clogging anomaly detection for drying lines
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Anomaly classification
//!
//! Two trailing means over the per-timestamp error decide whether a
//! timestamp is anomalous:
//!
//! - **AE** (average error): mean of the error itself
//! - **DC** (danger coefficient): mean of the high-error flag
//!
//! A timestamp is anomalous only when both exceed their thresholds, so a
//! lone spike (high AE, low DC) and a long mild drift (high DC, low AE) do
//! not trigger on their own.

use crate::config::{ClassifierConfig, RollingDivisor};
use crate::error::{ComputationError, Result};
use crate::scoring::ErrorSeries;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Classification of one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedPoint {
    pub timestamp: NaiveDateTime,
    pub error: f64,
    pub average_error: f64,
    pub danger_coefficient: f64,
    pub flagged: bool,
    pub anomalous: bool,
}

/// A maximal run of consecutive anomalous timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEpisode {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub len: usize,
    pub peak_error: f64,
}

/// Classifier output for a whole error series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    points: Vec<ClassifiedPoint>,
    episodes: Vec<AnomalyEpisode>,
}

impl AnomalyReport {
    pub fn points(&self) -> &[ClassifiedPoint] {
        &self.points
    }

    pub fn episodes(&self) -> &[AnomalyEpisode] {
        &self.episodes
    }

    /// Anomalous timestamps in order.
    pub fn anomaly_timestamps(&self) -> Vec<NaiveDateTime> {
        self.points
            .iter()
            .filter(|p| p.anomalous)
            .map(|p| p.timestamp)
            .collect()
    }

    pub fn anomaly_count(&self) -> usize {
        self.points.iter().filter(|p| p.anomalous).count()
    }

    pub fn has_anomalies(&self) -> bool {
        self.points.iter().any(|p| p.anomalous)
    }

    /// Share of scored timestamps that are anomalous.
    pub fn anomaly_rate(&self) -> f64 {
        if self.points.is_empty() {
            0.0
        } else {
            self.anomaly_count() as f64 / self.points.len() as f64
        }
    }
}

/// Trailing mean over the last `window` values.
fn rolling_mean(values: &[f64], window: usize, divisor: RollingDivisor) -> Vec<f64> {
    (0..values.len())
        .map(|t| {
            let from = (t + 1).saturating_sub(window);
            let sum: f64 = values[from..=t].iter().sum();
            let n = match divisor {
                RollingDivisor::FullWindow => window,
                RollingDivisor::Available => t + 1 - from,
            };
            sum / n as f64
        })
        .collect()
}

/// Dual-threshold anomaly rule.
#[derive(Debug, Clone, Default)]
pub struct AnomalyClassifier {
    config: ClassifierConfig,
}

impl AnomalyClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify every timestamp of `errors`.
    pub fn classify(&self, errors: &ErrorSeries) -> Result<AnomalyReport> {
        let cfg = &self.config;
        if cfg.window == 0 {
            return Err(
                ComputationError::InvalidConfig("classifier window must be at least 1".into())
                    .into(),
            );
        }
        if errors.errors().iter().any(|e| !e.is_finite()) {
            return Err(ComputationError::NonFinite {
                stage: "classifier input".to_string(),
            }
            .into());
        }

        let flags: Vec<f64> = errors
            .errors()
            .iter()
            .map(|&e| if e > cfg.flag_threshold { 1.0 } else { 0.0 })
            .collect();
        let ae = rolling_mean(errors.errors(), cfg.window, cfg.divisor);
        let dc = rolling_mean(&flags, cfg.window, cfg.divisor);

        let points: Vec<ClassifiedPoint> = errors
            .iter()
            .enumerate()
            .map(|(t, (timestamp, error))| ClassifiedPoint {
                timestamp,
                error,
                average_error: ae[t],
                danger_coefficient: dc[t],
                flagged: flags[t] > 0.0,
                anomalous: dc[t] > cfg.danger_threshold && ae[t] > cfg.average_threshold,
            })
            .collect();

        let episodes = group_episodes(&points);
        if !episodes.is_empty() {
            log::info!(
                "{} anomalous timestamps in {} episodes",
                points.iter().filter(|p| p.anomalous).count(),
                episodes.len()
            );
        }
        Ok(AnomalyReport { points, episodes })
    }
}

fn group_episodes(points: &[ClassifiedPoint]) -> Vec<AnomalyEpisode> {
    let mut episodes: Vec<AnomalyEpisode> = Vec::new();
    let mut open = false;
    for p in points {
        if !p.anomalous {
            open = false;
            continue;
        }
        match episodes.last_mut() {
            Some(ep) if open => {
                ep.end = p.timestamp;
                ep.len += 1;
                ep.peak_error = ep.peak_error.max(p.error);
            }
            _ => {
                episodes.push(AnomalyEpisode {
                    start: p.timestamp,
                    end: p.timestamp,
                    len: 1,
                    peak_error: p.error,
                });
                open = true;
            }
        }
    }
    episodes
}
