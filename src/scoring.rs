// clogwatch - Clogging anomaly detection for drying lines
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Reconstruction scoring
//!
//! Turns per-window, per-step reconstruction error into one error value per
//! timestamp. A timestamp inside several overlapping windows gets the mean
//! of the errors those windows assign to it.

use crate::error::{ComputationError, Result};
use crate::window::WindowSet;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Per-timestamp reconstruction error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSeries {
    timestamps: Vec<NaiveDateTime>,
    errors: Vec<f64>,
}

impl ErrorSeries {
    pub fn new(timestamps: Vec<NaiveDateTime>, errors: Vec<f64>) -> Result<Self> {
        if timestamps.len() != errors.len() {
            return Err(ComputationError::ShapeMismatch {
                expected: format!("{} errors", timestamps.len()),
                actual: format!("{} errors", errors.len()),
            }
            .into());
        }
        Ok(Self { timestamps, errors })
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn errors(&self) -> &[f64] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.timestamps.iter().copied().zip(self.errors.iter().copied())
    }
}

/// Mean absolute error over features, for every (window, step).
///
/// Output is window-major with `n_past` entries per window.
pub fn step_errors(windows: &WindowSet, reconstructions: &WindowSet) -> Result<Vec<f64>> {
    if windows.shape() != reconstructions.shape() {
        return Err(ComputationError::ShapeMismatch {
            expected: format!("{:?}", windows.shape()),
            actual: format!("{:?}", reconstructions.shape()),
        }
        .into());
    }

    let f = windows.num_features();
    let errors: Vec<f64> = windows
        .as_slice()
        .chunks_exact(f)
        .zip(reconstructions.as_slice().chunks_exact(f))
        .map(|(x, y)| x.iter().zip(y).map(|(a, b)| (a - b).abs()).sum::<f64>() / f as f64)
        .collect();

    if errors.iter().any(|e| !e.is_finite()) {
        return Err(ComputationError::NonFinite {
            stage: "reconstruction error".to_string(),
        }
        .into());
    }
    Ok(errors)
}

/// Number of windows covering position `t` of a `total`-long span.
#[inline]
fn coverage(t: usize, n_past: usize, total: usize) -> usize {
    (t + 1).min(n_past).min(total - t)
}

/// Fold per-step errors onto the covered timestamps.
///
/// Step `j` of window `i` lands on position `i + j`; each position is
/// divided by how many windows cover it. The result has
/// `num_windows + n_past - 1` entries.
pub fn score(windows: &WindowSet, reconstructions: &WindowSet) -> Result<Vec<f64>> {
    let errors = step_errors(windows, reconstructions)?;
    let n_past = windows.n_past();
    let num_windows = windows.len();
    if num_windows == 0 {
        return Ok(Vec::new());
    }

    let total = num_windows + n_past - 1;
    // fewer windows than steps caps coverage at num_windows
    let mut folded = vec![0.0; total];
    for (i, window) in errors.chunks_exact(n_past).enumerate() {
        for (j, e) in window.iter().enumerate() {
            folded[i + j] += e;
        }
    }
    for (t, value) in folded.iter_mut().enumerate() {
        *value /= coverage(t, n_past, total).min(num_windows) as f64;
    }
    Ok(folded)
}

/// [`score`] paired with the covered timestamps.
pub fn score_series(
    windows: &WindowSet,
    reconstructions: &WindowSet,
    timestamps: &[NaiveDateTime],
) -> Result<ErrorSeries> {
    let errors = score(windows, reconstructions)?;
    if timestamps.len() < errors.len() {
        return Err(ComputationError::ShapeMismatch {
            expected: format!("at least {} timestamps", errors.len()),
            actual: format!("{} timestamps", timestamps.len()),
        }
        .into());
    }
    ErrorSeries::new(timestamps[..errors.len()].to_vec(), errors)
}
