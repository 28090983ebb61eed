//! Time-lagged windowing
//!
//! Slices a scaled series into overlapping windows of `n_past` consecutive
//! rows with step 1. Windows share one contiguous buffer.

use crate::error::{ClogError, ComputationError, Result};
use crate::series::Series;
use chrono::NaiveDateTime;

/// Stack of equally shaped windows, stored window-major then step-major.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSet {
    n_past: usize,
    num_features: usize,
    data: Vec<f64>,
}

impl WindowSet {
    /// Wrap a buffer of `num_windows * n_past * num_features` values.
    pub fn from_flat(n_past: usize, num_features: usize, data: Vec<f64>) -> Result<Self> {
        let window_len = n_past * num_features;
        if window_len == 0 || data.len() % window_len != 0 {
            return Err(ComputationError::ShapeMismatch {
                expected: format!("multiple of {}x{}", n_past, num_features),
                actual: format!("{} values", data.len()),
            }
            .into());
        }
        Ok(Self {
            n_past,
            num_features,
            data,
        })
    }

    pub fn n_past(&self) -> usize {
        self.n_past
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Values per window.
    pub fn window_len(&self) -> usize {
        self.n_past * self.num_features
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.window_len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// (windows, steps, features)
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.len(), self.n_past, self.num_features)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Flattened window `i`.
    pub fn window(&self, i: usize) -> &[f64] {
        let w = self.window_len();
        &self.data[i * w..(i + 1) * w]
    }

    /// Row `step` of window `i`.
    pub fn step(&self, i: usize, step: usize) -> &[f64] {
        let start = i * self.window_len() + step * self.num_features;
        &self.data[start..start + self.num_features]
    }

    pub fn windows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.window_len())
    }

    /// Windows at the given positions, in that order.
    pub fn select(&self, indices: &[usize]) -> WindowSet {
        let mut data = Vec::with_capacity(indices.len() * self.window_len());
        for &i in indices {
            data.extend_from_slice(self.window(i));
        }
        WindowSet {
            n_past: self.n_past,
            num_features: self.num_features,
            data,
        }
    }
}

/// Build the windows of a scaled series.
///
/// Window `i` holds rows `i..i + n_past`. There are `len - n_past`
/// windows, so the last row only ever serves as look-ahead and is never
/// inside a window. Needs at least `n_past + 1` rows.
pub fn make_windows(series: &Series, n_past: usize) -> Result<WindowSet> {
    if n_past == 0 {
        return Err(ComputationError::InvalidConfig("n_past must be at least 1".into()).into());
    }
    if series.len() < n_past + 1 {
        return Err(ClogError::InsufficientData {
            rows: series.len(),
            required: n_past + 1,
        });
    }

    let num_windows = series.len() - n_past;
    let num_features = series.num_features();
    let mut data = Vec::with_capacity(num_windows * n_past * num_features);
    for i in 0..num_windows {
        for row in &series.rows()[i..i + n_past] {
            data.extend_from_slice(row);
        }
    }
    log::debug!(
        "Built {} windows of {}x{}",
        num_windows,
        n_past,
        num_features
    );
    WindowSet::from_flat(n_past, num_features, data)
}

/// Timestamps covered by at least one window: all but the last row.
pub fn covered_timestamps(series: &Series) -> Vec<NaiveDateTime> {
    let covered = series.len().saturating_sub(1);
    series.timestamps()[..covered].to_vec()
}
