//! Min-max feature scaling
//!
//! Fitted once on the capped training series, persisted, and reapplied to
//! every inference series of the same configuration.

use crate::error::{ComputationError, Result, SchemaError};
use crate::series::Series;
use serde::{Deserialize, Serialize};

/// Per-feature affine map onto [0, 1] over the training range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    features: Vec<String>,
    fingerprint: u64,
    min: Vec<f64>,
    scale: Vec<f64>,
}

impl MinMaxScaler {
    /// Fit on every row of `series`.
    ///
    /// A constant feature gets range 1, so it maps to 0.
    pub fn fit(series: &Series) -> Result<Self> {
        if series.is_empty() {
            return Err(ComputationError::InvalidConfig(
                "cannot fit a scaler on an empty series".to_string(),
            )
            .into());
        }

        let width = series.num_features();
        let mut min = vec![f64::INFINITY; width];
        let mut max = vec![f64::NEG_INFINITY; width];
        for row in series.rows() {
            for (j, &v) in row.iter().enumerate() {
                if !v.is_finite() {
                    return Err(ComputationError::NonFinite {
                        stage: "scaler fit".to_string(),
                    }
                    .into());
                }
                min[j] = min[j].min(v);
                max[j] = max[j].max(v);
            }
        }

        let scale = min
            .iter()
            .zip(&max)
            .map(|(lo, hi)| {
                let range = hi - lo;
                if range > 0.0 {
                    1.0 / range
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self {
            features: series.schema().names().map(str::to_string).collect(),
            fingerprint: series.schema().fingerprint(),
            min,
            scale,
        })
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn data_min(&self) -> &[f64] {
        &self.min
    }

    /// Width of the fitted range per feature.
    pub fn data_range(&self) -> Vec<f64> {
        self.scale.iter().map(|s| 1.0 / s).collect()
    }

    fn check(&self, series: &Series) -> Result<()> {
        let actual = series.schema().fingerprint();
        if actual != self.fingerprint {
            return Err(SchemaError::ScalerMismatch {
                expected: self.fingerprint,
                actual,
            }
            .into());
        }
        Ok(())
    }

    /// Map into the fitted range. Values outside the training range land
    /// outside [0, 1].
    pub fn transform(&self, series: &Series) -> Result<Series> {
        self.check(series)?;
        let rows = series
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(j, v)| (v - self.min[j]) * self.scale[j])
                    .collect()
            })
            .collect();
        Ok(series.with_rows(rows))
    }

    pub fn inverse_transform(&self, series: &Series) -> Result<Series> {
        self.check(series)?;
        let rows = series
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(j, v)| v / self.scale[j] + self.min[j])
                    .collect()
            })
            .collect();
        Ok(series.with_rows(rows))
    }
}
