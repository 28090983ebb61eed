//! Time series types
//!
//! [`RawSeries`] is what a loader hands over: named channels, readings that
//! may be missing, rows ordered by timestamp. [`Series`] is the cleaned
//! table restricted to a [`FeatureSchema`], with every reading present.

use crate::error::{FormatError, Result, SchemaError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use xxhash_rust::xxh64::xxh64;

/// Upstream pressure transmitter (bar)
pub const PRESSURE_UPSTREAM: &str = "18BL02PT\\PV -  (Bar)";
/// Downstream pressure transmitter (bar)
pub const PRESSURE_DOWNSTREAM: &str = "18BL03PT\\PV -  (Bar)";
/// Feed flow (kg)
pub const FEED_FLOW: &str = "18FI02LT01 -  (kg)";
/// Filtered product moisture (%)
pub const MOISTURE: &str = "18OV01HM01_filtered -  (%)";

/// Physical role of a sensor channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureRole {
    Pressure,
    Flow,
    Moisture,
}

/// A named channel of the feature set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub role: FeatureRole,
}

impl Feature {
    pub fn new(name: &str, role: FeatureRole) -> Self {
        Self {
            name: name.to_string(),
            role,
        }
    }
}

/// Ordered, fixed set of channels the model is built on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    features: Vec<Feature>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self {
            features: vec![
                Feature::new(PRESSURE_UPSTREAM, FeatureRole::Pressure),
                Feature::new(PRESSURE_DOWNSTREAM, FeatureRole::Pressure),
                Feature::new(FEED_FLOW, FeatureRole::Flow),
                Feature::new(MOISTURE, FeatureRole::Moisture),
            ],
        }
    }
}

impl FeatureSchema {
    /// Create a schema; names must be non-empty and unique
    pub fn new(features: Vec<Feature>) -> Result<Self> {
        if features.is_empty() {
            return Err(SchemaError::Empty.into());
        }
        for (i, feature) in features.iter().enumerate() {
            if features[..i].iter().any(|f| f.name == feature.name) {
                return Err(SchemaError::DuplicateFeature(feature.name.clone()).into());
            }
        }
        Ok(Self { features })
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f.name == name)
    }

    /// Hash of the ordered feature names.
    ///
    /// Stored with fitted scalers so a scaler is never applied to a series
    /// built on a different feature set.
    pub fn fingerprint(&self) -> u64 {
        let mut bytes = Vec::new();
        for name in self.names() {
            bytes.extend_from_slice(name.as_bytes());
            bytes.push(0);
        }
        xxh64(&bytes, 0)
    }
}

/// One timestamped row of raw readings
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub timestamp: NaiveDateTime,
    pub values: Vec<Option<f64>>,
}

impl RawRow {
    pub fn new(timestamp: NaiveDateTime, values: Vec<Option<f64>>) -> Self {
        Self { timestamp, values }
    }
}

/// Raw multi-channel time series, strictly increasing timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    channels: Vec<String>,
    rows: Vec<RawRow>,
}

impl RawSeries {
    /// Build a raw series.
    ///
    /// Rows are sorted by timestamp. NaN readings count as missing. Fails
    /// on repeated channel names, rows of the wrong width and duplicate
    /// timestamps.
    pub fn new(channels: Vec<String>, mut rows: Vec<RawRow>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(channels.len());
        if let Some(name) = channels.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(SchemaError::DuplicateFeature(name.clone()).into());
        }
        for (i, row) in rows.iter_mut().enumerate() {
            if row.values.len() != channels.len() {
                return Err(SchemaError::RowWidth {
                    row: i,
                    expected: channels.len(),
                    actual: row.values.len(),
                }
                .into());
            }
            for value in row.values.iter_mut() {
                if value.map_or(false, f64::is_nan) {
                    *value = None;
                }
            }
        }

        rows.sort_by_key(|r| r.timestamp);
        if let Some(pair) = rows.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
            return Err(FormatError::DuplicateTimestamp(pair[0].timestamp.to_string()).into());
        }

        Ok(Self { channels, rows })
    }

    /// Rebuild from rows already known to be ordered and well-formed.
    pub(crate) fn from_ordered(channels: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self { channels, rows }
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c == name)
    }

    /// Readings of one channel, in row order
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.channel_index(name)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.rows.iter().map(|r| r.timestamp).collect()
    }

    /// Fail with `MissingFeature` for the first schema channel not present.
    pub fn check_schema(&self, schema: &FeatureSchema) -> Result<()> {
        match schema.names().find(|name| self.channel_index(name).is_none()) {
            Some(missing) => Err(SchemaError::MissingFeature(missing.to_string()).into()),
            None => Ok(()),
        }
    }
}

/// Complete, schema-restricted series
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    schema: FeatureSchema,
    timestamps: Vec<NaiveDateTime>,
    rows: Vec<Vec<f64>>,
}

impl Series {
    pub fn new(
        schema: FeatureSchema,
        timestamps: Vec<NaiveDateTime>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if timestamps.len() != rows.len() {
            return Err(SchemaError::RowWidth {
                row: timestamps.len().min(rows.len()),
                expected: timestamps.len(),
                actual: rows.len(),
            }
            .into());
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != schema.len()) {
            return Err(SchemaError::RowWidth {
                row: i,
                expected: schema.len(),
                actual: row.len(),
            }
            .into());
        }
        Ok(Self {
            schema,
            timestamps,
            rows,
        })
    }

    /// Same timestamps and schema, new values.
    pub(crate) fn with_rows(&self, rows: Vec<Vec<f64>>) -> Self {
        debug_assert_eq!(rows.len(), self.rows.len());
        Self {
            schema: self.schema.clone(),
            timestamps: self.timestamps.clone(),
            rows,
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn num_features(&self) -> usize {
        self.schema.len()
    }

    pub fn column(&self, j: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[j]).collect()
    }
}
