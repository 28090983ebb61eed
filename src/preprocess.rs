// clogwatch - Clogging anomaly detection for drying lines
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Cleaning stages
//!
//! Each stage takes a series by reference and returns a new one together
//! with what it changed. Training runs weekend removal, forward fill,
//! feature selection and outlier capping; inference runs the same minus
//! the capping.

use crate::calendar;
use crate::error::{Result, SchemaError};
use crate::series::{FeatureRole, FeatureSchema, RawSeries, Series};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default feed flow bounds (kg)
pub const FLOW_BOUNDS: (f64, f64) = (0.0, 15.0);

/// Default moisture bounds (%)
pub const MOISTURE_BOUNDS: (f64, f64) = (2.0, 3.5);

/// Clamp bounds for one feature. `None` leaves that side open.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Cap {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl Cap {
    pub fn new(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self { lower, upper }
    }

    pub fn lower(lower: f64) -> Self {
        Self::new(Some(lower), None)
    }

    pub fn range(lower: f64, upper: f64) -> Self {
        Self::new(Some(lower), Some(upper))
    }

    /// Clamp a value. Returns the result and whether it changed.
    pub fn apply(&self, value: f64) -> (f64, bool) {
        let mut out = value;
        if let Some(lo) = self.lower {
            if out < lo {
                out = lo;
            }
        }
        if let Some(hi) = self.upper {
            if out > hi {
                out = hi;
            }
        }
        (out, out != value)
    }
}

/// Per-feature caps, keyed by channel name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OutlierCaps {
    caps: BTreeMap<String, Cap>,
}

impl OutlierCaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plant defaults: pressures floored at the threshold, flow in
    /// [0, 15], moisture in [2, 3.5].
    pub fn for_threshold(schema: &FeatureSchema, threshold: f64) -> Self {
        let mut caps = Self::new();
        for feature in schema.features() {
            let cap = match feature.role {
                FeatureRole::Pressure => Cap::lower(threshold),
                FeatureRole::Flow => Cap::range(FLOW_BOUNDS.0, FLOW_BOUNDS.1),
                FeatureRole::Moisture => Cap::range(MOISTURE_BOUNDS.0, MOISTURE_BOUNDS.1),
            };
            caps.set(&feature.name, cap);
        }
        caps
    }

    pub fn set(&mut self, feature: &str, cap: Cap) {
        self.caps.insert(feature.to_string(), cap);
    }

    pub fn get(&self, feature: &str) -> Option<&Cap> {
        self.caps.get(feature)
    }

    pub fn len(&self) -> usize {
        self.caps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cap)> {
        self.caps.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// What the cleaning stages did to a raw series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub weekend_dropped: usize,
    pub unfillable_dropped: usize,
    pub values_filled: usize,
    pub values_capped: usize,
    pub rows_out: usize,
}

/// Replace each missing reading with the last known one in its channel.
///
/// Readings before the first known value stay missing.
pub fn forward_fill(series: &RawSeries) -> (RawSeries, usize) {
    let width = series.channels().len();
    let mut last: Vec<Option<f64>> = vec![None; width];
    let mut filled = 0;

    let rows = series
        .rows()
        .iter()
        .map(|row| {
            let mut row = row.clone();
            for (value, prev) in row.values.iter_mut().zip(last.iter_mut()) {
                match value {
                    Some(v) => *prev = Some(*v),
                    None => {
                        if prev.is_some() {
                            *value = *prev;
                            filled += 1;
                        }
                    }
                }
            }
            row
        })
        .collect();

    (RawSeries::from_ordered(series.channels().to_vec(), rows), filled)
}

/// Restrict to the schema channels, in schema order.
///
/// Rows with a missing reading in any selected channel are dropped; after
/// a forward fill these can only be leading rows. Returns the series and
/// the number of rows dropped.
pub fn select_features(series: &RawSeries, schema: &FeatureSchema) -> Result<(Series, usize)> {
    series.check_schema(schema)?;
    let indices: Vec<usize> = schema
        .names()
        .filter_map(|name| series.channel_index(name))
        .collect();

    let mut timestamps = Vec::with_capacity(series.len());
    let mut rows = Vec::with_capacity(series.len());
    for row in series.rows() {
        let selected: Option<Vec<f64>> = indices.iter().map(|&i| row.values[i]).collect();
        if let Some(values) = selected {
            timestamps.push(row.timestamp);
            rows.push(values);
        }
    }

    let dropped = series.len() - rows.len();
    Ok((Series::new(schema.clone(), timestamps, rows)?, dropped))
}

/// Clamp every feature that has a cap. Returns the series and the number
/// of readings changed.
pub fn cap_outliers(series: &Series, caps: &OutlierCaps) -> Result<(Series, usize)> {
    let schema = series.schema();
    let mut per_column: Vec<Option<Cap>> = vec![None; schema.len()];
    for (name, cap) in caps.iter() {
        let idx = schema
            .index_of(name)
            .ok_or_else(|| SchemaError::MissingFeature(name.to_string()))?;
        per_column[idx] = Some(*cap);
    }

    let mut capped = 0;
    let rows = series
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .zip(per_column.iter())
                .map(|(&value, cap)| match cap {
                    Some(cap) => {
                        let (out, changed) = cap.apply(value);
                        if changed {
                            capped += 1;
                        }
                        out
                    }
                    None => value,
                })
                .collect()
        })
        .collect();

    if capped > 0 {
        log::debug!("Capped {} readings", capped);
    }
    Ok((series.with_rows(rows), capped))
}

/// Weekend removal, forward fill and feature selection.
pub fn clean(raw: &RawSeries, schema: &FeatureSchema) -> Result<(Series, CleaningReport)> {
    raw.check_schema(schema)?;

    let (weekdays, weekend_dropped) = calendar::remove_weekends(raw);
    let (filled, values_filled) = forward_fill(&weekdays);
    let (series, unfillable_dropped) = select_features(&filled, schema)?;

    let report = CleaningReport {
        rows_in: raw.len(),
        weekend_dropped,
        unfillable_dropped,
        values_filled,
        values_capped: 0,
        rows_out: series.len(),
    };
    log::info!(
        "Cleaned {} rows into {} ({} weekend, {} unfillable, {} filled)",
        report.rows_in,
        report.rows_out,
        report.weekend_dropped,
        report.unfillable_dropped,
        report.values_filled
    );
    Ok((series, report))
}
