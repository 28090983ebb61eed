// clogwatch - Clogging anomaly detection for drying lines
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use clogwatch::{PipelineConfig, RawRow, RawSeries};
use clogwatch_testdata::industries::{create_drying_line_sensors, DryingLineScenario};
use clogwatch_testdata::{generate_dataset, Dataset, GeneratorConfig};

/// Monday 2024-02-05 at the given hour.
pub fn monday(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 2, 5)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

/// Drying line dataset of `rows` one-minute samples.
pub fn drying_line(
    scenario: DryingLineScenario,
    start: NaiveDateTime,
    rows: usize,
    seed: u64,
) -> Dataset {
    let config = GeneratorConfig::new()
        .with_start(start)
        .with_sample_interval_secs(60)
        .with_num_samples(rows)
        .with_seed(seed);
    generate_dataset(&config, &create_drying_line_sensors(scenario, rows))
}

/// Generated dataset as a raw series.
pub fn to_raw(dataset: &Dataset) -> RawSeries {
    let rows = dataset
        .rows()
        .iter()
        .map(|r| RawRow::new(r.timestamp, r.values.clone()))
        .collect();
    RawSeries::new(dataset.sensor_ids().to_vec(), rows).unwrap()
}

/// Default configuration with a short training run.
pub fn fast_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.training.epochs = 40;
    config
}

/// Copy of `raw` with `channel` set to `value` on rows `range`.
pub fn with_readings(
    raw: &RawSeries,
    channel: &str,
    range: std::ops::Range<usize>,
    value: f64,
) -> RawSeries {
    let idx = raw.channel_index(channel).unwrap();
    let rows = raw
        .rows()
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let mut values = r.values.clone();
            if range.contains(&i) {
                values[idx] = Some(value);
            }
            RawRow::new(r.timestamp, values)
        })
        .collect();
    RawSeries::new(raw.channels().to_vec(), rows).unwrap()
}
