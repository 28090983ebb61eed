// clogwatch testdata - Core generator
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Dataset generation.

use crate::anomalies::{AnomalyConfig, AnomalyState};
use crate::dataset::{Dataset, DatasetMetadata, DatasetRow, InjectedAnomaly};
use crate::patterns::{gaussian, PatternState, SignalPattern};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Timestamp of the first sample.
    pub start: NaiveDateTime,
    /// Seconds between samples.
    pub sample_interval_secs: i64,
    /// Number of samples to generate.
    pub num_samples: usize,
    /// Random seed for reproducibility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            start: default_start(),
            sample_interval_secs: 60,
            num_samples: 60,
            seed: None,
        }
    }
}

/// Monday 2024-02-05 00:00, so short runs stay inside the working week.
fn default_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 2, 5)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start(mut self, start: NaiveDateTime) -> Self {
        self.start = start;
        self
    }

    pub fn with_sample_interval_secs(mut self, secs: i64) -> Self {
        self.sample_interval_secs = secs;
        self
    }

    pub fn with_num_samples(mut self, n: usize) -> Self {
        self.num_samples = n;
        self
    }

    /// Set duration in hours (calculates num_samples from interval).
    pub fn with_duration_hours(mut self, hours: f64) -> Self {
        let interval = self.sample_interval_secs.max(1) as f64;
        self.num_samples = (hours * 3600.0 / interval).ceil() as usize;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Timestamp of sample `i`.
    pub fn timestamp(&self, i: usize) -> NaiveDateTime {
        self.start + Duration::seconds(self.sample_interval_secs * i as i64)
    }

    /// Timestamp of the last sample.
    pub fn end(&self) -> NaiveDateTime {
        self.timestamp(self.num_samples.saturating_sub(1))
    }
}

/// One generated channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Channel name as it appears in the CSV header.
    pub id: String,
    pub unit: String,
    /// Values are clamped to `[min, max]` after noise and anomaly.
    pub min: f64,
    pub max: f64,
    pub pattern: SignalPattern,
    /// Standard deviation of added noise.
    pub noise_std: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<AnomalyConfig>,
}

impl SensorConfig {
    pub fn new(id: &str, unit: &str, min: f64, max: f64, pattern: SignalPattern) -> Self {
        Self {
            id: id.to_string(),
            unit: unit.to_string(),
            min,
            max,
            pattern,
            noise_std: 0.0,
            anomaly: None,
        }
    }

    pub fn with_noise(mut self, std: f64) -> Self {
        self.noise_std = std;
        self
    }

    pub fn with_anomaly(mut self, anomaly: AnomalyConfig) -> Self {
        self.anomaly = Some(anomaly);
        self
    }
}

/// Generate a dataset from configuration.
pub fn generate_dataset(config: &GeneratorConfig, sensors: &[SensorConfig]) -> Dataset {
    let mut rng = match config.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let sensor_ids: Vec<String> = sensors.iter().map(|s| s.id.clone()).collect();
    let mut dataset = Dataset::new(sensor_ids);
    dataset.metadata = DatasetMetadata {
        name: None,
        seed: config.seed,
        sample_interval_secs: Some(config.sample_interval_secs),
        anomalies: injected_anomalies(config, sensors),
    };

    let mut pattern_states: Vec<PatternState> = sensors
        .iter()
        .map(|s| PatternState::for_pattern(&s.pattern))
        .collect();
    let mut anomaly_states = vec![AnomalyState::default(); sensors.len()];

    for i in 0..config.num_samples {
        // Patterns see time since start
        let t_secs = (config.sample_interval_secs * i as i64) as f64;
        let mut values = Vec::with_capacity(sensors.len());

        for (j, sensor) in sensors.iter().enumerate() {
            let mut value = pattern_states[j].evaluate(&sensor.pattern, t_secs, &mut rng);
            value += gaussian(sensor.noise_std, &mut rng);

            let value = match &sensor.anomaly {
                Some(anomaly) if anomaly.is_active(i) => anomaly_states[j].apply(
                    &anomaly.anomaly_type,
                    value,
                    anomaly.samples_since_start(i),
                ),
                _ => Some(value),
            };

            values.push(value.map(|v| v.clamp(sensor.min, sensor.max)));
        }

        dataset.rows.push(DatasetRow::new(config.timestamp(i), values));
    }

    dataset
}

fn injected_anomalies(config: &GeneratorConfig, sensors: &[SensorConfig]) -> Vec<InjectedAnomaly> {
    sensors
        .iter()
        .filter_map(|sensor| {
            let anomaly = sensor.anomaly.as_ref()?;
            let range = anomaly.active_range(config.num_samples);
            if range.is_empty() {
                return None;
            }
            Some(InjectedAnomaly {
                sensor_id: sensor.id.clone(),
                label: anomaly.anomaly_type.label().to_string(),
                start: config.timestamp(range.start),
                end: config.timestamp(range.end - 1),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomalies::AnomalyType;

    #[test]
    fn test_generator_config_default() {
        let config = GeneratorConfig::default();
        assert_eq!(config.sample_interval_secs, 60);
        assert_eq!(config.num_samples, 60);
        assert_eq!(config.start.format("%A").to_string(), "Monday");
    }

    #[test]
    fn test_generator_config_duration() {
        let config = GeneratorConfig::new()
            .with_sample_interval_secs(60)
            .with_duration_hours(2.0);
        assert_eq!(config.num_samples, 120);
        assert_eq!(config.end(), config.start + Duration::minutes(119));
    }

    #[test]
    fn test_generate_simple() {
        let config = GeneratorConfig::new().with_num_samples(10).with_seed(42);
        let sensors = vec![SensorConfig::new("temp", "C", 0.0, 100.0, SignalPattern::constant(25.0))];

        let dataset = generate_dataset(&config, &sensors);

        assert_eq!(dataset.len(), 10);
        assert_eq!(dataset.column("temp").unwrap(), vec![Some(25.0); 10]);
        assert_eq!(dataset.rows[1].timestamp, config.start + Duration::minutes(1));
    }

    #[test]
    fn test_generate_is_reproducible() {
        let config = GeneratorConfig::new().with_num_samples(50).with_seed(7);
        let sensors = vec![SensorConfig::new("p", "bar", -5.0, 5.0, SignalPattern::constant(0.2)).with_noise(0.05)];

        let a = generate_dataset(&config, &sensors);
        let b = generate_dataset(&config, &sensors);
        assert_eq!(a.rows, b.rows);
    }

    #[test]
    fn test_clamp_applied() {
        let config = GeneratorConfig::new().with_num_samples(5).with_seed(1);
        let sensors = vec![SensorConfig::new("p", "bar", 0.0, 1.0, SignalPattern::constant(0.5))
            .with_anomaly(AnomalyConfig::new(AnomalyType::clog(10.0), 2))];

        let dataset = generate_dataset(&config, &sensors);
        let column = dataset.column("p").unwrap();
        assert_eq!(column, vec![Some(0.5), Some(0.5), Some(1.0), Some(1.0), Some(1.0)]);
    }

    #[test]
    fn test_dropout_and_ground_truth() {
        let config = GeneratorConfig::new().with_num_samples(20).with_seed(3);
        let sensors = vec![SensorConfig::new("m", "%", 0.0, 10.0, SignalPattern::constant(3.0))
            .with_anomaly(AnomalyConfig::new(AnomalyType::Dropout, 5).with_duration(3))];

        let dataset = generate_dataset(&config, &sensors);
        let missing = dataset.column("m").unwrap().iter().filter(|v| v.is_none()).count();
        assert_eq!(missing, 3);

        let truth = &dataset.metadata.anomalies;
        assert_eq!(truth.len(), 1);
        assert_eq!(truth[0].label, "dropout");
        assert_eq!(truth[0].start, config.timestamp(5));
        assert_eq!(truth[0].end, config.timestamp(7));
    }
}
