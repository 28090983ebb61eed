// clogwatch testdata - Drying line
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Drying line channels: two line pressures, feed flow, product moisture.
//!
//! Channel names follow the plant historian tags.

use crate::anomalies::{AnomalyConfig, AnomalyType};
use crate::generator::SensorConfig;
use crate::patterns::SignalPattern;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const PRESSURE_UPSTREAM: &str = "18BL02PT\\PV -  (Bar)";
pub const PRESSURE_DOWNSTREAM: &str = "18BL03PT\\PV -  (Bar)";
pub const FEED_FLOW: &str = "18FI02LT01 -  (kg)";
pub const MOISTURE: &str = "18OV01HM01_filtered -  (%)";

/// Pressure drop on both lines while clogged.
pub const CLOG_OFFSET: f64 = -3.0;

/// Drying line scenario types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DryingLineScenario {
    /// Normal operation.
    Nominal,
    /// Both pressures collapse for a block of samples.
    Clogging,
    /// Moisture probe stops reporting for a while.
    SensorDropout,
}

impl DryingLineScenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            DryingLineScenario::Nominal => "nominal",
            DryingLineScenario::Clogging => "clogging",
            DryingLineScenario::SensorDropout => "dropout",
        }
    }
}

impl FromStr for DryingLineScenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nominal" => Ok(DryingLineScenario::Nominal),
            "clogging" | "clog" => Ok(DryingLineScenario::Clogging),
            "dropout" | "sensor-dropout" => Ok(DryingLineScenario::SensorDropout),
            other => Err(format!("unknown scenario: {}", other)),
        }
    }
}

/// Sample block `[start, start + len)` for an event in a run of `total`
/// samples.
pub fn event_block(scenario: DryingLineScenario, total: usize) -> Option<(usize, usize)> {
    match scenario {
        DryingLineScenario::Nominal => None,
        DryingLineScenario::Clogging => Some((total * 6 / 10, (total / 10).max(20))),
        DryingLineScenario::SensorDropout => Some((total * 4 / 10, (total / 20).max(3))),
    }
}

/// Channel configurations for a scenario over `total` samples.
pub fn create_drying_line_sensors(scenario: DryingLineScenario, total: usize) -> Vec<SensorConfig> {
    let mut sensors = base_drying_line_sensors();

    match (scenario, event_block(scenario, total)) {
        (DryingLineScenario::Clogging, Some((start, len))) => {
            for sensor in sensors
                .iter_mut()
                .filter(|s| s.id == PRESSURE_UPSTREAM || s.id == PRESSURE_DOWNSTREAM)
            {
                sensor.anomaly = Some(
                    AnomalyConfig::new(AnomalyType::clog(CLOG_OFFSET), start).with_duration(len),
                );
            }
        }
        (DryingLineScenario::SensorDropout, Some((start, len))) => {
            if let Some(moisture) = sensors.iter_mut().find(|s| s.id == MOISTURE) {
                moisture.anomaly =
                    Some(AnomalyConfig::new(AnomalyType::Dropout, start).with_duration(len));
            }
        }
        _ => {}
    }

    sensors
}

fn base_drying_line_sensors() -> Vec<SensorConfig> {
    vec![
        // Upstream line pressure, hourly swing
        SensorConfig::new(
            PRESSURE_UPSTREAM,
            "bar",
            -5.0,
            5.0,
            SignalPattern::sine(0.25, 0.03, 3600.0),
        )
        .with_noise(0.005),
        SensorConfig::new(
            PRESSURE_DOWNSTREAM,
            "bar",
            -5.0,
            5.0,
            SignalPattern::sine(0.12, 0.02, 3600.0),
        )
        .with_noise(0.005),
        // Feed flow follows a two-hour batch cycle
        SensorConfig::new(
            FEED_FLOW,
            "kg",
            0.0,
            15.0,
            SignalPattern::sine(8.0, 1.0, 7200.0),
        )
        .with_noise(0.1),
        SensorConfig::new(
            MOISTURE,
            "%",
            2.0,
            3.5,
            SignalPattern::RandomWalk {
                start: 3.0,
                step_std: 0.01,
                reversion: 0.1,
            },
        )
        .with_noise(0.01),
    ]
}
