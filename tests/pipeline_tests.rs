// clogwatch - Clogging anomaly detection for drying lines
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! End-to-end tests: synthetic drying line data through training and
//! inference.

mod common;

use chrono::{Duration, NaiveDate};
use clogwatch::calendar::is_weekend;
use clogwatch::loader;
use clogwatch::*;
use clogwatch_testdata::industries::drying_line::{MOISTURE, PRESSURE_UPSTREAM};
use clogwatch_testdata::industries::DryingLineScenario;
use common::*;
use std::collections::HashSet;
use tempfile::tempdir;

const TRAIN_ROWS: usize = 1000;

// ============================================================================
// Helper Functions
// ============================================================================

fn trained_pipeline() -> Pipeline<MemoryBackend, AutoencoderTrainer> {
    let nominal = drying_line(DryingLineScenario::Nominal, monday(6), TRAIN_ROWS, 1);
    let mut pipeline = Pipeline::with_autoencoder(fast_config(), MemoryBackend::new()).unwrap();
    pipeline.train(&to_raw(&nominal)).unwrap();
    pipeline
}

// ============================================================================
// Section 1: Training and detection
// ============================================================================

#[test]
fn test_01_training_diagnostics() {
    let nominal = drying_line(DryingLineScenario::Nominal, monday(6), TRAIN_ROWS, 1);
    let mut pipeline = Pipeline::with_autoencoder(fast_config(), MemoryBackend::new()).unwrap();

    let diagnostics = pipeline.train(&to_raw(&nominal)).unwrap();

    assert_eq!(diagnostics.key.as_str(), "0_3");
    assert_eq!(diagnostics.windows, TRAIN_ROWS - 6);
    assert_eq!(diagnostics.num_features, 4);
    assert_eq!(diagnostics.cleaning.rows_out, TRAIN_ROWS);
    assert_eq!(diagnostics.history.epochs(), 40);
    assert!(pipeline.is_trained());

    let first = diagnostics.history.train_loss[0];
    let last = diagnostics.history.final_train_loss().unwrap();
    assert!(last < first, "loss should drop: {} -> {}", first, last);
}

#[test]
fn test_02_nominal_series_is_quiet() {
    let pipeline = trained_pipeline();
    let seen = drying_line(DryingLineScenario::Nominal, monday(6), TRAIN_ROWS, 1);
    let unseen = drying_line(DryingLineScenario::Nominal, monday(6), TRAIN_ROWS, 2);

    for series in [seen, unseen] {
        let report = pipeline.infer(&to_raw(&series)).unwrap();
        assert_eq!(report.points().len(), TRAIN_ROWS - 1);
        assert!(
            report.anomaly_rate() < 0.01,
            "nominal anomaly rate {}",
            report.anomaly_rate()
        );
    }
}

#[test]
fn test_03_clog_block_is_detected() {
    let pipeline = trained_pipeline();
    let clogged = drying_line(DryingLineScenario::Clogging, monday(6), TRAIN_ROWS, 3);
    let truth = &clogged.metadata.anomalies[0];

    let report = pipeline.infer(&to_raw(&clogged)).unwrap();
    let anomalies: HashSet<_> = report.anomaly_timestamps().into_iter().collect();

    // Past the trailing window every clogged minute is anomalous
    let mut t = truth.start + Duration::minutes(6);
    while t <= truth.end {
        assert!(anomalies.contains(&t), "missed clogged minute {}", t);
        t += Duration::minutes(1);
    }

    assert!(report
        .episodes()
        .iter()
        .any(|e| e.start <= truth.end && e.end >= truth.start));
}

#[test]
fn test_04_dropout_is_filled_not_flagged() {
    let pipeline = trained_pipeline();
    let gappy = drying_line(DryingLineScenario::SensorDropout, monday(6), TRAIN_ROWS, 4);
    let missing = gappy
        .column(MOISTURE)
        .unwrap()
        .iter()
        .filter(|v| v.is_none())
        .count();
    assert!(missing > 0);

    let report = pipeline.infer(&to_raw(&gappy)).unwrap();

    assert_eq!(report.points().len(), TRAIN_ROWS - 1);
    assert!(report.anomaly_rate() < 0.05);
}

// ============================================================================
// Section 2: Failure modes
// ============================================================================

#[test]
fn test_05_infer_before_train_is_not_found() {
    let pipeline = Pipeline::with_autoencoder(fast_config(), MemoryBackend::new()).unwrap();
    let series = drying_line(DryingLineScenario::Nominal, monday(6), 50, 5);

    let err = pipeline.infer(&to_raw(&series)).unwrap_err();
    assert!(matches!(
        err,
        ClogError::Store(StoreError::NotFound { ref kind, ref key }) if kind == "scaler" && key == "0_3"
    ));
}

#[test]
fn test_06_short_series_is_insufficient() {
    let mut pipeline = Pipeline::with_autoencoder(fast_config(), MemoryBackend::new()).unwrap();
    let series = drying_line(DryingLineScenario::Nominal, monday(6), 5, 6);

    let err = pipeline.train(&to_raw(&series)).unwrap_err();
    assert!(matches!(
        err,
        ClogError::InsufficientData {
            rows: 5,
            required: 7
        }
    ));
    assert!(!pipeline.is_trained());
}

#[test]
fn test_07_missing_feature() {
    let mut pipeline = Pipeline::with_autoencoder(fast_config(), MemoryBackend::new()).unwrap();
    let series = to_raw(&drying_line(DryingLineScenario::Nominal, monday(6), 50, 7));

    let keep: Vec<String> = series
        .channels()
        .iter()
        .filter(|c| c.as_str() != MOISTURE)
        .cloned()
        .collect();
    let rows = series
        .rows()
        .iter()
        .map(|r| RawRow::new(r.timestamp, r.values[..3].to_vec()))
        .collect();
    let partial = RawSeries::new(keep, rows).unwrap();

    let err = pipeline.train(&partial).unwrap_err();
    assert_eq!(
        err.to_string(),
        ClogError::Schema(SchemaError::MissingFeature(MOISTURE.to_string())).to_string()
    );
}

#[test]
fn test_08_other_threshold_needs_own_artifacts() {
    let pipeline = trained_pipeline();
    let backend = pipeline.store().backend().clone();

    let other = Pipeline::with_autoencoder(PipelineConfig::with_threshold(-0.5), backend).unwrap();
    assert_eq!(other.key().as_str(), "0_5");
    assert!(!other.is_trained());
}

// ============================================================================
// Section 3: Persistence and loading
// ============================================================================

#[test]
fn test_09_file_backend_survives_restart() {
    let dir = tempdir().unwrap();
    let nominal = to_raw(&drying_line(DryingLineScenario::Nominal, monday(6), TRAIN_ROWS, 1));
    let probe = to_raw(&drying_line(DryingLineScenario::Clogging, monday(6), TRAIN_ROWS, 9));

    let first = {
        let mut pipeline =
            Pipeline::with_autoencoder(fast_config(), FileBackend::new(dir.path())).unwrap();
        pipeline.train(&nominal).unwrap();
        pipeline.infer(&probe).unwrap()
    };

    let restarted = Pipeline::with_autoencoder(fast_config(), FileBackend::new(dir.path())).unwrap();
    assert!(restarted.is_trained());
    let second = restarted.infer(&probe).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_10_csv_export_loads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("line.csv");
    let dataset = drying_line(DryingLineScenario::SensorDropout, monday(6), 120, 10);
    dataset.to_csv(&path).unwrap();

    let loaded = loader::load_path(&path, &FeatureSchema::default()).unwrap();

    assert_eq!(loaded.len(), 120);
    assert_eq!(loaded.channels(), dataset.sensor_ids());
    assert_eq!(
        loaded.column(MOISTURE).unwrap().iter().filter(|v| v.is_none()).count(),
        dataset.column(MOISTURE).unwrap().iter().filter(|v| v.is_none()).count()
    );
}

// ============================================================================
// Section 4: Production calendar
// ============================================================================

#[test]
fn test_11_weekend_rows_never_reported() {
    let pipeline = trained_pipeline();
    let friday_night = NaiveDate::from_ymd_opt(2024, 2, 9)
        .unwrap()
        .and_hms_opt(22, 0, 0)
        .unwrap();
    let series = to_raw(&drying_line(DryingLineScenario::Nominal, friday_night, 600, 11));

    let report = pipeline.infer(&series).unwrap();

    // Friday 22:00-23:59 survives, Saturday is dropped
    assert_eq!(report.points().len(), 119);
    assert!(report.points().iter().all(|p| !is_weekend(&p.timestamp)));
}

#[test]
fn test_12_weekend_removal_is_idempotent() {
    let saturday = NaiveDate::from_ymd_opt(2024, 2, 10)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let series = to_raw(&drying_line(DryingLineScenario::Nominal, saturday, 3000, 12));

    let (once, dropped) = calendar::remove_weekends(&series);
    let (twice, dropped_again) = calendar::remove_weekends(&once);

    assert!(dropped > 0);
    assert_eq!(dropped_again, 0);
    assert_eq!(once.rows(), twice.rows());
}

// ============================================================================
// Section 5: Outlier caps
// ============================================================================

#[test]
fn test_13_training_caps_low_pressure() {
    let nominal = to_raw(&drying_line(DryingLineScenario::Nominal, monday(6), 300, 13));
    let dipped = with_readings(&nominal, PRESSURE_UPSTREAM, 100..110, -1.0);
    let mut pipeline = Pipeline::with_autoencoder(fast_config(), MemoryBackend::new()).unwrap();

    let diagnostics = pipeline.train(&dipped).unwrap();
    assert!(diagnostics.cleaning.values_capped >= 10);

    // The scaler only ever sees the threshold, never the -1.0 readings
    let scaler = pipeline.store().load_scaler(&pipeline.key()).unwrap();
    let idx = scaler
        .features()
        .iter()
        .position(|f| f == PRESSURE_UPSTREAM)
        .unwrap();
    assert_eq!(scaler.data_min()[idx], -0.3);
}

#[test]
fn test_14_inference_scores_uncapped_readings() {
    let pipeline = trained_pipeline();
    let nominal = to_raw(&drying_line(DryingLineScenario::Nominal, monday(6), TRAIN_ROWS, 14));
    let raw = with_readings(&nominal, PRESSURE_UPSTREAM, 500..520, -2.0);
    let at_threshold = with_readings(&nominal, PRESSURE_UPSTREAM, 500..520, -0.3);

    let raw_errors = pipeline.score(&raw).unwrap();
    let capped_errors = pipeline.score(&at_threshold).unwrap();

    assert_eq!(raw_errors.timestamps(), capped_errors.timestamps());
    let peak = |e: &ErrorSeries| e.errors().iter().cloned().fold(f64::MIN, f64::max);
    assert!(
        peak(&raw_errors) > peak(&capped_errors),
        "-2.0 bar should score worse than the threshold: {} vs {}",
        peak(&raw_errors),
        peak(&capped_errors)
    );
}

// ============================================================================
// Section 6: Inference input checks
// ============================================================================

#[test]
fn test_15_infer_on_weekend_only_is_insufficient() {
    let pipeline = trained_pipeline();
    let saturday = NaiveDate::from_ymd_opt(2024, 2, 10)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let series = to_raw(&drying_line(DryingLineScenario::Nominal, saturday, 100, 15));

    let err = pipeline.infer(&series).unwrap_err();
    assert!(matches!(
        err,
        ClogError::InsufficientData {
            rows: 0,
            required: 7
        }
    ));

    let short = to_raw(&drying_line(DryingLineScenario::Nominal, monday(6), 4, 15));
    assert!(matches!(
        pipeline.infer(&short),
        Err(ClogError::InsufficientData {
            rows: 4,
            required: 7
        })
    ));
}
