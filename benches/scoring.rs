//! Benchmarks for scoring and classification throughput

use chrono::{Duration, NaiveDate};
use clogwatch::scoring;
use clogwatch::window::{self, WindowSet};
use clogwatch::{AnomalyClassifier, ClassifierConfig, FeatureSchema, Series};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn generate_series(rows: usize) -> Series {
    let start = NaiveDate::from_ymd_opt(2024, 2, 5)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let timestamps = (0..rows).map(|i| start + Duration::minutes(i as i64)).collect();
    let values = (0..rows)
        .map(|i| {
            let t = i as f64 * 0.05;
            vec![0.5 + 0.4 * t.sin(), 0.5 + 0.3 * t.cos(), (t * 0.5).sin().abs(), 0.6]
        })
        .collect();
    Series::new(FeatureSchema::default(), timestamps, values).unwrap()
}

fn perturbed(windows: &WindowSet) -> WindowSet {
    let data = windows
        .as_slice()
        .iter()
        .enumerate()
        .map(|(i, v)| v + if i % 7 == 0 { 0.05 } else { -0.02 })
        .collect();
    WindowSet::from_flat(windows.n_past(), windows.num_features(), data).unwrap()
}

fn bench_windowing(c: &mut Criterion) {
    let mut group = c.benchmark_group("windowing");
    let series = generate_series(10_000);
    group.throughput(Throughput::Elements(10_000));

    group.bench_function("make_windows_10000_rows", |b| {
        b.iter(|| black_box(window::make_windows(&series, 6).unwrap()))
    });

    group.finish();
}

fn bench_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring");
    let series = generate_series(10_000);
    let windows = window::make_windows(&series, 6).unwrap();
    let recon = perturbed(&windows);
    let timestamps = window::covered_timestamps(&series);
    group.throughput(Throughput::Elements(windows.len() as u64));

    group.bench_function("score_series_10000_rows", |b| {
        b.iter(|| black_box(scoring::score_series(&windows, &recon, &timestamps).unwrap()))
    });

    group.finish();
}

fn bench_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification");
    let series = generate_series(10_000);
    let windows = window::make_windows(&series, 6).unwrap();
    let recon = perturbed(&windows);
    let errors =
        scoring::score_series(&windows, &recon, &window::covered_timestamps(&series)).unwrap();
    let classifier = AnomalyClassifier::new(ClassifierConfig::default());
    group.throughput(Throughput::Elements(errors.len() as u64));

    group.bench_function("classify_10000_points", |b| {
        b.iter(|| black_box(classifier.classify(&errors).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_windowing, bench_scoring, bench_classification);
criterion_main!(benches);
