// clogwatch testdata - Dataset structures
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Generated datasets and their wide CSV form.
//!
//! The CSV layout matches a plant export: a `Date` column followed by one
//! column per channel, empty cells for missing readings.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

/// Timestamp format of the `Date` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header of the timestamp column.
pub const DATE_COLUMN: &str = "Date";

/// Dataset error types.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV parse error at line {line}: {message}")]
    CsvParse { line: usize, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Row has {actual} values, dataset has {expected} channels")]
    RowWidth { expected: usize, actual: usize },

    #[error("Empty dataset")]
    Empty,
}

/// One timestamp worth of readings, in channel order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub timestamp: NaiveDateTime,
    pub values: Vec<Option<f64>>,
}

impl DatasetRow {
    pub fn new(timestamp: NaiveDateTime, values: Vec<Option<f64>>) -> Self {
        Self { timestamp, values }
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }
}

/// Ground truth recorded while generating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectedAnomaly {
    pub sensor_id: String,
    pub label: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Dataset metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_interval_secs: Option<i64>,
    #[serde(default)]
    pub anomalies: Vec<InjectedAnomaly>,
}

/// Time series of plant readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Channel names (column order).
    pub sensor_ids: Vec<String>,
    pub rows: Vec<DatasetRow>,
    #[serde(default)]
    pub metadata: DatasetMetadata,
}

impl Dataset {
    /// Create an empty dataset with given channel names.
    pub fn new(sensor_ids: Vec<String>) -> Self {
        Self {
            sensor_ids,
            rows: Vec::new(),
            metadata: DatasetMetadata::default(),
        }
    }

    pub fn add_row(&mut self, row: DatasetRow) -> Result<(), DatasetError> {
        if row.values.len() != self.sensor_ids.len() {
            return Err(DatasetError::RowWidth {
                expected: self.sensor_ids.len(),
                actual: row.values.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn sensor_ids(&self) -> &[String] {
        &self.sensor_ids
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn sensor_index(&self, sensor_id: &str) -> Option<usize> {
        self.sensor_ids.iter().position(|s| s == sensor_id)
    }

    /// Column by channel name.
    pub fn column(&self, sensor_id: &str) -> Option<Vec<Option<f64>>> {
        let j = self.sensor_index(sensor_id)?;
        Some(self.rows.iter().map(|r| r.get(j)).collect())
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.rows.iter().map(|r| r.timestamp).collect()
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.metadata.name = Some(name.to_string());
        self
    }

    /// Write the wide CSV layout.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), DatasetError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        let mut header = vec![DATE_COLUMN.to_string()];
        header.extend(self.sensor_ids.iter().cloned());
        csv_writer.write_record(&header)?;

        for row in &self.rows {
            let mut record = Vec::with_capacity(row.values.len() + 1);
            record.push(row.timestamp.format(DATE_FORMAT).to_string());
            for value in &row.values {
                record.push(match value {
                    Some(v) => format!("{:.6}", v),
                    None => String::new(),
                });
            }
            csv_writer.write_record(&record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Read the wide CSV layout written by [`Dataset::write_csv`].
    pub fn read_csv<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.get(0) != Some(DATE_COLUMN) {
            return Err(DatasetError::MissingColumn(DATE_COLUMN.to_string()));
        }
        let sensor_ids: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
        let mut dataset = Dataset::new(sensor_ids);

        for (i, record) in csv_reader.records().enumerate() {
            let record = record?;
            let line = i + 2;
            let timestamp = NaiveDateTime::parse_from_str(record.get(0).unwrap_or_default(), DATE_FORMAT)
                .map_err(|e| DatasetError::CsvParse {
                    line,
                    message: format!("invalid timestamp: {}", e),
                })?;

            let mut values = Vec::with_capacity(dataset.sensor_ids.len());
            for (j, sensor_id) in dataset.sensor_ids.iter().enumerate() {
                let cell = record.get(j + 1).unwrap_or_default();
                let value = if cell.is_empty() {
                    None
                } else {
                    Some(cell.parse::<f64>().map_err(|_| DatasetError::CsvParse {
                        line,
                        message: format!("invalid value for {}", sensor_id),
                    })?)
                };
                values.push(value);
            }
            dataset.rows.push(DatasetRow::new(timestamp, values));
        }

        Ok(dataset)
    }

    /// Export to a CSV file.
    pub fn to_csv(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))
    }

    /// Import from a CSV file.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path)?;
        Self::read_csv(std::io::BufReader::new(file))
    }

    /// CSV text, as a plant export would hold it.
    pub fn to_csv_string(&self) -> Result<String, DatasetError> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| DatasetError::CsvParse {
            line: 0,
            message: e.to_string(),
        })
    }

    /// Metadata as pretty JSON.
    pub fn metadata_json(&self) -> Result<String, DatasetError> {
        Ok(serde_json::to_string_pretty(&self.metadata)?)
    }

    /// Basic statistics for a channel.
    pub fn stats(&self, sensor_id: &str) -> Option<SensorStats> {
        let values: Vec<f64> = self.column(sensor_id)?.into_iter().flatten().collect();

        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        Some(SensorStats {
            count,
            mean,
            std_dev: variance.sqrt(),
            min: values.iter().cloned().fold(f64::INFINITY, f64::min),
            max: values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

/// Basic statistics for a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorStats {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::NamedTempFile;

    fn ts(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 5)
            .unwrap()
            .and_hms_opt(8, minute, 0)
            .unwrap()
    }

    fn sample() -> Dataset {
        let mut dataset = Dataset::new(vec!["a\\PV -  (Bar)".to_string(), "flow".to_string()]);
        dataset.add_row(DatasetRow::new(ts(0), vec![Some(0.25), Some(8.0)])).unwrap();
        dataset.add_row(DatasetRow::new(ts(1), vec![None, Some(8.5)])).unwrap();
        dataset
    }

    #[test]
    fn test_row_width_checked() {
        let mut dataset = Dataset::new(vec!["a".to_string()]);
        let err = dataset.add_row(DatasetRow::new(ts(0), vec![Some(1.0), Some(2.0)]));
        assert!(matches!(err, Err(DatasetError::RowWidth { expected: 1, actual: 2 })));
    }

    #[test]
    fn test_column() {
        let dataset = sample();
        assert_eq!(dataset.column("flow"), Some(vec![Some(8.0), Some(8.5)]));
        assert_eq!(dataset.column("missing"), None);
    }

    #[test]
    fn test_csv_layout() {
        let text = sample().to_csv_string().unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Date,a\\PV -  (Bar),flow"));
        assert_eq!(lines.next(), Some("2024-02-05 08:00:00,0.250000,8.000000"));
        assert_eq!(lines.next(), Some("2024-02-05 08:01:00,,8.500000"));
    }

    #[test]
    fn test_csv_file_keeps_missing_values() {
        let dataset = sample();
        let file = NamedTempFile::new().unwrap();

        dataset.to_csv(file.path()).unwrap();
        let loaded = Dataset::from_csv(file.path()).unwrap();

        assert_eq!(loaded.sensor_ids, dataset.sensor_ids);
        assert_eq!(loaded.rows, dataset.rows);
    }

    #[test]
    fn test_missing_date_column() {
        let err = Dataset::read_csv("time,a\n".as_bytes());
        assert!(matches!(err, Err(DatasetError::MissingColumn(_))));
    }

    #[test]
    fn test_bad_value_reports_line() {
        let err = Dataset::read_csv("Date,a\n2024-02-05 08:00:00,1.0\n2024-02-05 08:01:00,x\n".as_bytes());
        assert!(matches!(err, Err(DatasetError::CsvParse { line: 3, .. })));
    }

    #[test]
    fn test_stats() {
        let stats = sample().stats("flow").unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.min, 8.0);
        assert_eq!(stats.max, 8.5);
        assert!((stats.mean - 8.25).abs() < 1e-12);
    }
}
