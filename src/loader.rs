// clogwatch - Clogging anomaly detection for drying lines
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Raw data loading
//!
//! Two CSV layouts are understood:
//!
//! - **wide**: a `Date`, `DateTime` or `timestamp` column followed by one
//!   column per channel; empty cells are missing readings
//! - **historian export**: free-form preamble, then a
//!   `DateTime,TagName,Value` table with one reading per line. Tags are
//!   pivoted into channels and only timestamps present for every tag are
//!   kept. Values may use a decimal comma and dates are day-first with
//!   Dutch month abbreviations (`05 feb 2024 10:00:00`).
//!
//! Spreadsheet exports are not read; convert them to CSV first.

use crate::error::{FormatError, Result};
use crate::series::{FeatureSchema, RawRow, RawSeries};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::path::Path;

/// Header that starts the table of a historian export
pub const HISTORIAN_HEADER: &str = "DateTime,TagName,Value";

const TIME_COLUMNS: [&str; 3] = ["date", "datetime", "timestamp"];

const TIMESTAMP_FORMATS: [&str; 6] = [
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

const DUTCH_MONTHS: [(&str, &str); 12] = [
    (" jan ", "-01-"),
    (" feb ", "-02-"),
    (" mrt ", "-03-"),
    (" apr ", "-04-"),
    (" mei ", "-05-"),
    (" jun ", "-06-"),
    (" jul ", "-07-"),
    (" aug ", "-08-"),
    (" sep ", "-09-"),
    (" okt ", "-10-"),
    (" nov ", "-11-"),
    (" dec ", "-12-"),
];

/// Parse a plant timestamp.
///
/// Day-first dates, with or without seconds, Dutch month names, and ISO
/// dates are accepted. Fractional seconds are allowed.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime> {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();
    let normalized = DUTCH_MONTHS
        .iter()
        .find(|(month, _)| lower.contains(month))
        .map(|(month, number)| lower.replacen(month, number, 1))
        .unwrap_or_else(|| trimmed.to_string());
    let normalized = match normalized.split_once('.') {
        Some((head, frac)) if frac.chars().all(|c| c.is_ascii_digit()) => head.to_string(),
        _ => normalized,
    };

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok())
        .ok_or_else(|| FormatError::InvalidTimestamp(text.to_string()).into())
}

/// Parse one reading. Empty cells are missing; `,` is accepted as the
/// decimal mark.
pub fn parse_value(text: &str, channel: &str) -> Result<Option<f64>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .map(Some)
        .map_err(|_| {
            FormatError::InvalidValue {
                channel: channel.to_string(),
                value: text.to_string(),
            }
            .into()
        })
}

fn csv_error(err: csv::Error, line_offset: usize) -> FormatError {
    let line = err
        .position()
        .map(|p| p.line() as usize + line_offset)
        .unwrap_or(0);
    FormatError::MalformedCsv {
        line,
        reason: err.to_string(),
    }
}

/// Parse CSV text in either layout.
pub fn parse_csv(text: &str) -> Result<RawSeries> {
    let mut offset = 0;
    for (i, line) in text.split_inclusive('\n').enumerate() {
        if line.trim_start_matches('\u{feff}').starts_with(HISTORIAN_HEADER) {
            return parse_historian(&text[offset..], i);
        }
        offset += line.len();
    }
    parse_wide(text)
}

/// Wide layout: one row per timestamp.
pub fn parse_wide(text: &str) -> Result<RawSeries> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers().map_err(|e| csv_error(e, 0))?.clone();
    let time_column = headers
        .get(0)
        .map(|h| h.trim_start_matches('\u{feff}').to_lowercase())
        .ok_or(FormatError::MissingHeader)?;
    if !TIME_COLUMNS.contains(&time_column.as_str()) {
        return Err(FormatError::MissingHeader.into());
    }
    let channels: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(e, 0))?;
        let timestamp = parse_timestamp(record.get(0).unwrap_or_default())?;
        let values = channels
            .iter()
            .enumerate()
            .map(|(j, name)| parse_value(record.get(j + 1).unwrap_or_default(), name))
            .collect::<Result<Vec<_>>>()?;
        rows.push(RawRow::new(timestamp, values));
    }

    log::debug!("Parsed wide CSV: {} rows, {} channels", rows.len(), channels.len());
    RawSeries::new(channels, rows)
}

/// Historian layout: `DateTime,TagName,Value` lines pivoted per tag.
///
/// `text` starts at the table header; `preamble_lines` is only used for
/// error positions.
pub fn parse_historian(text: &str, preamble_lines: usize) -> Result<RawSeries> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    reader
        .headers()
        .map_err(|e| csv_error(e, preamble_lines))?;

    let mut tags: Vec<String> = Vec::new();
    let mut readings: Vec<HashMap<NaiveDateTime, Option<f64>>> = Vec::new();
    let mut order: Vec<NaiveDateTime> = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| csv_error(e, preamble_lines))?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        let (Some(date), Some(tag)) = (record.get(0), record.get(1)) else {
            return Err(FormatError::MalformedCsv {
                line: record.position().map_or(0, |p| p.line() as usize) + preamble_lines,
                reason: "expected DateTime,TagName,Value".to_string(),
            }
            .into());
        };

        let timestamp = parse_timestamp(date)?;
        // an unquoted decimal comma splits the value over two fields
        let raw_value = record.iter().skip(2).collect::<Vec<_>>().join(",");
        let value = parse_value(&raw_value, tag)?;
        let idx = match tags.iter().position(|t| t == tag) {
            Some(idx) => idx,
            None => {
                tags.push(tag.to_string());
                readings.push(HashMap::new());
                tags.len() - 1
            }
        };
        if idx == 0 {
            order.push(timestamp);
        }
        if readings[idx].insert(timestamp, value).is_some() {
            return Err(
                FormatError::DuplicateTimestamp(format!("{} ({})", timestamp, tag)).into(),
            );
        }
    }

    // inner join on timestamp, in order of the first tag
    let rows: Vec<RawRow> = order
        .into_iter()
        .filter_map(|ts| {
            readings
                .iter()
                .map(|per_tag| per_tag.get(&ts).copied())
                .collect::<Option<Vec<_>>>()
                .map(|values| RawRow::new(ts, values))
        })
        .collect();

    log::debug!(
        "Parsed historian export: {} tags, {} joined rows",
        tags.len(),
        rows.len()
    );
    RawSeries::new(tags, rows)
}

/// Load a raw export from disk.
///
/// Only `.csv` is read. Fails with `MissingFeature` when a schema channel
/// is absent.
pub fn load_path(path: &Path, schema: &FeatureSchema) -> Result<RawSeries> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if extension != "csv" {
        return Err(FormatError::UnsupportedFormat(path.display().to_string()).into());
    }

    let text = std::fs::read_to_string(path).map_err(|e| FormatError::MalformedCsv {
        line: 0,
        reason: format!("{}: {}", path.display(), e),
    })?;
    let series = parse_csv(&text)?;
    series.check_schema(schema)?;
    log::info!(
        "Loaded {} rows from {}",
        series.len(),
        path.display()
    );
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClogError, SchemaError};
    use crate::series::{FEED_FLOW, MOISTURE, PRESSURE_DOWNSTREAM, PRESSURE_UPSTREAM};
    use chrono::NaiveDate;

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("05 feb 2024 10:00:00").unwrap(), at(5, 10, 0));
        assert_eq!(parse_timestamp("05-02-2024 10:00").unwrap(), at(5, 10, 0));
        assert_eq!(parse_timestamp("2024-02-05 10:00:00").unwrap(), at(5, 10, 0));
        assert_eq!(parse_timestamp("2024-02-05T10:00:00").unwrap(), at(5, 10, 0));
        assert_eq!(parse_timestamp("06 FEB 2024 08:30:00.000").unwrap(), at(6, 8, 30));
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(ClogError::Format(FormatError::InvalidTimestamp(_)))
        ));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("0,25", "x").unwrap(), Some(0.25));
        assert_eq!(parse_value(" 3.5 ", "x").unwrap(), Some(3.5));
        assert_eq!(parse_value("", "x").unwrap(), None);
        assert!(parse_value("abc", "x").is_err());
    }

    #[test]
    fn test_parse_wide() {
        let text = "Date,a,b\n2024-02-05 10:01:00,1.0,\n2024-02-05 10:00:00,0.5,2\n";
        let series = parse_csv(text).unwrap();
        assert_eq!(series.channels(), &["a".to_string(), "b".to_string()]);
        assert_eq!(series.timestamps(), vec![at(5, 10, 0), at(5, 10, 1)]);
        assert_eq!(series.column("b").unwrap(), vec![Some(2.0), None]);
    }

    #[test]
    fn test_wide_repeated_header() {
        let text = "Date,a,a\n2024-02-05 10:00:00,1.0,2.0\n";
        assert!(matches!(
            parse_csv(text),
            Err(ClogError::Schema(SchemaError::DuplicateFeature(_)))
        ));
    }

    #[test]
    fn test_wide_without_time_column() {
        assert!(matches!(
            parse_wide("a,b\n1,2\n"),
            Err(ClogError::Format(FormatError::MissingHeader))
        ));
    }

    #[test]
    fn test_parse_historian_pivots_and_joins() {
        let text = "\
Export by historian
Server,plant-1
Tags,2

DateTime,TagName,Value
05 feb 2024 10:00:00,P1,\"0,10\"
05 feb 2024 10:00:00,F1,\"5,5\"
05 feb 2024 10:01:00,P1,\"0,20\"
05 feb 2024 10:01:00,F1,6,0
05 feb 2024 10:02:00,P1,\"0,30\"
";
        let series = parse_csv(text).unwrap();
        assert_eq!(series.channels(), &["P1".to_string(), "F1".to_string()]);
        // 10:02 has no F1 reading and is dropped by the join
        assert_eq!(series.len(), 2);
        assert_eq!(series.column("P1").unwrap(), vec![Some(0.1), Some(0.2)]);
        assert_eq!(series.column("F1").unwrap(), vec![Some(5.5), Some(6.0)]);
    }

    #[test]
    fn test_historian_duplicate_reading() {
        let text = "DateTime,TagName,Value\n05 feb 2024 10:00:00,P1,1\n05 feb 2024 10:00:00,P1,2\n";
        assert!(matches!(
            parse_csv(text),
            Err(ClogError::Format(FormatError::DuplicateTimestamp(_)))
        ));
    }

    #[test]
    fn test_load_path_checks_extension_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let schema = FeatureSchema::default();

        let xlsx = dir.path().join("export.xlsx");
        std::fs::write(&xlsx, b"PK").unwrap();
        assert!(matches!(
            load_path(&xlsx, &schema),
            Err(ClogError::Format(FormatError::UnsupportedFormat(_)))
        ));

        let partial = dir.path().join("partial.csv");
        std::fs::write(
            &partial,
            format!("Date,{}\n2024-02-05 10:00:00,0.1\n", PRESSURE_UPSTREAM),
        )
        .unwrap();
        assert!(matches!(
            load_path(&partial, &schema),
            Err(ClogError::Schema(SchemaError::MissingFeature(_)))
        ));

        let full = dir.path().join("full.csv");
        std::fs::write(
            &full,
            format!(
                "Date,{},{},{},{}\n2024-02-05 10:00:00,0.1,0.2,5,3\n",
                PRESSURE_UPSTREAM, PRESSURE_DOWNSTREAM, FEED_FLOW, MOISTURE
            ),
        )
        .unwrap();
        assert_eq!(load_path(&full, &schema).unwrap().len(), 1);
    }
}
