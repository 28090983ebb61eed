//! Production calendar
//!
//! The drying line does not run over the weekend, so those readings are
//! removed before training and before inference alike.

use crate::series::RawSeries;
use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};

/// True when a reading falls in the non-production window.
///
/// The window is Friday after 23h, all of Saturday and Sunday up to and
/// including 23h. Hours only go to 23, so the Friday and Sunday clauses
/// never match beyond their own day boundary; the boundary is kept as is
/// so that training and inference see exactly the rows the plant model
/// was built on.
pub fn is_weekend(ts: &NaiveDateTime) -> bool {
    match ts.weekday() {
        Weekday::Fri => ts.hour() > 23,
        Weekday::Sat => true,
        Weekday::Sun => ts.hour() <= 23,
        _ => false,
    }
}

/// Drop weekend rows. Returns the kept series and the number dropped.
pub fn remove_weekends(series: &RawSeries) -> (RawSeries, usize) {
    let rows: Vec<_> = series
        .rows()
        .iter()
        .filter(|r| !is_weekend(&r.timestamp))
        .cloned()
        .collect();
    let dropped = series.len() - rows.len();
    if dropped > 0 {
        log::debug!("Weekend rule dropped {} of {} rows", dropped, series.len());
    }
    (
        RawSeries::from_ordered(series.channels().to_vec(), rows),
        dropped,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::RawRow;
    use chrono::{Duration, NaiveDate};

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_weekday_boundaries() {
        // 2024-02-09 is a Friday
        assert!(!is_weekend(&at(2024, 2, 9, 0)));
        assert!(!is_weekend(&at(2024, 2, 9, 23)));
        assert!(is_weekend(&at(2024, 2, 10, 0)));
        assert!(is_weekend(&at(2024, 2, 10, 23)));
        assert!(is_weekend(&at(2024, 2, 11, 0)));
        assert!(is_weekend(&at(2024, 2, 11, 23)));
        assert!(!is_weekend(&at(2024, 2, 12, 0)));
        assert!(!is_weekend(&at(2024, 2, 7, 12)));
    }

    #[test]
    fn test_remove_weekends_counts_and_is_idempotent() {
        let start = at(2024, 2, 5, 0);
        let rows: Vec<_> = (0..24 * 14)
            .map(|h| RawRow::new(start + Duration::hours(h), vec![Some(h as f64)]))
            .collect();
        let series = RawSeries::new(vec!["a".to_string()], rows).unwrap();

        let (once, dropped) = remove_weekends(&series);
        assert_eq!(dropped, 2 * 2 * 24);
        assert_eq!(once.len(), 10 * 24);
        assert!(once.rows().iter().all(|r| !is_weekend(&r.timestamp)));

        let (twice, dropped_again) = remove_weekends(&once);
        assert_eq!(dropped_again, 0);
        assert_eq!(twice, once);
    }
}
