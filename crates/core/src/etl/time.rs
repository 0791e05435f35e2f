//! Derivation of `time` dimension rows from event timestamps

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Timelike};

use crate::models::TimeRow;

/// Timestamp outside the range chrono can represent
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timestamp {0} ms is out of range")]
pub struct TimestampError(pub i64);

/// Break an epoch-millisecond instant into its UTC calendar fields
pub fn time_row(start_time: i64) -> Result<TimeRow, TimestampError> {
    let dt = DateTime::from_timestamp_millis(start_time).ok_or(TimestampError(start_time))?;

    Ok(TimeRow {
        start_time,
        hour: dt.hour() as i32,
        day: dt.day() as i32,
        week: dt.iso_week().week() as i32,
        month: dt.month() as i32,
        year: dt.year(),
        weekday: dt.weekday().num_days_from_monday() as i32,
    })
}

/// One row per distinct timestamp, in first-seen order
pub fn derive_time_rows<I>(timestamps: I) -> Result<Vec<TimeRow>, TimestampError>
where
    I: IntoIterator<Item = i64>,
{
    let mut seen = HashSet::new();
    let mut rows = Vec::new();

    for ts in timestamps {
        if seen.insert(ts) {
            rows.push(time_row(ts)?);
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_row_fields() {
        let row = time_row(1541105830796).unwrap();
        assert_eq!(
            row,
            TimeRow {
                start_time: 1541105830796,
                hour: 20,
                day: 1,
                week: 44,
                month: 11,
                year: 2018,
                weekday: 3,
            }
        );
    }

    #[test]
    fn test_time_row_epoch() {
        let row = time_row(0).unwrap();
        assert_eq!((row.hour, row.day, row.week), (0, 1, 1));
        assert_eq!((row.month, row.year, row.weekday), (1, 1970, 3));
    }

    #[test]
    fn test_iso_week_crosses_year() {
        // 2018-12-31 is a Monday in ISO week 1 of 2019; the year field stays
        // the calendar year.
        let row = time_row(1546214400000).unwrap();
        assert_eq!(row.week, 1);
        assert_eq!(row.year, 2018);
        assert_eq!(row.weekday, 0);
    }

    #[test]
    fn test_equal_timestamps_collapse() {
        let rows =
            derive_time_rows([1541106106796, 1541105830796, 1541106106796]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].start_time, 1541106106796);
        assert_eq!(rows[0].hour, 21);
        assert_eq!(rows[1].start_time, 1541105830796);
    }

    #[test]
    fn test_out_of_range_timestamp() {
        assert_eq!(time_row(i64::MAX), Err(TimestampError(i64::MAX)));
        assert!(derive_time_rows([1, i64::MIN]).is_err());
    }

    #[test]
    fn test_empty_input() {
        assert!(derive_time_rows(Vec::new()).unwrap().is_empty());
    }
}
