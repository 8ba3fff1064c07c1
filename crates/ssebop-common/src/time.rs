//! Date handling for scene and climatology lookups.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Half-open date range `[start, end)`, matching collection date filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The single-day range covering `date`.
    pub fn day(date: NaiveDate) -> Self {
        let end = date.checked_add_days(Days::new(1)).unwrap_or(date);
        Self { start: date, end }
    }

    /// Check if a date falls within the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// Parse a `YYYY-MM-DD/YYYY-MM-DD` range or a single `YYYY-MM-DD` day.
    pub fn parse(s: &str) -> Result<Self, TimeParseError> {
        if let Some((start, end)) = s.split_once('/') {
            return Ok(Self::new(parse_date(start)?, parse_date(end)?));
        }
        Ok(Self::day(parse_date(s)?))
    }
}

/// Parse a `YYYY-MM-DD` or compact `YYYYMMDD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, TimeParseError> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .map_err(|_| TimeParseError::InvalidFormat(s.to_string()))
}

/// Milliseconds since the epoch for 0 UTC on `date` (`system:time_start`).
pub fn time_start_millis(date: NaiveDate) -> i64 {
    NaiveDateTime::new(date, NaiveTime::MIN)
        .and_utc()
        .timestamp_millis()
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid date format: {0}")]
    InvalidFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_range_is_half_open() {
        let range = DateRange::day(date(2017, 7, 16));
        assert!(range.contains(date(2017, 7, 16)));
        assert!(!range.contains(date(2017, 7, 17)));
        assert!(!range.contains(date(2017, 7, 15)));
    }

    #[test]
    fn test_parse_range() {
        let range = DateRange::parse("2017-07-01/2017-08-01").unwrap();
        assert_eq!(range.start, date(2017, 7, 1));
        assert_eq!(range.end, date(2017, 8, 1));

        let single = DateRange::parse("20170716").unwrap();
        assert_eq!(single, DateRange::day(date(2017, 7, 16)));

        assert!(DateRange::parse("July 16").is_err());
    }

    #[test]
    fn test_time_start_millis() {
        assert_eq!(time_start_millis(date(1970, 1, 2)), 86_400_000);
        assert_eq!(time_start_millis(date(2017, 7, 16)), 1_500_163_200_000);
    }
}
