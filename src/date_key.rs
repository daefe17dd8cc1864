//! Canonical `YYYY-MM-DD` keys for local calendar dates.

use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const CANONICAL_FORMAT: &str = "%Y-%m-%d";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DateKeyError {
    #[error("invalid date (use YYYY-MM-DD): {0}")]
    Malformed(String),
}

/// A calendar date without time or timezone.
///
/// Two keys are equal exactly when their canonical strings are equal, which
/// for a plain date is the same as comparing the dates themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Builds a key from a year, a zero-based month and a day of month.
    ///
    /// Out-of-range months and days roll over into neighbouring months and
    /// years the way calendar arithmetic does: `(2024, 2, 0)` is the last day
    /// of February 2024 and `(2024, 12, 1)` is January 1st 2025. Dates past
    /// the representable range clamp to its bounds.
    pub fn from_parts(year: i32, month0: i32, day: i32) -> Self {
        let year = year.saturating_add(month0.div_euclid(12));
        let month = month0.rem_euclid(12) as u32 + 1;
        let first = match NaiveDate::from_ymd_opt(year, month, 1) {
            Some(date) => date,
            None => return DateKey(saturated(year > 0)),
        };
        match first.checked_add_signed(Duration::days(i64::from(day) - 1)) {
            Some(date) => DateKey(date),
            None => DateKey(saturated(day > 0)),
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        DateKey(date)
    }

    /// Today's date on the local clock.
    pub fn today() -> Self {
        DateKey(Local::now().date_naive())
    }

    /// Parses a canonical, zero-padded `YYYY-MM-DD` string.
    pub fn parse(input: &str) -> Result<Self, DateKeyError> {
        let trimmed = input.trim();
        let date = NaiveDate::parse_from_str(trimmed, CANONICAL_FORMAT)
            .map_err(|_| DateKeyError::Malformed(input.to_string()))?;
        let key = DateKey(date);
        if key.to_canonical() != trimmed {
            return Err(DateKeyError::Malformed(input.to_string()));
        }
        Ok(key)
    }

    pub fn to_canonical(&self) -> String {
        self.0.format(CANONICAL_FORMAT).to_string()
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Month of the year, `0` for January.
    pub fn month0(&self) -> u32 {
        self.0.month0()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// Weekday with Sunday as `0` and Saturday as `6`.
    pub fn weekday_from_sunday(&self) -> u32 {
        self.0.weekday().num_days_from_sunday()
    }

    pub fn as_date(&self) -> NaiveDate {
        self.0
    }
}

fn saturated(upper: bool) -> NaiveDate {
    if upper {
        NaiveDate::MAX
    } else {
        NaiveDate::MIN
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

impl FromStr for DateKey {
    type Err = DateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateKey::parse(s)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical())
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateKey::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_is_zero_padded() {
        assert_eq!(DateKey::from_parts(2024, 2, 5).to_canonical(), "2024-03-05");
        assert_eq!(DateKey::from_parts(987, 0, 1).to_canonical(), "0987-01-01");
    }

    #[test]
    fn test_day_zero_is_last_day_of_previous_month() {
        assert_eq!(DateKey::from_parts(2024, 2, 0).to_canonical(), "2024-02-29");
        assert_eq!(DateKey::from_parts(2023, 2, 0).to_canonical(), "2023-02-28");
        assert_eq!(DateKey::from_parts(2024, 0, 0).to_canonical(), "2023-12-31");
    }

    #[test]
    fn test_month_and_day_rollover() {
        assert_eq!(DateKey::from_parts(2024, 12, 1).to_canonical(), "2025-01-01");
        assert_eq!(DateKey::from_parts(2024, -1, 31).to_canonical(), "2023-12-31");
        assert_eq!(DateKey::from_parts(2023, 1, 29).to_canonical(), "2023-03-01");
        assert_eq!(DateKey::from_parts(2024, 0, 32).to_canonical(), "2024-02-01");
        assert_eq!(DateKey::from_parts(2024, -13, 1).to_canonical(), "2022-12-01");
    }

    #[test]
    fn test_extreme_parts_saturate_instead_of_failing() {
        assert_eq!(DateKey::from_parts(i32::MAX, 0, 1).as_date(), NaiveDate::MAX);
        assert_eq!(DateKey::from_parts(2024, 0, i32::MIN).as_date(), NaiveDate::MIN);
    }

    #[test]
    fn test_parse_accepts_canonical_only() {
        let key = DateKey::parse("2024-03-01").unwrap();
        assert_eq!((key.year(), key.month0(), key.day()), (2024, 2, 1));
        assert!(DateKey::parse("2024-3-1").is_err());
        assert!(DateKey::parse("2024-02-30").is_err());
        assert!(DateKey::parse("2024/03/01").is_err());
        assert!(DateKey::parse("").is_err());
        assert!(DateKey::parse("tomorrow").is_err());
    }

    #[test]
    fn test_equality_follows_canonical_string() {
        let a = DateKey::from_parts(2024, 1, 29);
        let b = DateKey::parse("2024-02-29").unwrap();
        let c = DateKey::from_parts(2024, 2, 0);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_ne!(a, DateKey::from_parts(2024, 1, 28));
    }

    #[test]
    fn test_weekday_from_sunday() {
        // 2024-02-01 was a Thursday, 2024-03-31 a Sunday
        assert_eq!(DateKey::from_parts(2024, 1, 1).weekday_from_sunday(), 4);
        assert_eq!(DateKey::from_parts(2024, 2, 31).weekday_from_sunday(), 0);
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let key = DateKey::from_parts(2024, 5, 7);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"2024-06-07\"");
        let back: DateKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
        assert!(serde_json::from_str::<DateKey>("\"2024-13-01\"").is_err());
    }
}
