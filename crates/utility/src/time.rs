//! Pure, deterministic helpers over local time-of-day (`HH:MM`) and dates.
//!
//! Nothing here touches I/O or the system clock; every function is a total
//! or explicitly fallible computation over its inputs.

use std::fmt;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

const MINUTES_PER_DAY: u16 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeError {
    /// Input was not a well-formed `HH:MM` string (two digit hour 00-23,
    /// two digit minute 00-59).
    InvalidFormat(String),
    /// Adding/subtracting minutes would cross midnight. The source this spec
    /// was distilled from wraps silently here; this implementation treats
    /// the wrap as a validation error instead.
    Wrapped,
    /// `duration_minutes` was asked for with an end time at or before the
    /// start time on the same day.
    NegativeDuration,
    /// The date string was not a well-formed `YYYY-MM-DD` date.
    InvalidDate(String),
}

impl fmt::Display for TimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeError::InvalidFormat(s) => {
                write!(f, "'{s}' is not a valid HH:MM time")
            }
            TimeError::Wrapped => {
                write!(f, "time arithmetic would wrap past midnight")
            }
            TimeError::NegativeDuration => {
                write!(f, "end time is not after start time")
            }
            TimeError::InvalidDate(s) => {
                write!(f, "'{s}' is not a valid YYYY-MM-DD date")
            }
        }
    }
}

impl std::error::Error for TimeError {}

/// A time of day, stored as minutes since midnight (`0..=1439`).
///
/// Comparing two `TimeOfDay` values is equivalent to comparing their
/// zero-padded `HH:MM` string representations lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn from_minutes(minutes: u16) -> Result<Self, TimeError> {
        if minutes >= MINUTES_PER_DAY {
            return Err(TimeError::Wrapped);
        }
        Ok(Self(minutes))
    }

    pub fn parse(value: &str) -> Result<Self, TimeError> {
        let invalid = || TimeError::InvalidFormat(value.to_owned());
        let (hours, minutes) = value.split_once(':').ok_or_else(invalid)?;
        if hours.len() != 2 || minutes.len() != 2 {
            return Err(invalid());
        }
        let hours: u16 = hours.parse().map_err(|_| invalid())?;
        let minutes: u16 = minutes.parse().map_err(|_| invalid())?;
        if hours > 23 || minutes > 59 {
            return Err(invalid());
        }
        Ok(Self(hours * 60 + minutes))
    }

    pub fn minutes_since_midnight(&self) -> u16 {
        self.0
    }

    /// Adds (or subtracts, for negative values) whole minutes. Crossing
    /// midnight in either direction is a validation error, not a silent
    /// modulo wrap.
    pub fn add_minutes(&self, minutes: i64) -> Result<Self, TimeError> {
        let result = self.0 as i64 + minutes;
        if result < 0 || result >= MINUTES_PER_DAY as i64 {
            return Err(TimeError::Wrapped);
        }
        Ok(Self(result as u16))
    }

    /// Duration in minutes from `self` to `other`, which must be the same
    /// day and strictly later.
    pub fn duration_minutes_until(&self, other: &Self) -> Result<u32, TimeError> {
        if other.0 <= self.0 {
            return Err(TimeError::NegativeDuration);
        }
        Ok((other.0 - self.0) as u32)
    }

    pub fn format(&self) -> String {
        format!("{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format())
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        TimeOfDay::parse(&s).map_err(de::Error::custom)
    }
}

/// Returns the lowercase weekday name (`sunday`..`saturday`) used to index
/// into POI weekly-hours maps, for a `YYYY-MM-DD` date string.
pub fn weekday_key(date: &str) -> Result<&'static str, TimeError> {
    let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| TimeError::InvalidDate(date.to_owned()))?;
    Ok(match parsed.weekday() {
        Weekday::Sun => "sunday",
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
    })
}

/// Number of whole days spanned by `[start, end]` inclusive, i.e.
/// `ceil((end - start) / 1 day)` (a single-day trip is 1 day).
pub fn inclusive_day_count(start: &str, end: &str) -> Result<u32, TimeError> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .map_err(|_| TimeError::InvalidDate(start.to_owned()))?;
    let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")
        .map_err(|_| TimeError::InvalidDate(end.to_owned()))?;
    let days = (end - start).num_days() + 1;
    if days < 1 {
        return Err(TimeError::InvalidDate(format!("{start} is after {end}")));
    }
    Ok(days as u32)
}

/// The calendar date of `day` (1-indexed) within a trip starting on
/// `trip_start`, as a `YYYY-MM-DD` string.
pub fn date_for_day(trip_start: &str, day: u32) -> Result<String, TimeError> {
    let start = NaiveDate::parse_from_str(trip_start, "%Y-%m-%d")
        .map_err(|_| TimeError::InvalidDate(trip_start.to_owned()))?;
    if day < 1 {
        return Err(TimeError::InvalidDate(format!("day {day} is not 1-indexed")));
    }
    let date = start
        .checked_add_days(Days::new((day - 1) as u64))
        .ok_or_else(|| TimeError::InvalidDate(format!("day {day} overflows the calendar")))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_then_format_is_identity() {
        for s in ["00:00", "09:30", "23:59"] {
            assert_eq!(TimeOfDay::parse(s).unwrap().format(), s);
        }
    }

    #[test]
    fn adding_zero_is_identity() {
        let t = TimeOfDay::parse("10:15").unwrap();
        assert_eq!(t.add_minutes(0).unwrap(), t);
    }

    #[test]
    fn add_then_subtract_equal_amounts_is_identity() {
        let t = TimeOfDay::parse("10:15").unwrap();
        let round_tripped = t.add_minutes(45).unwrap().add_minutes(-45).unwrap();
        assert_eq!(t, round_tripped);
    }

    #[test]
    fn crossing_midnight_is_an_error_not_a_wrap() {
        let t = TimeOfDay::parse("23:50").unwrap();
        assert_eq!(t.add_minutes(20), Err(TimeError::Wrapped));
        let early = TimeOfDay::parse("00:05").unwrap();
        assert_eq!(early.add_minutes(-10), Err(TimeError::Wrapped));
    }

    #[test]
    fn comparison_matches_lexicographic_string_order() {
        let a = TimeOfDay::parse("09:05").unwrap();
        let b = TimeOfDay::parse("09:30").unwrap();
        assert!(a < b);
        assert!(a.format() < b.format());
    }

    #[test]
    fn duration_requires_strictly_later_end() {
        let a = TimeOfDay::parse("10:00").unwrap();
        let b = TimeOfDay::parse("11:30").unwrap();
        assert_eq!(a.duration_minutes_until(&b), Ok(90));
        assert_eq!(b.duration_minutes_until(&a), Err(TimeError::NegativeDuration));
        assert_eq!(a.duration_minutes_until(&a), Err(TimeError::NegativeDuration));
    }

    #[test]
    fn weekday_key_matches_known_date() {
        // 2025-03-01 is a Saturday.
        assert_eq!(weekday_key("2025-03-01"), Ok("saturday"));
    }

    #[test]
    fn inclusive_day_count_covers_single_and_multi_day_ranges() {
        assert_eq!(inclusive_day_count("2025-03-01", "2025-03-01"), Ok(1));
        assert_eq!(inclusive_day_count("2025-03-01", "2025-03-02"), Ok(2));
    }

    #[test]
    fn date_for_day_is_one_indexed_from_trip_start() {
        assert_eq!(date_for_day("2025-03-01", 1), Ok("2025-03-01".to_string()));
        assert_eq!(date_for_day("2025-03-01", 2), Ok("2025-03-02".to_string()));
    }
}
