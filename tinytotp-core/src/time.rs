use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};

const SECONDS_PER_DAY: i64 = 24 * 3600;
const DAYS_PER_MONTH: [i64; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Formats with an explicit UTC offset, tried after RFC 3339.
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%dT%H:%M:%S%:z"];
/// Formats without offset, taken as UTC.
const UTC_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%SZ",
];

/// Error when parsing a [`CalendarTime`] from a string.
#[derive(Debug, thiserror::Error)]
#[error("invalid date `{input}`, expected `YYYY-MM-DD HH:MM:SS` with optional `Z` or `±HH:MM`")]
pub struct ParseTimeError {
    input: String,
    #[source]
    source: chrono::ParseError,
}

/// A calendar date and wall clock time, together with the offset of the time zone it was taken in.
///
/// This exists for callers that don't have a calendar library at hand. No validation is done, a
/// date like the 31st of April is silently treated as the 1st of May. Only parsing from a string
/// rejects impossible dates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CalendarTime {
    /// Full year, like `2024`.
    pub year: i32,
    /// Month in `1..=12`.
    pub month: u32,
    /// Day of the month in `1..=31`.
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// Offset of the local time to UTC in minutes, for example `60` for UTC+1.
    pub utc_offset_minutes: i32,
}

impl CalendarTime {
    /// Create a new calendar time in UTC.
    #[must_use]
    pub fn utc(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            utc_offset_minutes: 0,
        }
    }

    /// Same time, but taken in a time zone with the given offset to UTC.
    #[must_use]
    pub fn with_offset(self, utc_offset_minutes: i32) -> Self {
        Self {
            utc_offset_minutes,
            ..self
        }
    }

    /// Seconds since the Unix epoch, see [`to_timestamp`].
    #[must_use]
    pub fn to_timestamp(&self) -> i64 {
        to_timestamp(
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.utc_offset_minutes,
        )
    }

    fn from_naive(dt: NaiveDateTime) -> Self {
        Self::utc(
            dt.year(),
            dt.month(),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second(),
        )
    }
}

impl FromStr for CalendarTime {
    type Err = ParseTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();

        let mut result = DateTime::parse_from_rfc3339(value);
        for format in OFFSET_FORMATS {
            result = result.or_else(|_| DateTime::parse_from_str(value, format));
        }

        if let Ok(dt) = result {
            return Ok(Self::from_naive(dt.naive_local())
                .with_offset(dt.offset().local_minus_utc() / 60));
        }

        let mut result = NaiveDateTime::parse_from_str(value, UTC_FORMATS[0]);
        for format in &UTC_FORMATS[1..] {
            result = result.or_else(|_| NaiveDateTime::parse_from_str(value, format));
        }

        result
            .map(Self::from_naive)
            .map_err(|source| ParseTimeError {
                input: value.to_owned(),
                source,
            })
    }
}

/// Convert a calendar date and time to the amount of seconds since the Unix epoch
/// (1970-01-01 00:00:00 UTC).
///
/// `utc_offset_minutes` is the offset of the time zone the date was taken in and is subtracted to
/// get to UTC. Dates before 1970 produce negative values.
///
/// # Leap years
///
/// Every year divisible by 4 is treated as leap year. This matches the Gregorian calendar for the
/// years 1901 to 2099, but is one day off for dates after February 2100 (and before March 1900).
/// Changing the rule changes generated codes for these dates, so it is kept as is.
#[must_use]
pub fn to_timestamp(
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    utc_offset_minutes: i32,
) -> i64 {
    let year = i64::from(year);
    let month = month.clamp(1, 12) as usize;

    let mut days = (year - 1970) * 365 + leap_days_since_epoch(year);
    days += DAYS_PER_MONTH[..month - 1].iter().sum::<i64>();
    if month > 2 && is_leap_year(year) {
        days += 1;
    }
    days += i64::from(day) - 1;

    days * SECONDS_PER_DAY + i64::from(hour) * 3600 + i64::from(minute) * 60 + i64::from(second)
        - i64::from(utc_offset_minutes) * 60
}

#[inline(always)]
fn is_leap_year(year: i64) -> bool {
    year % 4 == 0
}

/// Leap years in `1970..year`, negative when `year` lies before 1970.
fn leap_days_since_epoch(year: i64) -> i64 {
    (year - 1).div_euclid(4) - 1969_i64.div_euclid(4)
}
