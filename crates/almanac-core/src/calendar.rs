//! Naive wall-clock calendar arithmetic.
//!
//! Everything here works on local civil time with minute resolution. There is no time-zone
//! or DST handling: a [`CivilTimestamp`] is exactly what the user typed into the organizer.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Cumulative day counts before the first of each month in a common year.
const DAYS_BEFORE_MONTH: [u32; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

/// Gregorian leap-year rule.
#[inline]
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[inline]
pub fn days_in_year(year: i32) -> u32 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

/// Number of days in `month` (1..=12) of `year`.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

fn days_before_month(year: i32, month: u32) -> u32 {
    let leap = u32::from(month > 2 && is_leap_year(year));
    DAYS_BEFORE_MONTH[(month - 1) as usize] + leap
}

/// Days since 1970-01-01 for a proleptic Gregorian date.
fn days_from_civil(year: i32, month: u32, day: u32) -> i64 {
    let y = i64::from(year) - i64::from(month <= 2);
    let era = y.div_euclid(400);
    let yoe = y.rem_euclid(400);
    let mp = i64::from((month + 9) % 12);
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Inverse of [`days_from_civil`].
fn civil_from_days(days: i64) -> (i32, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = (yoe + era * 400 + i64::from(month <= 2)) as i32;
    (year, month, day)
}

/// A local wall-clock instant with minute resolution.
///
/// Field order makes the derived `Ord` the lexicographic year → month → day → hour → minute
/// comparison, which is the same order as (year, day-of-year, minute-of-day).
///
/// Serializes as `YYYY-MM-DD HH:MM` and deserializes through [`FromStr`], so fields are always
/// range-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CivilTimestamp {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
}

impl CivilTimestamp {
    /// Builds a timestamp from calendar fields, or `None` if any field is out of range.
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<Self> {
        if !(1..=12).contains(&month)
            || day == 0
            || day > days_in_month(year, month)
            || hour > 23
            || minute > 59
        {
            return None;
        }
        Some(Self {
            year,
            month,
            day,
            hour,
            minute,
        })
    }

    /// Midnight of the given date.
    pub fn date(year: i32, month: u32, day: u32) -> Option<Self> {
        Self::new(year, month, day, 0, 0)
    }

    /// January 1st 00:00 of `year`.
    pub fn start_of_year(year: i32) -> Self {
        Self::from_epoch_days(days_from_civil(year, 1, 1))
    }

    /// Builds a timestamp from the (year, day-of-year, minute-of-day) triple used in storage.
    pub fn from_ordinal(year: i32, day_of_year: u32, minute_of_day: u32) -> Option<Self> {
        if day_of_year == 0 || day_of_year > days_in_year(year) || minute_of_day >= MINUTES_PER_DAY
        {
            return None;
        }
        Some(
            Self::start_of_year(year)
                .add_days(i64::from(day_of_year) - 1)
                .with_minute_of_day(minute_of_day),
        )
    }

    /// Midnight of the date `days` after 1970-01-01.
    fn from_epoch_days(days: i64) -> Self {
        let (year, month, day) = civil_from_days(days);
        Self {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
        }
    }

    fn epoch_days(&self) -> i64 {
        days_from_civil(self.year, self.month, self.day)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// Actual 1-based calendar day of the year (not normalized).
    pub fn day_of_year(&self) -> u32 {
        days_before_month(self.year, self.month) + self.day
    }

    pub fn minute_of_day(&self) -> u32 {
        self.hour * 60 + self.minute
    }

    /// Minutes elapsed since January 1st 00:00 of the same year.
    pub fn minute_of_year(&self) -> u32 {
        (self.day_of_year() - 1) * MINUTES_PER_DAY + self.minute_of_day()
    }

    /// The storage triple (year, day-of-year, minute-of-day).
    pub fn ordinal(&self) -> (i32, u32, u32) {
        (self.year, self.day_of_year(), self.minute_of_day())
    }

    /// Day of week, 0 = Sunday through 6 = Saturday.
    pub fn weekday(&self) -> u32 {
        // 1970-01-01 was a Thursday.
        (self.epoch_days() + 4).rem_euclid(7) as u32
    }

    pub fn is_last_day_of_month(&self) -> bool {
        self.day == days_in_month(self.year, self.month)
    }

    /// Midnight of the same date.
    pub fn start_of_day(&self) -> Self {
        Self {
            hour: 0,
            minute: 0,
            ..*self
        }
    }

    /// Same date at `minute_of_day`; values past the end of the day roll into later days.
    pub fn with_minute_of_day(&self, minute_of_day: u32) -> Self {
        self.start_of_day().add_minutes(i64::from(minute_of_day))
    }

    pub fn add_days(&self, days: i64) -> Self {
        Self {
            hour: self.hour,
            minute: self.minute,
            ..Self::from_epoch_days(self.epoch_days() + days)
        }
    }

    pub fn add_minutes(&self, minutes: i64) -> Self {
        let total = i64::from(self.minute_of_day()) + minutes;
        let days = total.div_euclid(i64::from(MINUTES_PER_DAY));
        let rest = total.rem_euclid(i64::from(MINUTES_PER_DAY)) as u32;
        Self {
            hour: rest / 60,
            minute: rest % 60,
            ..Self::from_epoch_days(self.epoch_days() + days)
        }
    }

    /// Adds calendar months. A day that does not exist in the target month rolls over into
    /// the following month (January 31st plus one month is March 3rd, or 2nd in leap years).
    pub fn add_months(&self, months: i32) -> Self {
        let index = (self.month as i32 - 1) + months;
        let year = self.year + index.div_euclid(12);
        let month = index.rem_euclid(12) as u32 + 1;
        self.rebase(year, month)
    }

    /// Adds calendar years, rolling February 29th into March 1st of common years.
    pub fn add_years(&self, years: i32) -> Self {
        self.rebase(self.year + years, self.month)
    }

    fn rebase(&self, year: i32, month: u32) -> Self {
        let first = days_from_civil(year, month, 1);
        Self {
            hour: self.hour,
            minute: self.minute,
            ..Self::from_epoch_days(first + i64::from(self.day) - 1)
        }
    }

    /// Whole calendar days from `self`'s date to `other`'s date; times of day are ignored.
    pub fn days_until(&self, other: &Self) -> i64 {
        other.epoch_days() - self.epoch_days()
    }

    /// Signed minutes from `self` to `other`.
    pub fn minutes_until(&self, other: &Self) -> i64 {
        self.days_until(other) * i64::from(MINUTES_PER_DAY) + i64::from(other.minute_of_day())
            - i64::from(self.minute_of_day())
    }

    /// Wall-clock ordering; ties resolve on every field in turn.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)?
            .and_hms_opt(self.hour, self.minute, 0)
    }
}

/// Calendar days between the dates of two timestamps.
pub fn days_between(from: &CivilTimestamp, to: &CivilTimestamp) -> i64 {
    from.days_until(to)
}

impl From<NaiveDateTime> for CivilTimestamp {
    fn from(value: NaiveDateTime) -> Self {
        Self {
            year: value.year(),
            month: value.month(),
            day: value.day(),
            hour: value.hour(),
            minute: value.minute(),
        }
    }
}

impl From<NaiveDate> for CivilTimestamp {
    fn from(value: NaiveDate) -> Self {
        value.and_time(NaiveTime::MIN).into()
    }
}

impl fmt::Display for CivilTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute
        )
    }
}

impl TryFrom<String> for CivilTimestamp {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CivilTimestamp> for String {
    fn from(value: CivilTimestamp) -> Self {
        value.to_string()
    }
}

impl FromStr for CivilTimestamp {
    type Err = CoreError;

    /// Accepts `YYYY-MM-DD HH:MM`, `YYYY-MM-DDTHH:MM` or a bare `YYYY-MM-DD` (midnight).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M")
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
            .map(Self::from)
            .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Self::from))
            .map_err(|_| CoreError::InvalidTimestamp(s.to_string()))
    }
}
