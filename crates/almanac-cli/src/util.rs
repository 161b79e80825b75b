use almanac_core::calendar::{CivilTimestamp, MINUTES_PER_DAY};
use almanac_core::error::CoreError;
use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveTime, Timelike};

/// Parses `YYYY-MM-DD HH:MM`, `YYYY-MM-DDTHH:MM` or `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(input: &str) -> Result<CivilTimestamp> {
    Ok(input.parse::<CivilTimestamp>()?)
}

/// Like [`parse_timestamp`], but a bare date means the last minute of that day.
pub fn parse_series_end(input: &str) -> Result<CivilTimestamp> {
    match NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d") {
        Ok(date) => Ok(CivilTimestamp::from(date).with_minute_of_day(MINUTES_PER_DAY - 1)),
        Err(_) => parse_timestamp(input),
    }
}

/// Parses `HH:MM` into a minute of the day.
pub fn parse_time_of_day(input: &str) -> Result<u32> {
    let time = NaiveTime::parse_from_str(input.trim(), "%H:%M").map_err(|_| {
        anyhow!(CoreError::InvalidInput(format!(
            "Invalid time of day '{}', expected HH:MM",
            input
        )))
    })?;
    Ok(time.hour() * 60 + time.minute())
}

/// Parses `MM-DD` into a normalized day of year, so `02-29` is the leap-day anchor.
pub fn parse_month_day(input: &str) -> Result<u32> {
    let invalid = || {
        anyhow!(CoreError::InvalidInput(format!(
            "Invalid date '{}', expected MM-DD",
            input
        )))
    };
    let (month, day) = input.trim().split_once('-').ok_or_else(invalid)?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    let day: u32 = day.parse().map_err(|_| invalid())?;
    // Day indexes of a leap year are the normalized ones.
    CivilTimestamp::date(2000, month, day)
        .map(|date| date.day_of_year())
        .ok_or_else(invalid)
}

pub fn format_minute_of_day(minute: u32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}
