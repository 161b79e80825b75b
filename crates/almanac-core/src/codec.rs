//! Normalized day-of-year codec for yearly anchors.
//!
//! Yearly rules store their anchor as a day index in the leap-year calendar (1..=366), so the
//! same value names the same month/day whatever year it is applied to. Day 60 is February
//! 29th; in a common year it collapses onto February 28th (actual day 59) and every later
//! day shifts down by one, which makes 366 always the last day of the year.
//!
//! Every yearly computation goes through [`denormalize`]; nothing else maps normalized days
//! to calendar days.

use crate::calendar::is_leap_year;

/// Normalized index of February 29th.
pub const LEAP_DAY: u32 = 60;

/// Largest normalized day.
pub const MAX_NORMALIZED_DAY: u32 = 366;

/// Maps a normalized day (1..=366) to the actual 1-based day of year in `year`.
pub fn denormalize(year: i32, normalized_day: u32) -> u32 {
    if is_leap_year(year) || normalized_day < LEAP_DAY {
        normalized_day
    } else {
        normalized_day - 1
    }
}

/// Maps an actual day of year in `year` to its normalized index.
///
/// In common years February 28th stays 59, so [`LEAP_DAY`] is never produced for them.
pub fn normalize(year: i32, actual_day: u32) -> u32 {
    if is_leap_year(year) || actual_day < LEAP_DAY {
        actual_day
    } else {
        actual_day + 1
    }
}
