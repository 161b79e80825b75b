use crate::calendar::{days_in_month, CivilTimestamp};
use crate::models::{MonthDaySet, RecurrenceRule};
use crate::window::RangeWindow;

const LONGEST_MONTH: u32 = 31;

/// A day fires when its day-of-month bit is set.
///
/// The last-day flag stands in for bits a short month cannot honour: it fires on the final day
/// of a month with fewer than 31 days, and only when no bit past that day is set. A 31-day
/// month is fully covered by the bitmask, so the flag never fires there.
fn fires_on(date: &CivilTimestamp, last_day_of_month: bool, days_of_month: MonthDaySet) -> bool {
    if days_of_month.contains(date.day()) {
        return true;
    }
    last_day_of_month
        && days_in_month(date.year(), date.month()) < LONGEST_MONTH
        && date.is_last_day_of_month()
        && !days_of_month.iter().any(|day| day > date.day())
}

pub(super) fn starts(
    rule: &RecurrenceRule,
    last_day_of_month: bool,
    days_of_month: MonthDaySet,
    window: &RangeWindow,
) -> Vec<CivilTimestamp> {
    let mut current = window.start.with_minute_of_day(rule.time_of_day);
    let mut starts = Vec::new();
    while current <= window.end {
        if current >= window.start && fires_on(&current, last_day_of_month, days_of_month) {
            starts.push(current);
        }
        current = current.add_days(1);
    }
    starts
}
