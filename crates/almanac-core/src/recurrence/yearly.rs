use crate::calendar::CivilTimestamp;
use crate::codec::denormalize;
use crate::models::RecurrenceRule;
use crate::window::RangeWindow;

/// The anchor of `year`: the normalized day resolved for that year at the rule's time of day.
fn anchor(rule: &RecurrenceRule, year: i32, day_of_year: u32) -> CivilTimestamp {
    CivilTimestamp::start_of_year(year)
        .add_days(i64::from(denormalize(year, day_of_year)) - 1)
        .with_minute_of_day(rule.time_of_day)
}

/// At most one start per year. A year whose anchor precedes the window start moves on to
/// the next year and resolves the anchor again.
pub(super) fn starts(
    rule: &RecurrenceRule,
    day_of_year: u32,
    window: &RangeWindow,
) -> Vec<CivilTimestamp> {
    let mut starts = Vec::new();
    for year in window.years() {
        let start = anchor(rule, year, day_of_year);
        if start > window.end {
            break;
        }
        if start >= window.start {
            starts.push(start);
        }
    }
    starts
}
