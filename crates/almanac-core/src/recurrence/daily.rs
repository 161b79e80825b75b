use crate::calendar::CivilTimestamp;
use crate::models::RecurrenceRule;
use crate::window::RangeWindow;

/// Every `every_n_days` days counted from the series start date.
pub(super) fn starts(
    rule: &RecurrenceRule,
    every_n_days: u32,
    window: &RangeWindow,
) -> Vec<CivilTimestamp> {
    let step = i64::from(every_n_days);

    // Realign the window start onto the cadence before walking.
    let since_series_start = rule.series_start.days_until(&window.start);
    let misalignment = since_series_start.rem_euclid(step);
    let mut day = window.start.start_of_day();
    if misalignment != 0 {
        day = day.add_days(step - misalignment);
    }

    let mut current = day.with_minute_of_day(rule.time_of_day);
    let mut starts = Vec::new();
    while current <= window.end {
        if current >= window.start {
            starts.push(current);
        }
        current = current.add_days(step);
    }
    starts
}
