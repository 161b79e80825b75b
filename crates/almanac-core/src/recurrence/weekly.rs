use crate::calendar::CivilTimestamp;
use crate::models::{RecurrenceRule, WeekdaySet};
use crate::window::RangeWindow;

const DAYS_PER_WEEK: i64 = 7;

/// Sunday 00:00 of the week containing `ts`.
fn week_start(ts: &CivilTimestamp) -> CivilTimestamp {
    ts.start_of_day().add_days(-i64::from(ts.weekday()))
}

/// Selected weekdays of every `every_n_weeks`-th Sunday-anchored week, counted from the week
/// holding the series start.
pub(super) fn starts(
    rule: &RecurrenceRule,
    every_n_weeks: u32,
    days_of_week: WeekdaySet,
    window: &RangeWindow,
) -> Vec<CivilTimestamp> {
    let step = i64::from(every_n_weeks);

    let anchor = week_start(&rule.series_start);
    let mut week = week_start(&window.start);
    let misalignment = (anchor.days_until(&week) / DAYS_PER_WEEK).rem_euclid(step);
    if misalignment != 0 {
        week = week.add_days(DAYS_PER_WEEK * (step - misalignment));
    }

    let mut starts = Vec::new();
    'weeks: while week <= window.end {
        let first = week.with_minute_of_day(rule.time_of_day);
        for weekday in days_of_week.iter() {
            let start = first.add_days(i64::from(weekday));
            if start > window.end {
                break 'weeks;
            }
            if start >= window.start {
                starts.push(start);
            }
        }
        week = week.add_days(DAYS_PER_WEEK * step);
    }
    starts
}

#[cfg(test)]
mod tests {
    use crate::models::{Cadence, WeekdaySet};
    use crate::recurrence::expand;
    use crate::recurrence::test_support::{rule, ts};
    use crate::window::RangeWindow;

    fn weekly(every: u32, days: &str) -> Cadence {
        Cadence::Weekly {
            every_n_weeks: every,
            days_of_week: days.parse::<WeekdaySet>().unwrap(),
        }
    }

    #[test]
    fn test_weekdays_in_order_within_week() {
        // 2024-01-03 is a Wednesday.
        let r = rule(weekly(1, "fri,mon,wed"), ts(2024, 1, 3, 0, 0), ts(2024, 1, 14, 23, 59), 600);
        let starts: Vec<_> = expand(&r, &RangeWindow::year(2024)).iter().map(|o| o.start).collect();
        assert_eq!(
            starts,
            vec![
                ts(2024, 1, 3, 10, 0),
                ts(2024, 1, 5, 10, 0),
                ts(2024, 1, 8, 10, 0),
                ts(2024, 1, 10, 10, 0),
                ts(2024, 1, 12, 10, 0),
            ]
        );
    }

    #[test]
    fn test_every_other_week_aligned_to_series_week() {
        // Series week starts Sunday 2023-12-31; the 2024 window opens in that same week.
        let r = rule(weekly(2, "tue"), ts(2023, 12, 31, 0, 0), ts(2025, 1, 1, 0, 0), 0);
        let raw = expand(&r, &RangeWindow::year(2024));
        assert_eq!(raw[0].start, ts(2024, 1, 2, 0, 0));
        assert_eq!(raw[1].start, ts(2024, 1, 16, 0, 0));
        assert!(raw.windows(2).all(|w| w[0].start.days_until(&w[1].start) == 14));
    }

    #[test]
    fn test_misaligned_window_skips_to_next_recurring_week() {
        // Series week: Sunday 2024-01-07. Window opens in the week of Sunday 2024-01-14, which
        // is an off week for a fortnightly rule.
        let r = rule(weekly(2, "sun,sat"), ts(2024, 1, 7, 0, 0), ts(2024, 12, 31, 23, 59), 60);
        let window = RangeWindow::new(ts(2024, 1, 15, 0, 0), ts(2024, 1, 31, 23, 59)).unwrap();
        let starts: Vec<_> = expand(&r, &window).iter().map(|o| o.start).collect();
        assert_eq!(starts, vec![ts(2024, 1, 21, 1, 0), ts(2024, 1, 27, 1, 0)]);
    }

    #[test]
    fn test_window_end_boundary_is_inclusive() {
        let r = rule(weekly(1, "sun,mon"), ts(2024, 1, 1, 0, 0), ts(2024, 12, 31, 23, 59), 9 * 60);
        let inclusive = RangeWindow::new(ts(2024, 1, 1, 0, 0), ts(2024, 1, 7, 9, 0)).unwrap();
        let starts: Vec<_> = expand(&r, &inclusive).iter().map(|o| o.start).collect();
        assert_eq!(starts, vec![ts(2024, 1, 1, 9, 0), ts(2024, 1, 7, 9, 0)]);

        let exclusive = RangeWindow::new(ts(2024, 1, 1, 0, 0), ts(2024, 1, 7, 8, 59)).unwrap();
        assert_eq!(expand(&r, &exclusive).len(), 1);
    }

    #[test]
    fn test_full_year_count() {
        let r = rule(weekly(1, "mon"), ts(2020, 1, 1, 0, 0), ts(2030, 1, 1, 0, 0), 0);
        // 2024 has 53 Mondays (Jan 1st is a Monday in a leap year).
        assert_eq!(expand(&r, &RangeWindow::year(2024)).len(), 53);
        assert_eq!(expand(&r, &RangeWindow::year(2023)).len(), 52);
    }
}
