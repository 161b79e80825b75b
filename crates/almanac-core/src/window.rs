use serde::{Deserialize, Serialize};

use crate::calendar::{days_in_year, CivilTimestamp, MINUTES_PER_DAY};
use crate::models::RecurrenceRule;

/// An inclusive wall-clock range. Whole-year windows come from [`RangeWindow::year`]; any other
/// range can be built with [`RangeWindow::new`] for on-demand materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeWindow {
    pub start: CivilTimestamp,
    pub end: CivilTimestamp,
}

impl RangeWindow {
    /// Returns `None` when `start` is after `end`.
    pub fn new(start: CivilTimestamp, end: CivilTimestamp) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// January 1st 00:00 through December 31st 23:59 of `year`.
    pub fn year(year: i32) -> Self {
        let last_minute = days_in_year(year) * MINUTES_PER_DAY - 1;
        let start = CivilTimestamp::start_of_year(year);
        Self {
            start,
            end: start.add_minutes(i64::from(last_minute)),
        }
    }

    pub fn start_year(&self) -> i32 {
        self.start.year()
    }

    pub fn end_year(&self) -> i32 {
        self.end.year()
    }

    pub fn start_minute_of_year(&self) -> u32 {
        self.start.minute_of_year()
    }

    /// 525599 for a whole common year, 527039 for a whole leap year.
    pub fn end_minute_of_year(&self) -> u32 {
        self.end.minute_of_year()
    }

    pub fn contains(&self, ts: &CivilTimestamp) -> bool {
        self.start <= *ts && *ts <= self.end
    }

    /// Every calendar year the window touches.
    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start_year()..=self.end_year()
    }

    /// Intersection with `[start, end]`, or `None` when they do not overlap.
    pub fn clip(&self, start: CivilTimestamp, end: CivilTimestamp) -> Option<Self> {
        Self::new(self.start.max(start), self.end.min(end))
    }
}

/// Clips a rule's series bounds against `target`. `None` means the rule contributes no
/// occurrences to the window, which is not an error.
pub fn gen_window(rule: &RecurrenceRule, target: &RangeWindow) -> Option<RangeWindow> {
    target.clip(rule.series_start, rule.series_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cadence;
    use rstest::rstest;

    fn daily_rule(start: CivilTimestamp, end: CivilTimestamp) -> RecurrenceRule {
        RecurrenceRule {
            item_id: 7,
            folder_id: 0,
            event_type: 0,
            series_start: start,
            series_end: end,
            time_of_day: 0,
            duration_minutes: 0,
            notif_offset_minutes: 0,
            has_notifications: false,
            title: String::new(),
            cadence: Cadence::Daily { every_n_days: 1 },
        }
    }

    #[rstest]
    #[case(2023, 525_599)]
    #[case(2024, 527_039)]
    fn test_year_window_bounds(#[case] year: i32, #[case] last_minute: u32) {
        let window = RangeWindow::year(year);
        assert_eq!(window.start_year(), year);
        assert_eq!(window.end_year(), year);
        assert_eq!(window.start_minute_of_year(), 0);
        assert_eq!(window.end_minute_of_year(), last_minute);
        assert_eq!(window.end, CivilTimestamp::new(year, 12, 31, 23, 59).unwrap());
    }

    #[test]
    fn test_gen_window_clips_series() {
        let rule = daily_rule(
            CivilTimestamp::new(2023, 6, 1, 8, 0).unwrap(),
            CivilTimestamp::new(2025, 2, 1, 8, 0).unwrap(),
        );

        let first = gen_window(&rule, &RangeWindow::year(2023)).unwrap();
        assert_eq!(first.start, rule.series_start);
        assert_eq!(first.end, RangeWindow::year(2023).end);

        let middle = gen_window(&rule, &RangeWindow::year(2024)).unwrap();
        assert_eq!(middle, RangeWindow::year(2024));

        let last = gen_window(&rule, &RangeWindow::year(2025)).unwrap();
        assert_eq!(last.start, RangeWindow::year(2025).start);
        assert_eq!(last.end, rule.series_end);

        assert!(gen_window(&rule, &RangeWindow::year(2026)).is_none());
    }

    #[test]
    fn test_gen_window_ties_on_minute() {
        // Series ending exactly when the window starts still overlaps at that single minute.
        let rule = daily_rule(
            CivilTimestamp::date(2020, 1, 1).unwrap(),
            CivilTimestamp::date(2024, 1, 1).unwrap(),
        );
        let window = gen_window(&rule, &RangeWindow::year(2024)).unwrap();
        assert_eq!(window.start, window.end);
    }

    #[test]
    fn test_new_rejects_inverted_range() {
        let a = CivilTimestamp::date(2024, 1, 2).unwrap();
        let b = CivilTimestamp::date(2024, 1, 1).unwrap();
        assert!(RangeWindow::new(a, b).is_none());
        assert!(RangeWindow::new(b, a).is_some());
    }
}
