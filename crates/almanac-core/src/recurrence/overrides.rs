use std::collections::{HashMap, HashSet};
use tracing::warn;

use super::RawOccurrence;
use crate::calendar::CivilTimestamp;
use crate::models::{Occurrence, Override, RecurrenceRule};
use crate::window::RangeWindow;

/// Applies per-occurrence overrides to the raw expansion of one rule.
///
/// Overrides are looked up by the occurrence's original start. A matched raw occurrence is
/// replaced by the override's effective times while keeping the original start as its key.
/// An overridden occurrence lands in whichever window holds its *effective* start, so an
/// override can pull an instance into a window its original start lies outside of, and
/// pushes it out of the window its original start belongs to.
#[derive(Debug)]
pub struct OverrideResolver<'a> {
    rule: &'a RecurrenceRule,
    by_original: HashMap<CivilTimestamp, &'a Override>,
}

impl<'a> OverrideResolver<'a> {
    /// Indexes the overrides linked to `rule`. Overrides keyed outside the series bounds are
    /// ignored; they can only exist if the rule was edited after the override was stored.
    pub fn new(rule: &'a RecurrenceRule, overrides: &'a [Override]) -> Self {
        let mut by_original = HashMap::with_capacity(overrides.len());
        for ov in overrides.iter().filter(|ov| ov.linked_item_id == rule.item_id) {
            if !rule.contains(&ov.original_start) {
                warn!(
                    item_id = rule.item_id,
                    override_id = ov.item_id,
                    "ignoring override for {} outside the series bounds",
                    ov.original_start
                );
                continue;
            }
            by_original.insert(ov.original_start, ov);
        }
        Self { rule, by_original }
    }

    pub fn lookup(&self, original_start: &CivilTimestamp) -> Option<&'a Override> {
        self.by_original.get(original_start).copied()
    }

    /// Produces the materialized occurrences for `window`, sorted by effective start.
    pub fn resolve(&self, raw: Vec<RawOccurrence>, window: &RangeWindow) -> Vec<Occurrence> {
        let mut matched = HashSet::new();
        let mut occurrences = Vec::with_capacity(raw.len());

        for occurrence in raw {
            match self.lookup(&occurrence.start) {
                Some(ov) => {
                    matched.insert(ov.original_start);
                    if window.contains(&ov.effective_start) {
                        occurrences.push(self.overridden(ov));
                    }
                }
                None => occurrences.push(self.base(&occurrence)),
            }
        }

        // Overrides whose original start the raw expansion did not reach in this window but
        // whose effective start falls inside it.
        occurrences.extend(
            self.by_original
                .values()
                .filter(|ov| !matched.contains(&ov.original_start))
                .filter(|ov| window.contains(&ov.effective_start))
                .map(|ov| self.overridden(ov)),
        );

        occurrences.sort_by_key(|o| (o.effective_start, o.item_id, o.original_start));
        occurrences
    }

    fn base(&self, raw: &RawOccurrence) -> Occurrence {
        Occurrence {
            item_id: self.rule.item_id,
            folder_id: self.rule.folder_id,
            event_type: self.rule.event_type,
            family: self.rule.family(),
            original_start: raw.start,
            effective_start: raw.start,
            effective_end: raw.end,
            effective_notif: raw.notif,
            is_extended: spans_days(&raw.start, &raw.end),
            has_notif: self.rule.has_notifications,
            title: self.rule.title.clone(),
            override_id: None,
        }
    }

    fn overridden(&self, ov: &Override) -> Occurrence {
        Occurrence {
            item_id: self.rule.item_id,
            folder_id: self.rule.folder_id,
            event_type: self.rule.event_type,
            family: self.rule.family(),
            original_start: ov.original_start,
            effective_start: ov.effective_start,
            effective_end: ov.effective_end,
            effective_notif: ov.effective_notif,
            is_extended: spans_days(&ov.effective_start, &ov.effective_end),
            has_notif: ov.has_notif,
            title: self.rule.title.clone(),
            override_id: Some(ov.item_id),
        }
    }
}

fn spans_days(start: &CivilTimestamp, end: &CivilTimestamp) -> bool {
    start.days_until(end) > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cadence, WeekdaySet};
    use crate::recurrence::test_support::{rule, ts};
    use crate::recurrence::{expand, materialize_rule};

    fn override_for(
        r: &RecurrenceRule,
        id: i64,
        original: CivilTimestamp,
        start: CivilTimestamp,
    ) -> Override {
        Override {
            item_id: id,
            linked_item_id: r.item_id,
            original_start: original,
            effective_start: start,
            effective_end: start.add_minutes(30),
            effective_notif: start,
            has_notif: false,
        }
    }

    fn weekly_rule() -> RecurrenceRule {
        // Wednesdays at 10:00; 2024-01-10 is a Wednesday.
        rule(
            Cadence::Weekly {
                every_n_weeks: 1,
                days_of_week: WeekdaySet::from_weekdays([3]),
            },
            ts(2023, 1, 1, 0, 0),
            ts(2025, 12, 31, 23, 59),
            600,
        )
    }

    #[test]
    fn test_override_replaces_matching_occurrence() {
        let r = weekly_rule();
        let original = ts(2024, 1, 10, 10, 0);
        let overrides = vec![override_for(&r, 900, original, ts(2024, 1, 12, 10, 0))];

        let occurrences = materialize_rule(&r, &overrides, &RangeWindow::year(2024));
        let slot: Vec<_> = occurrences.iter().filter(|o| o.original_start == original).collect();
        assert_eq!(slot.len(), 1);
        assert_eq!(slot[0].effective_start, ts(2024, 1, 12, 10, 0));
        assert_eq!(slot[0].override_id, Some(900));
        assert!(!slot[0].has_notif);
        assert_eq!(occurrences.len(), expand(&r, &RangeWindow::year(2024)).len());
    }

    #[test]
    fn test_override_moved_across_year_boundary() {
        let r = weekly_rule();
        // 2025-01-01 is a Wednesday; move it back into 2024.
        let original = ts(2025, 1, 1, 10, 0);
        let overrides = vec![override_for(&r, 901, original, ts(2024, 12, 30, 9, 0))];

        let in_2024 = materialize_rule(&r, &overrides, &RangeWindow::year(2024));
        assert!(in_2024
            .iter()
            .any(|o| o.original_start == original && o.effective_start == ts(2024, 12, 30, 9, 0)));

        let in_2025 = materialize_rule(&r, &overrides, &RangeWindow::year(2025));
        assert!(in_2025.iter().all(|o| o.original_start != original));
        assert!(in_2025.iter().all(|o| o.effective_start.year() == 2025));
    }

    #[test]
    fn test_override_survives_series_end_truncation_of_window() {
        // The overridden occurrence is the last one of the series but has been moved later.
        let mut r = weekly_rule();
        r.series_end = ts(2024, 1, 10, 10, 0);
        let original = ts(2024, 1, 10, 10, 0);
        let overrides = vec![override_for(&r, 902, original, ts(2024, 1, 20, 8, 0))];

        let occurrences = materialize_rule(&r, &overrides, &RangeWindow::year(2024));
        let last = occurrences.last().unwrap();
        assert_eq!(last.original_start, original);
        assert_eq!(last.effective_start, ts(2024, 1, 20, 8, 0));
    }

    #[test]
    fn test_override_outside_series_bounds_is_ignored() {
        let r = weekly_rule();
        let original = ts(2026, 1, 7, 10, 0);
        let overrides = vec![override_for(&r, 903, original, ts(2025, 6, 1, 10, 0))];

        let resolver = OverrideResolver::new(&r, &overrides);
        assert!(resolver.lookup(&original).is_none());
        let occurrences = materialize_rule(&r, &overrides, &RangeWindow::year(2025));
        assert!(occurrences.iter().all(|o| o.override_id.is_none()));
    }

    #[test]
    fn test_overrides_for_other_rules_are_skipped() {
        let r = weekly_rule();
        let mut foreign = override_for(&r, 904, ts(2024, 1, 10, 10, 0), ts(2024, 1, 11, 10, 0));
        foreign.linked_item_id = r.item_id + 1;
        let foreign = vec![foreign];
        assert!(OverrideResolver::new(&r, &foreign).lookup(&ts(2024, 1, 10, 10, 0)).is_none());
    }

    #[test]
    fn test_extended_flag_follows_effective_times() {
        let mut r = weekly_rule();
        r.duration_minutes = 15 * 60;
        let occurrences = materialize_rule(&r, &[], &RangeWindow::year(2024));
        assert!(occurrences.iter().all(|o| o.is_extended));

        r.duration_minutes = 30;
        let occurrences = materialize_rule(&r, &[], &RangeWindow::year(2024));
        assert!(occurrences.iter().all(|o| !o.is_extended));
    }
}
