//! Recurrence expansion: turns a rule plus a target window into concrete occurrences.
//!
//! [`expand`] clips the rule to the window and dispatches on the rule's [`Cadence`] to one
//! expander per family. Every expander yields occurrence starts in ascending order and
//! includes a start iff `window.start <= start <= window.end`. [`materialize_rule`] then
//! applies the rule's overrides through [`OverrideResolver`].

use tracing::debug;

use crate::calendar::CivilTimestamp;
use crate::models::{Cadence, Occurrence, Override, RecurrenceRule};
use crate::window::{gen_window, RangeWindow};

mod daily;
mod monthly;
mod overrides;
mod weekly;
mod yearly;

pub use overrides::OverrideResolver;

/// An occurrence as computed from the rule alone, before overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawOccurrence {
    pub start: CivilTimestamp,
    pub end: CivilTimestamp,
    pub notif: CivilTimestamp,
}

impl RawOccurrence {
    fn for_rule(rule: &RecurrenceRule, start: CivilTimestamp) -> Self {
        Self {
            start,
            end: rule.end_for(&start),
            notif: rule.notification_for(&start),
        }
    }
}

/// Expands `rule` over `target` without applying overrides.
pub fn expand(rule: &RecurrenceRule, target: &RangeWindow) -> Vec<RawOccurrence> {
    let Some(window) = gen_window(rule, target) else {
        return Vec::new();
    };

    let starts = match rule.cadence {
        Cadence::Daily { every_n_days } => daily::starts(rule, every_n_days, &window),
        Cadence::Weekly {
            every_n_weeks,
            days_of_week,
        } => weekly::starts(rule, every_n_weeks, days_of_week, &window),
        Cadence::Monthly {
            last_day_of_month,
            days_of_month,
        } => monthly::starts(rule, last_day_of_month, days_of_month, &window),
        Cadence::Yearly { day_of_year } => yearly::starts(rule, day_of_year, &window),
    };

    starts
        .into_iter()
        .map(|start| RawOccurrence::for_rule(rule, start))
        .collect()
}

/// Whether `start` is one of the un-overridden occurrence starts of `rule`.
pub fn produces(rule: &RecurrenceRule, start: CivilTimestamp) -> bool {
    RangeWindow::new(start, start)
        .map(|window| expand(rule, &window).iter().any(|raw| raw.start == start))
        .unwrap_or(false)
}

/// Expands `rule` over `target` and applies `overrides`.
#[tracing::instrument(skip_all, fields(item_id = rule.item_id, family = %rule.family()))]
pub fn materialize_rule(
    rule: &RecurrenceRule,
    overrides: &[Override],
    target: &RangeWindow,
) -> Vec<Occurrence> {
    let raw = expand(rule, target);
    let raw_count = raw.len();
    let occurrences = OverrideResolver::new(rule, overrides).resolve(raw, target);
    debug!(
        raw = raw_count,
        materialized = occurrences.len(),
        "expanded rule between {} and {}",
        target.start,
        target.end
    );
    occurrences
}
