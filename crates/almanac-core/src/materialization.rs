//! Rolling-year materialization.
//!
//! The [`MaterializationManager`] keeps the previous, current and next calendar year
//! materialized in the store. Occurrences are bucketed by the year of their effective start,
//! and every year is rebuilt wholesale: expand every intersecting rule, resolve its overrides,
//! then replace the year's rows in one store call.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::models::{Occurrence, Override, RecurrenceFamily, RecurrenceRule};
use crate::recurrence::materialize_rule;
use crate::window::RangeWindow;

/// The storage contract the manager reads rules from and writes occurrences to.
#[async_trait]
pub trait OccurrenceStore: Send + Sync {
    async fn list_rules_intersecting_year(
        &self,
        family: RecurrenceFamily,
        year: i32,
    ) -> Result<Vec<RecurrenceRule>, CoreError>;

    async fn list_overrides(&self, rule_item_id: i64) -> Result<Vec<Override>, CoreError>;

    /// Atomically drops every stored occurrence of `year` and inserts `occurrences`.
    async fn replace_occurrences_for_year(
        &self,
        year: i32,
        occurrences: &[Occurrence],
    ) -> Result<(), CoreError>;

    /// Returns the number of rows deleted.
    async fn delete_occurrences_outside_year_range(
        &self,
        min_year: i32,
        max_year: i32,
    ) -> Result<u64, CoreError>;
}

/// Years currently materialized in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollingCache {
    materialized_years: BTreeSet<i32>,
}

impl RollingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Previous, current and next year around `current_year`.
    pub fn rolling_years(current_year: i32) -> RangeInclusive<i32> {
        (current_year - 1)..=(current_year + 1)
    }

    pub fn materialized_years(&self) -> &BTreeSet<i32> {
        &self.materialized_years
    }

    pub fn is_materialized(&self, year: i32) -> bool {
        self.materialized_years.contains(&year)
    }

    pub fn mark(&mut self, year: i32) {
        self.materialized_years.insert(year);
    }

    /// Forgets every year outside the rolling window of `current_year`, returning them.
    pub fn retain_window(&mut self, current_year: i32) -> Vec<i32> {
        let window = Self::rolling_years(current_year);
        let stale: Vec<i32> = self
            .materialized_years
            .iter()
            .copied()
            .filter(|year| !window.contains(year))
            .collect();
        self.materialized_years.retain(|year| window.contains(year));
        stale
    }
}

/// Statistics collected during a refresh or re-materialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializationSummary {
    /// Year the rolling window was centered on, if this was a refresh
    pub current_year: Option<i32>,
    /// Years dropped from the cache
    pub years_pruned: Vec<i32>,
    /// Years (re)built during the operation
    pub years_materialized: Vec<i32>,
    /// Occurrences written across all rebuilt years
    pub occurrences_written: usize,
    /// Stored occurrence rows deleted by the prune step
    pub occurrences_deleted: u64,
    pub duration_ms: u64,
}

/// Orchestrates expansion, override resolution and the rolling cache.
#[derive(Debug, Default)]
pub struct MaterializationManager {
    cache: RollingCache,
}

impl MaterializationManager {
    /// A manager with an empty cache; the first refresh rebuilds all three years.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &RollingCache {
        &self.cache
    }

    /// Brings the store in line with the rolling window around `today`.
    pub async fn refresh<S>(
        &mut self,
        store: &S,
        today: NaiveDate,
    ) -> Result<MaterializationSummary, CoreError>
    where
        S: OccurrenceStore + ?Sized,
    {
        self.refresh_for_year(store, today.year()).await
    }

    /// Prunes years outside `current_year ± 1`, then materializes whichever of the three
    /// rolling years are not cached yet.
    #[tracing::instrument(skip(self, store))]
    pub async fn refresh_for_year<S>(
        &mut self,
        store: &S,
        current_year: i32,
    ) -> Result<MaterializationSummary, CoreError>
    where
        S: OccurrenceStore + ?Sized,
    {
        let started = Instant::now();
        let window = RollingCache::rolling_years(current_year);
        let mut summary = MaterializationSummary {
            current_year: Some(current_year),
            ..Default::default()
        };

        summary.occurrences_deleted = store
            .delete_occurrences_outside_year_range(*window.start(), *window.end())
            .await?;
        summary.years_pruned = self.cache.retain_window(current_year);
        if !summary.years_pruned.is_empty() || summary.occurrences_deleted > 0 {
            info!(
                years = ?summary.years_pruned,
                rows = summary.occurrences_deleted,
                "pruned occurrences outside {}..={}",
                window.start(),
                window.end()
            );
        }

        for year in window {
            if self.cache.is_materialized(year) {
                continue;
            }
            summary.occurrences_written += self.rebuild_year(store, year).await?;
            summary.years_materialized.push(year);
        }

        summary.duration_ms = elapsed_ms(started);
        Ok(summary)
    }

    /// Computes the occurrences of `year` without persisting them.
    pub async fn materialize_year<S>(
        &self,
        store: &S,
        year: i32,
    ) -> Result<Vec<Occurrence>, CoreError>
    where
        S: OccurrenceStore + ?Sized,
    {
        self.materialize_window(store, &RangeWindow::year(year)).await
    }

    /// Computes the occurrences whose effective start lies in `window` without persisting them.
    ///
    /// Rules are gathered from one year beyond each side of the window so that overrides
    /// pulling an occurrence across a year boundary are found.
    #[tracing::instrument(skip(self, store), fields(start = %window.start, end = %window.end))]
    pub async fn materialize_window<S>(
        &self,
        store: &S,
        window: &RangeWindow,
    ) -> Result<Vec<Occurrence>, CoreError>
    where
        S: OccurrenceStore + ?Sized,
    {
        let mut rules: BTreeMap<i64, RecurrenceRule> = BTreeMap::new();
        for family in RecurrenceFamily::ALL {
            for year in (window.start_year() - 1)..=(window.end_year() + 1) {
                for rule in store.list_rules_intersecting_year(family, year).await? {
                    rules.entry(rule.item_id).or_insert(rule);
                }
            }
        }

        let mut occurrences = Vec::new();
        for rule in rules.values() {
            let overrides = store.list_overrides(rule.item_id).await?;
            occurrences.extend(materialize_rule(rule, &overrides, window));
        }
        occurrences.sort_by_key(|o| (o.effective_start, o.item_id, o.original_start));

        debug!(rules = rules.len(), occurrences = occurrences.len(), "materialized window");
        Ok(occurrences)
    }

    /// Rebuilds every cached year touched by a rule before or after an edit. Pass `None` for
    /// `before` on creation and for `after` on deletion.
    pub async fn rule_changed<S>(
        &mut self,
        store: &S,
        before: Option<&RecurrenceRule>,
        after: Option<&RecurrenceRule>,
    ) -> Result<MaterializationSummary, CoreError>
    where
        S: OccurrenceStore + ?Sized,
    {
        let started = Instant::now();
        let affected: BTreeSet<i32> = self
            .cache
            .materialized_years()
            .iter()
            .copied()
            .filter(|year| before.into_iter().chain(after).any(|rule| touches_year(rule, *year)))
            .collect();

        let mut summary = MaterializationSummary::default();
        for year in affected {
            summary.occurrences_written += self.rebuild_year(store, year).await?;
            summary.years_materialized.push(year);
        }
        summary.duration_ms = elapsed_ms(started);
        Ok(summary)
    }

    /// Rebuilds every cached year the rule's series touches after one of its overrides changed.
    pub async fn override_changed<S>(
        &mut self,
        store: &S,
        rule: &RecurrenceRule,
    ) -> Result<MaterializationSummary, CoreError>
    where
        S: OccurrenceStore + ?Sized,
    {
        self.rule_changed(store, Some(rule), Some(rule)).await
    }

    async fn rebuild_year<S>(&mut self, store: &S, year: i32) -> Result<usize, CoreError>
    where
        S: OccurrenceStore + ?Sized,
    {
        let occurrences = self.materialize_year(store, year).await?;
        store.replace_occurrences_for_year(year, &occurrences).await?;
        self.cache.mark(year);
        info!(year, occurrences = occurrences.len(), "materialized year");
        Ok(occurrences.len())
    }
}

/// A rule touches the years its series spans plus one on each side, where a moved
/// occurrence may have landed.
fn touches_year(rule: &RecurrenceRule, year: i32) -> bool {
    rule.series_start.year() - 1 <= year && year <= rule.series_end.year() + 1
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::CivilTimestamp;
    use crate::models::{Cadence, NewOverrideData};
    use crate::recurrence::test_support::{rule, ts};
    use std::sync::Mutex;

    /// Keeps rules, overrides and per-year occurrence buckets in memory.
    #[derive(Default)]
    struct MemoryStore {
        rules: Mutex<Vec<RecurrenceRule>>,
        overrides: Mutex<Vec<Override>>,
        occurrences: Mutex<BTreeMap<i32, Vec<Occurrence>>>,
    }

    impl MemoryStore {
        fn with_rules(rules: Vec<RecurrenceRule>) -> Self {
            Self {
                rules: Mutex::new(rules),
                ..Default::default()
            }
        }

        fn stored_years(&self) -> Vec<i32> {
            self.occurrences.lock().unwrap().keys().copied().collect()
        }

        fn stored(&self, year: i32) -> Vec<Occurrence> {
            self.occurrences.lock().unwrap().get(&year).cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl OccurrenceStore for MemoryStore {
        async fn list_rules_intersecting_year(
            &self,
            family: RecurrenceFamily,
            year: i32,
        ) -> Result<Vec<RecurrenceRule>, CoreError> {
            Ok(self
                .rules
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.family() == family && r.intersects_year(year))
                .cloned()
                .collect())
        }

        async fn list_overrides(&self, rule_item_id: i64) -> Result<Vec<Override>, CoreError> {
            Ok(self
                .overrides
                .lock()
                .unwrap()
                .iter()
                .filter(|o| o.linked_item_id == rule_item_id)
                .cloned()
                .collect())
        }

        async fn replace_occurrences_for_year(
            &self,
            year: i32,
            occurrences: &[Occurrence],
        ) -> Result<(), CoreError> {
            self.occurrences.lock().unwrap().insert(year, occurrences.to_vec());
            Ok(())
        }

        async fn delete_occurrences_outside_year_range(
            &self,
            min_year: i32,
            max_year: i32,
        ) -> Result<u64, CoreError> {
            let mut occurrences = self.occurrences.lock().unwrap();
            let stale: Vec<i32> = occurrences
                .keys()
                .copied()
                .filter(|year| *year < min_year || *year > max_year)
                .collect();
            let mut deleted = 0;
            for year in stale {
                deleted += occurrences.remove(&year).map_or(0, |rows| rows.len() as u64);
            }
            Ok(deleted)
        }
    }

    fn daily_rule() -> RecurrenceRule {
        rule(
            Cadence::Daily { every_n_days: 7 },
            ts(2020, 1, 1, 0, 0),
            ts(2030, 12, 31, 23, 59),
            8 * 60,
        )
    }

    #[tokio::test]
    async fn test_first_refresh_builds_three_years() {
        let store = MemoryStore::with_rules(vec![daily_rule()]);
        let mut manager = MaterializationManager::new();

        let summary = manager.refresh_for_year(&store, 2024).await.unwrap();
        assert_eq!(summary.years_materialized, vec![2023, 2024, 2025]);
        assert!(summary.years_pruned.is_empty());
        assert_eq!(
            manager.cache().materialized_years().iter().copied().collect::<Vec<_>>(),
            vec![2023, 2024, 2025]
        );
        assert_eq!(store.stored_years(), vec![2023, 2024, 2025]);
        assert!(store.stored(2024).iter().all(|o| o.effective_start.year() == 2024));

        let again = manager.refresh_for_year(&store, 2024).await.unwrap();
        assert!(again.years_materialized.is_empty());
        assert_eq!(again.occurrences_written, 0);
    }

    #[tokio::test]
    async fn test_advancing_year_rolls_window() {
        let store = MemoryStore::with_rules(vec![daily_rule()]);
        let mut manager = MaterializationManager::new();
        manager.refresh_for_year(&store, 2024).await.unwrap();
        let stale_rows = store.stored(2023).len() as u64;

        let summary = manager.refresh_for_year(&store, 2025).await.unwrap();
        assert_eq!(summary.years_pruned, vec![2023]);
        assert_eq!(summary.years_materialized, vec![2026]);
        assert_eq!(summary.occurrences_deleted, stale_rows);
        assert_eq!(
            manager.cache().materialized_years().iter().copied().collect::<Vec<_>>(),
            vec![2024, 2025, 2026]
        );
        assert_eq!(store.stored_years(), vec![2024, 2025, 2026]);
    }

    #[tokio::test]
    async fn test_refresh_from_date() {
        let store = MemoryStore::with_rules(vec![daily_rule()]);
        let mut manager = MaterializationManager::new();
        let today = NaiveDate::from_ymd_opt(2027, 3, 14).unwrap();
        let summary = manager.refresh(&store, today).await.unwrap();
        assert_eq!(summary.current_year, Some(2027));
        assert_eq!(summary.years_materialized, vec![2026, 2027, 2028]);
    }

    #[tokio::test]
    async fn test_materialize_year_is_idempotent() {
        let yearly = rule(
            Cadence::Yearly { day_of_year: 60 },
            ts(2023, 1, 1, 0, 0),
            ts(2030, 12, 31, 23, 59),
            0,
        );
        let store = MemoryStore::with_rules(vec![daily_rule(), yearly]);
        let manager = MaterializationManager::new();

        let first = manager.materialize_year(&store, 2024).await.unwrap();
        let second = manager.materialize_year(&store, 2024).await.unwrap();
        assert_eq!(first, second);
        assert!(first
            .windows(2)
            .all(|pair| pair[0].effective_start <= pair[1].effective_start));
    }

    #[tokio::test]
    async fn test_override_pulls_occurrence_from_neighbouring_series_year() {
        // The series only covers 2025, but one occurrence is moved into late 2024.
        let mut r = daily_rule();
        r.series_start = ts(2025, 1, 1, 0, 0);
        r.series_end = ts(2025, 12, 31, 23, 59);
        let original = ts(2025, 1, 1, 8, 0);
        let moved = NewOverrideData::moved(&r, original, ts(2024, 12, 31, 18, 0));
        let store = MemoryStore::with_rules(vec![r.clone()]);
        store.overrides.lock().unwrap().push(Override {
            item_id: 77,
            linked_item_id: moved.linked_item_id,
            original_start: moved.original_start,
            effective_start: moved.effective_start,
            effective_end: moved.effective_end,
            effective_notif: moved.effective_notif,
            has_notif: moved.has_notif,
        });

        let manager = MaterializationManager::new();
        let in_2024 = manager.materialize_year(&store, 2024).await.unwrap();
        assert_eq!(in_2024.len(), 1);
        assert_eq!(in_2024[0].original_start, original);

        let in_2025 = manager.materialize_year(&store, 2025).await.unwrap();
        assert!(in_2025.iter().all(|o| o.original_start != original));
    }

    #[tokio::test]
    async fn test_rule_change_rebuilds_years_of_old_and_new_bounds() {
        let before = daily_rule();
        let store = MemoryStore::with_rules(vec![before.clone()]);
        let mut manager = MaterializationManager::new();
        manager.refresh_for_year(&store, 2024).await.unwrap();

        // Shrink the series so it ends in 2023; 2024 and 2025 must be cleared.
        let mut after = before.clone();
        after.series_end = ts(2023, 6, 30, 23, 59);
        *store.rules.lock().unwrap() = vec![after.clone()];

        let summary = manager.rule_changed(&store, Some(&before), Some(&after)).await.unwrap();
        assert_eq!(summary.years_materialized, vec![2023, 2024, 2025]);
        assert!(store.stored(2025).is_empty());
        assert!(store
            .stored(2023)
            .iter()
            .all(|o| o.effective_start <= ts(2023, 6, 30, 23, 59)));
    }

    #[tokio::test]
    async fn test_rule_change_skips_unrelated_years() {
        let store = MemoryStore::default();
        let mut manager = MaterializationManager::new();
        manager.refresh_for_year(&store, 2024).await.unwrap();

        let far = rule(
            Cadence::Daily { every_n_days: 1 },
            ts(2030, 1, 1, 0, 0),
            ts(2031, 1, 1, 0, 0),
            0,
        );
        let summary = manager.rule_changed(&store, None, Some(&far)).await.unwrap();
        assert!(summary.years_materialized.is_empty());
    }

    #[test]
    fn test_rolling_cache_retain_window() {
        let mut cache = RollingCache::new();
        for year in [2022, 2023, 2024, 2025] {
            cache.mark(year);
        }
        assert_eq!(cache.retain_window(2024), vec![2022]);
        assert!(cache.is_materialized(2023));
        assert!(!cache.is_materialized(2022));
        assert_eq!(RollingCache::rolling_years(2024), 2023..=2025);
    }

    #[test]
    fn test_touches_year_includes_neighbours() {
        let r = rule(
            Cadence::Daily { every_n_days: 1 },
            CivilTimestamp::date(2024, 3, 1).unwrap(),
            CivilTimestamp::date(2024, 4, 1).unwrap(),
            0,
        );
        assert!(touches_year(&r, 2023));
        assert!(touches_year(&r, 2024));
        assert!(touches_year(&r, 2025));
        assert!(!touches_year(&r, 2026));
    }
}
