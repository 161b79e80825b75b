use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::calendar::CivilTimestamp;
use crate::db::DbPool;
use crate::error::CoreError;
use crate::materialization::{MaterializationManager, MaterializationSummary};
use crate::models::{
    NewOverrideData, NewRuleData, Occurrence, Override, RecurrenceRule, UpdateRuleData,
};
use crate::window::RangeWindow;

pub mod occurrences;
pub mod overrides;
pub mod rules;

/// Domain-specific trait for recurrence rule operations
#[async_trait]
pub trait RuleRepository {
    /// Validates and stores a new rule, assigning its item id.
    async fn add_rule(&self, data: NewRuleData) -> Result<RecurrenceRule, CoreError>;
    async fn find_rule(&self, item_id: i64) -> Result<Option<RecurrenceRule>, CoreError>;
    async fn list_rules(&self) -> Result<Vec<RecurrenceRule>, CoreError>;
    async fn update_rule(
        &self,
        item_id: i64,
        data: UpdateRuleData,
    ) -> Result<RecurrenceRule, CoreError>;
    /// Deletes the rule together with its overrides and materialized occurrences.
    async fn delete_rule(&self, item_id: i64) -> Result<(), CoreError>;
}

/// Domain-specific trait for per-occurrence overrides
#[async_trait]
pub trait OverrideRepository {
    async fn add_override(&self, data: NewOverrideData) -> Result<Override, CoreError>;
    async fn find_override(
        &self,
        rule_item_id: i64,
        original_start: CivilTimestamp,
    ) -> Result<Option<Override>, CoreError>;
    async fn find_overrides_for_rule(&self, rule_item_id: i64) -> Result<Vec<Override>, CoreError>;
    async fn remove_override(
        &self,
        rule_item_id: i64,
        original_start: CivilTimestamp,
    ) -> Result<Override, CoreError>;
}

/// Read access to the materialized occurrence table
#[async_trait]
pub trait OccurrenceRepository {
    /// Occurrences whose effective start lies in `[start, end]`, ordered by effective start.
    async fn find_occurrences_between(
        &self,
        start: CivilTimestamp,
        end: CivilTimestamp,
    ) -> Result<Vec<Occurrence>, CoreError>;
    async fn find_occurrences_for_year(&self, year: i32) -> Result<Vec<Occurrence>, CoreError>;
}

/// Main repository trait that composes all domain traits
pub trait Repository: RuleRepository + OverrideRepository + OccurrenceRepository {}

/// SQLite implementation of the repository pattern. Rule and override mutations re-materialize
/// the cached years they touch through the owned [`MaterializationManager`].
pub struct SqliteRepository {
    pool: DbPool,
    materialization_manager: Mutex<MaterializationManager>,
}

impl SqliteRepository {
    /// Starts with an empty rolling cache; the first refresh rebuilds all three years.
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            materialization_manager: Mutex::new(MaterializationManager::new()),
        }
    }

    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Runs the rolling-year refresh for `today` against this store.
    pub async fn refresh(&self, today: NaiveDate) -> Result<MaterializationSummary, CoreError> {
        let mut manager = self.materialization_manager.lock().await;
        manager.refresh(self, today).await
    }

    pub async fn refresh_for_year(
        &self,
        current_year: i32,
    ) -> Result<MaterializationSummary, CoreError> {
        let mut manager = self.materialization_manager.lock().await;
        manager.refresh_for_year(self, current_year).await
    }

    /// Computes occurrences for an arbitrary window without touching the cache.
    pub async fn materialize_window(
        &self,
        window: &RangeWindow,
    ) -> Result<Vec<Occurrence>, CoreError> {
        let manager = self.materialization_manager.lock().await;
        manager.materialize_window(self, window).await
    }

    pub async fn materialized_years(&self) -> Vec<i32> {
        let manager = self.materialization_manager.lock().await;
        manager.cache().materialized_years().iter().copied().collect()
    }

    pub(crate) async fn rule_changed(
        &self,
        before: Option<&RecurrenceRule>,
        after: Option<&RecurrenceRule>,
    ) -> Result<MaterializationSummary, CoreError> {
        let mut manager = self.materialization_manager.lock().await;
        manager.rule_changed(self, before, after).await
    }

    pub(crate) async fn override_changed(
        &self,
        rule: &RecurrenceRule,
    ) -> Result<MaterializationSummary, CoreError> {
        let mut manager = self.materialization_manager.lock().await;
        manager.override_changed(self, rule).await
    }
}

impl Repository for SqliteRepository {}

/// Splits a timestamp into the `(year, day-of-year, minute-of-day)` columns it is stored as.
pub(crate) fn to_columns(ts: &CivilTimestamp) -> (i32, i32, i32) {
    let (year, day, minute) = ts.ordinal();
    // Both fit comfortably: day <= 366, minute < 1440.
    (year, day as i32, minute as i32)
}

pub(crate) fn from_columns(year: i32, day: i32, minute: i32) -> Result<CivilTimestamp, CoreError> {
    let invalid = || {
        CoreError::InvalidTimestamp(format!(
            "stored triple ({year}, {day}, {minute}) is not a valid timestamp"
        ))
    };
    let day = u32::try_from(day).map_err(|_| invalid())?;
    let minute = u32::try_from(minute).map_err(|_| invalid())?;
    CivilTimestamp::from_ordinal(year, day, minute).ok_or_else(invalid)
}
