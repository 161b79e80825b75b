use async_trait::async_trait;
use sqlx::FromRow;
use tracing::info;

use super::{from_columns, to_columns, RuleRepository, SqliteRepository};
use crate::calendar::CivilTimestamp;
use crate::error::CoreError;
use crate::models::{NewOverrideData, Override, RecurrenceRule};
use crate::recurrence::produces;

#[derive(Debug, FromRow)]
struct OverrideRow {
    item_id: i64,
    linked_item_id: i64,
    orig_year: i32,
    orig_day: i32,
    orig_minute: i32,
    start_year: i32,
    start_day: i32,
    start_minute: i32,
    end_year: i32,
    end_day: i32,
    end_minute: i32,
    notif_year: i32,
    notif_day: i32,
    notif_minute: i32,
    has_notif: bool,
}

impl TryFrom<OverrideRow> for Override {
    type Error = CoreError;

    fn try_from(row: OverrideRow) -> Result<Self, Self::Error> {
        Ok(Override {
            item_id: row.item_id,
            linked_item_id: row.linked_item_id,
            original_start: from_columns(row.orig_year, row.orig_day, row.orig_minute)?,
            effective_start: from_columns(row.start_year, row.start_day, row.start_minute)?,
            effective_end: from_columns(row.end_year, row.end_day, row.end_minute)?,
            effective_notif: from_columns(row.notif_year, row.notif_day, row.notif_minute)?,
            has_notif: row.has_notif,
        })
    }
}

/// Checks an override against the rule it targets.
///
/// The original start must be an un-overridden occurrence of the rule inside its series bounds,
/// the effective range must not be inverted, and the effective start may move at most into an
/// adjacent calendar year.
pub fn validate_override(rule: &RecurrenceRule, data: &NewOverrideData) -> Result<(), CoreError> {
    if !rule.contains(&data.original_start) {
        return Err(CoreError::InvalidOverride(format!(
            "{} is outside the series bounds {} .. {}",
            data.original_start, rule.series_start, rule.series_end
        )));
    }
    if !produces(rule, data.original_start) {
        return Err(CoreError::InvalidOverride(format!(
            "rule {} has no occurrence starting at {}",
            rule.item_id, data.original_start
        )));
    }
    if data.effective_end < data.effective_start {
        return Err(CoreError::InvalidOverride(format!(
            "effective end {} is before effective start {}",
            data.effective_end, data.effective_start
        )));
    }
    if (data.effective_start.year() - data.original_start.year()).abs() > 1 {
        return Err(CoreError::InvalidOverride(format!(
            "an occurrence of {} cannot move to {}",
            data.original_start.year(),
            data.effective_start.year()
        )));
    }
    Ok(())
}

#[async_trait]
impl super::OverrideRepository for SqliteRepository {
    async fn add_override(&self, data: NewOverrideData) -> Result<Override, CoreError> {
        let rule = self
            .find_rule(data.linked_item_id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound(format!("Rule with id {} not found", data.linked_item_id))
            })?;
        validate_override(&rule, &data)?;

        let mut tx = self.pool().begin().await?;
        let (orig_year, orig_day, orig_minute) = to_columns(&data.original_start);

        let existing: Option<(i64,)> = sqlx::query_as(
            r#"SELECT item_id FROM rule_overrides
            WHERE linked_item_id = $1 AND orig_year = $2 AND orig_day = $3 AND orig_minute = $4"#,
        )
        .bind(data.linked_item_id)
        .bind(orig_year)
        .bind(orig_day)
        .bind(orig_minute)
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Err(CoreError::DuplicateOverride {
                item_id: data.linked_item_id,
                original: data.original_start,
            });
        }

        let (start_year, start_day, start_minute) = to_columns(&data.effective_start);
        let (end_year, end_day, end_minute) = to_columns(&data.effective_end);
        let (notif_year, notif_day, notif_minute) = to_columns(&data.effective_notif);

        let result = sqlx::query(
            r#"INSERT INTO rule_overrides (linked_item_id, orig_year, orig_day, orig_minute,
                start_year, start_day, start_minute, end_year, end_day, end_minute,
                notif_year, notif_day, notif_minute, has_notif)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"#,
        )
        .bind(data.linked_item_id)
        .bind(orig_year)
        .bind(orig_day)
        .bind(orig_minute)
        .bind(start_year)
        .bind(start_day)
        .bind(start_minute)
        .bind(end_year)
        .bind(end_day)
        .bind(end_minute)
        .bind(notif_year)
        .bind(notif_day)
        .bind(notif_minute)
        .bind(data.has_notif)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let created = Override {
            item_id: result.last_insert_rowid(),
            linked_item_id: data.linked_item_id,
            original_start: data.original_start,
            effective_start: data.effective_start,
            effective_end: data.effective_end,
            effective_notif: data.effective_notif,
            has_notif: data.has_notif,
        };
        info!(
            item_id = created.item_id,
            rule = rule.item_id,
            "override moves {} to {}",
            created.original_start,
            created.effective_start
        );
        self.override_changed(&rule).await?;
        Ok(created)
    }

    async fn find_override(
        &self,
        rule_item_id: i64,
        original_start: CivilTimestamp,
    ) -> Result<Option<Override>, CoreError> {
        let (orig_year, orig_day, orig_minute) = to_columns(&original_start);
        let row: Option<OverrideRow> = sqlx::query_as(
            r#"SELECT * FROM rule_overrides
            WHERE linked_item_id = $1 AND orig_year = $2 AND orig_day = $3 AND orig_minute = $4"#,
        )
        .bind(rule_item_id)
        .bind(orig_year)
        .bind(orig_day)
        .bind(orig_minute)
        .fetch_optional(self.pool())
        .await?;
        row.map(Override::try_from).transpose()
    }

    async fn find_overrides_for_rule(&self, rule_item_id: i64) -> Result<Vec<Override>, CoreError> {
        let rows: Vec<OverrideRow> = sqlx::query_as(
            r#"SELECT * FROM rule_overrides WHERE linked_item_id = $1
            ORDER BY orig_year, orig_day, orig_minute"#,
        )
        .bind(rule_item_id)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(Override::try_from).collect()
    }

    async fn remove_override(
        &self,
        rule_item_id: i64,
        original_start: CivilTimestamp,
    ) -> Result<Override, CoreError> {
        let existing = self.find_override(rule_item_id, original_start).await?.ok_or_else(|| {
            CoreError::NotFound(format!(
                "No override for rule {} at {}",
                rule_item_id, original_start
            ))
        })?;

        sqlx::query("DELETE FROM rule_overrides WHERE item_id = $1")
            .bind(existing.item_id)
            .execute(self.pool())
            .await?;

        info!(item_id = existing.item_id, rule = rule_item_id, "removed override");
        if let Some(rule) = self.find_rule(rule_item_id).await? {
            self.override_changed(&rule).await?;
        }
        Ok(existing)
    }
}
