use async_trait::async_trait;
use sqlx::{FromRow, Sqlite, Transaction};
use tracing::info;

use super::{from_columns, to_columns, SqliteRepository};
use crate::error::CoreError;
use crate::materialization::OccurrenceStore;
use crate::models::{
    Cadence, MonthDaySet, NewRuleData, Occurrence, Override, RecurrenceFamily, RecurrenceRule,
    UpdateRuleData, WeekdaySet,
};

/// A `recurrence_rules` row. Cadence columns that do not belong to the row's family are NULL.
#[derive(Debug, FromRow)]
struct RuleRow {
    item_id: i64,
    folder_id: i64,
    event_type: i32,
    family: i32,
    start_year: i32,
    start_day: i32,
    start_minute: i32,
    end_year: i32,
    end_day: i32,
    end_minute: i32,
    time_of_day: i32,
    duration_minutes: i32,
    notif_offset_minutes: i32,
    has_notifications: bool,
    title: String,
    every_n_days: Option<i32>,
    every_n_weeks: Option<i32>,
    days_of_week: Option<i32>,
    last_day_of_month: Option<bool>,
    days_of_month: Option<i64>,
    day_of_year: Option<i32>,
}

fn column<T>(value: Option<T>, name: &str, item_id: i64) -> Result<T, CoreError> {
    value.ok_or_else(|| {
        CoreError::InvalidRule(format!("rule {item_id} is missing its {name} column"))
    })
}

fn unsigned(value: i32, name: &str, item_id: i64) -> Result<u32, CoreError> {
    u32::try_from(value)
        .map_err(|_| CoreError::InvalidRule(format!("rule {item_id} has a negative {name}")))
}

fn unsigned_column(value: Option<i32>, name: &str, item_id: i64) -> Result<u32, CoreError> {
    unsigned(column(value, name, item_id)?, name, item_id)
}

impl TryFrom<RuleRow> for RecurrenceRule {
    type Error = CoreError;

    fn try_from(row: RuleRow) -> Result<Self, Self::Error> {
        let id = row.item_id;
        let family = RecurrenceFamily::from_tag(row.family).ok_or_else(|| {
            CoreError::InvalidRule(format!("rule {id} has unknown family tag {}", row.family))
        })?;

        let cadence = match family {
            RecurrenceFamily::Daily => Cadence::Daily {
                every_n_days: unsigned_column(row.every_n_days, "every_n_days", id)?,
            },
            RecurrenceFamily::Weekly => Cadence::Weekly {
                every_n_weeks: unsigned_column(row.every_n_weeks, "every_n_weeks", id)?,
                days_of_week: WeekdaySet::from_bits(
                    column(row.days_of_week, "days_of_week", id)? as u8,
                ),
            },
            RecurrenceFamily::Monthly => Cadence::Monthly {
                last_day_of_month: row.last_day_of_month.unwrap_or(false),
                days_of_month: MonthDaySet::from_bits(
                    column(row.days_of_month, "days_of_month", id)? as u32,
                ),
            },
            RecurrenceFamily::Yearly => Cadence::Yearly {
                day_of_year: unsigned_column(row.day_of_year, "day_of_year", id)?,
            },
        };

        Ok(RecurrenceRule {
            item_id: id,
            folder_id: row.folder_id,
            event_type: row.event_type,
            series_start: from_columns(row.start_year, row.start_day, row.start_minute)?,
            series_end: from_columns(row.end_year, row.end_day, row.end_minute)?,
            time_of_day: unsigned(row.time_of_day, "time_of_day", id)?,
            duration_minutes: unsigned(row.duration_minutes, "duration_minutes", id)?,
            notif_offset_minutes: row.notif_offset_minutes,
            has_notifications: row.has_notifications,
            title: row.title,
            cadence,
        })
    }
}

/// Family-specific column values for binding.
#[derive(Debug, Default)]
struct CadenceColumns {
    every_n_days: Option<i64>,
    every_n_weeks: Option<i64>,
    days_of_week: Option<i64>,
    last_day_of_month: Option<bool>,
    days_of_month: Option<i64>,
    day_of_year: Option<i64>,
}

impl From<&Cadence> for CadenceColumns {
    fn from(cadence: &Cadence) -> Self {
        match *cadence {
            Cadence::Daily { every_n_days } => Self {
                every_n_days: Some(i64::from(every_n_days)),
                ..Default::default()
            },
            Cadence::Weekly {
                every_n_weeks,
                days_of_week,
            } => Self {
                every_n_weeks: Some(i64::from(every_n_weeks)),
                days_of_week: Some(i64::from(days_of_week.bits())),
                ..Default::default()
            },
            Cadence::Monthly {
                last_day_of_month,
                days_of_month,
            } => Self {
                last_day_of_month: Some(last_day_of_month),
                days_of_month: Some(i64::from(days_of_month.bits())),
                ..Default::default()
            },
            Cadence::Yearly { day_of_year } => Self {
                day_of_year: Some(i64::from(day_of_year)),
                ..Default::default()
            },
        }
    }
}

async fn fetch_rule(
    tx: &mut Transaction<'_, Sqlite>,
    item_id: i64,
) -> Result<Option<RecurrenceRule>, CoreError> {
    let row: Option<RuleRow> = sqlx::query_as("SELECT * FROM recurrence_rules WHERE item_id = $1")
        .bind(item_id)
        .fetch_optional(&mut **tx)
        .await?;
    row.map(RecurrenceRule::try_from).transpose()
}

#[async_trait]
impl super::RuleRepository for SqliteRepository {
    async fn add_rule(&self, data: NewRuleData) -> Result<RecurrenceRule, CoreError> {
        // Validate with a placeholder id before touching the database.
        RecurrenceRule::from_new(0, data.clone()).validate()?;

        let (start_year, start_day, start_minute) = to_columns(&data.series_start);
        let (end_year, end_day, end_minute) = to_columns(&data.series_end);
        let cadence = CadenceColumns::from(&data.cadence);

        let result = sqlx::query(
            r#"INSERT INTO recurrence_rules (folder_id, event_type, family,
                start_year, start_day, start_minute, end_year, end_day, end_minute,
                time_of_day, duration_minutes, notif_offset_minutes, has_notifications, title,
                every_n_days, every_n_weeks, days_of_week, last_day_of_month, days_of_month,
                day_of_year)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20)"#,
        )
        .bind(data.folder_id)
        .bind(data.event_type)
        .bind(data.cadence.family().tag())
        .bind(start_year)
        .bind(start_day)
        .bind(start_minute)
        .bind(end_year)
        .bind(end_day)
        .bind(end_minute)
        .bind(i64::from(data.time_of_day))
        .bind(i64::from(data.duration_minutes))
        .bind(data.notif_offset_minutes)
        .bind(data.has_notifications)
        .bind(&data.title)
        .bind(cadence.every_n_days)
        .bind(cadence.every_n_weeks)
        .bind(cadence.days_of_week)
        .bind(cadence.last_day_of_month)
        .bind(cadence.days_of_month)
        .bind(cadence.day_of_year)
        .execute(self.pool())
        .await?;

        let rule = RecurrenceRule::from_new(result.last_insert_rowid(), data);
        info!(item_id = rule.item_id, family = %rule.family(), "added recurrence rule");
        self.rule_changed(None, Some(&rule)).await?;
        Ok(rule)
    }

    async fn find_rule(&self, item_id: i64) -> Result<Option<RecurrenceRule>, CoreError> {
        let row: Option<RuleRow> =
            sqlx::query_as("SELECT * FROM recurrence_rules WHERE item_id = $1")
                .bind(item_id)
                .fetch_optional(self.pool())
                .await?;
        row.map(RecurrenceRule::try_from).transpose()
    }

    async fn list_rules(&self) -> Result<Vec<RecurrenceRule>, CoreError> {
        let rows: Vec<RuleRow> = sqlx::query_as("SELECT * FROM recurrence_rules ORDER BY item_id")
            .fetch_all(self.pool())
            .await?;
        rows.into_iter().map(RecurrenceRule::try_from).collect()
    }

    async fn update_rule(
        &self,
        item_id: i64,
        data: UpdateRuleData,
    ) -> Result<RecurrenceRule, CoreError> {
        let mut tx = self.pool().begin().await?;

        let before = fetch_rule(&mut tx, item_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Rule with id {} not found", item_id)))?;
        let after = before.updated(data);
        after.validate()?;

        let (start_year, start_day, start_minute) = to_columns(&after.series_start);
        let (end_year, end_day, end_minute) = to_columns(&after.series_end);
        let cadence = CadenceColumns::from(&after.cadence);

        sqlx::query(
            r#"UPDATE recurrence_rules SET folder_id = $1, event_type = $2, family = $3,
                start_year = $4, start_day = $5, start_minute = $6,
                end_year = $7, end_day = $8, end_minute = $9,
                time_of_day = $10, duration_minutes = $11, notif_offset_minutes = $12,
                has_notifications = $13, title = $14,
                every_n_days = $15, every_n_weeks = $16, days_of_week = $17,
                last_day_of_month = $18, days_of_month = $19, day_of_year = $20
            WHERE item_id = $21"#,
        )
        .bind(after.folder_id)
        .bind(after.event_type)
        .bind(after.family().tag())
        .bind(start_year)
        .bind(start_day)
        .bind(start_minute)
        .bind(end_year)
        .bind(end_day)
        .bind(end_minute)
        .bind(i64::from(after.time_of_day))
        .bind(i64::from(after.duration_minutes))
        .bind(after.notif_offset_minutes)
        .bind(after.has_notifications)
        .bind(&after.title)
        .bind(cadence.every_n_days)
        .bind(cadence.every_n_weeks)
        .bind(cadence.days_of_week)
        .bind(cadence.last_day_of_month)
        .bind(cadence.days_of_month)
        .bind(cadence.day_of_year)
        .bind(item_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(item_id, "updated recurrence rule");
        self.rule_changed(Some(&before), Some(&after)).await?;
        Ok(after)
    }

    async fn delete_rule(&self, item_id: i64) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;

        let rule = fetch_rule(&mut tx, item_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Rule with id {} not found", item_id)))?;

        sqlx::query("DELETE FROM occurrences WHERE item_id = $1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;
        // Overrides go with the rule through ON DELETE CASCADE.
        sqlx::query("DELETE FROM recurrence_rules WHERE item_id = $1")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(item_id, "deleted recurrence rule");
        self.rule_changed(Some(&rule), None).await?;
        Ok(())
    }
}

#[async_trait]
impl OccurrenceStore for SqliteRepository {
    async fn list_rules_intersecting_year(
        &self,
        family: RecurrenceFamily,
        year: i32,
    ) -> Result<Vec<RecurrenceRule>, CoreError> {
        let rows: Vec<RuleRow> = sqlx::query_as(
            r#"SELECT * FROM recurrence_rules
            WHERE family = $1 AND start_year <= $2 AND end_year >= $2
            ORDER BY item_id"#,
        )
        .bind(family.tag())
        .bind(year)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(RecurrenceRule::try_from).collect()
    }

    async fn list_overrides(&self, rule_item_id: i64) -> Result<Vec<Override>, CoreError> {
        use super::OverrideRepository;
        self.find_overrides_for_rule(rule_item_id).await
    }

    async fn replace_occurrences_for_year(
        &self,
        year: i32,
        occurrences: &[Occurrence],
    ) -> Result<(), CoreError> {
        let mut tx = self.pool().begin().await?;
        super::occurrences::replace_year(&mut tx, year, occurrences).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_occurrences_outside_year_range(
        &self,
        min_year: i32,
        max_year: i32,
    ) -> Result<u64, CoreError> {
        let result = sqlx::query("DELETE FROM occurrences WHERE year < $1 OR year > $2")
            .bind(min_year)
            .bind(max_year)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
