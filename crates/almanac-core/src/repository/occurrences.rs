use async_trait::async_trait;
use sqlx::{FromRow, Sqlite, Transaction};
use tracing::debug;

use super::{from_columns, to_columns, SqliteRepository};
use crate::calendar::CivilTimestamp;
use crate::error::CoreError;
use crate::models::{Occurrence, RecurrenceFamily};

#[derive(Debug, FromRow)]
struct OccurrenceRow {
    item_id: i64,
    orig_year: i32,
    orig_day: i32,
    orig_minute: i32,
    folder_id: i64,
    event_type: i32,
    family: i32,
    start_year: i32,
    start_day: i32,
    start_minute: i32,
    end_year: i32,
    end_day: i32,
    end_minute: i32,
    notif_year: i32,
    notif_day: i32,
    notif_minute: i32,
    is_extended: bool,
    has_notif: bool,
    title: String,
    override_id: Option<i64>,
}

impl TryFrom<OccurrenceRow> for Occurrence {
    type Error = CoreError;

    fn try_from(row: OccurrenceRow) -> Result<Self, Self::Error> {
        let family = RecurrenceFamily::from_tag(row.family).ok_or_else(|| {
            CoreError::InvalidInput(format!(
                "occurrence of rule {} has unknown family tag {}",
                row.item_id, row.family
            ))
        })?;
        Ok(Occurrence {
            item_id: row.item_id,
            folder_id: row.folder_id,
            event_type: row.event_type,
            family,
            original_start: from_columns(row.orig_year, row.orig_day, row.orig_minute)?,
            effective_start: from_columns(row.start_year, row.start_day, row.start_minute)?,
            effective_end: from_columns(row.end_year, row.end_day, row.end_minute)?,
            effective_notif: from_columns(row.notif_year, row.notif_day, row.notif_minute)?,
            is_extended: row.is_extended,
            has_notif: row.has_notif,
            title: row.title,
            override_id: row.override_id,
        })
    }
}

/// Deletes the `year` bucket and inserts `occurrences` within the caller's transaction.
///
/// An occurrence moved across a year boundary may still sit in its old bucket until that
/// year is rebuilt, so inserts replace any row with the same correlation key.
pub(crate) async fn replace_year(
    tx: &mut Transaction<'_, Sqlite>,
    year: i32,
    occurrences: &[Occurrence],
) -> Result<(), CoreError> {
    let deleted = sqlx::query("DELETE FROM occurrences WHERE year = $1")
        .bind(year)
        .execute(&mut **tx)
        .await?
        .rows_affected();

    for occurrence in occurrences {
        let (orig_year, orig_day, orig_minute) = to_columns(&occurrence.original_start);
        let (start_year, start_day, start_minute) = to_columns(&occurrence.effective_start);
        let (end_year, end_day, end_minute) = to_columns(&occurrence.effective_end);
        let (notif_year, notif_day, notif_minute) = to_columns(&occurrence.effective_notif);

        sqlx::query(
            r#"INSERT OR REPLACE INTO occurrences (item_id, orig_year, orig_day, orig_minute, year,
                folder_id, event_type, family, start_year, start_day, start_minute,
                end_year, end_day, end_minute, notif_year, notif_day, notif_minute,
                is_extended, has_notif, title, override_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20, $21)"#,
        )
        .bind(occurrence.item_id)
        .bind(orig_year)
        .bind(orig_day)
        .bind(orig_minute)
        .bind(occurrence.year())
        .bind(occurrence.folder_id)
        .bind(occurrence.event_type)
        .bind(occurrence.family.tag())
        .bind(start_year)
        .bind(start_day)
        .bind(start_minute)
        .bind(end_year)
        .bind(end_day)
        .bind(end_minute)
        .bind(notif_year)
        .bind(notif_day)
        .bind(notif_minute)
        .bind(occurrence.is_extended)
        .bind(occurrence.has_notif)
        .bind(&occurrence.title)
        .bind(occurrence.override_id)
        .execute(&mut **tx)
        .await?;
    }

    debug!(year, deleted, inserted = occurrences.len(), "replaced occurrence bucket");
    Ok(())
}

#[async_trait]
impl super::OccurrenceRepository for SqliteRepository {
    async fn find_occurrences_between(
        &self,
        start: CivilTimestamp,
        end: CivilTimestamp,
    ) -> Result<Vec<Occurrence>, CoreError> {
        let (from_year, from_day, from_minute) = to_columns(&start);
        let (to_year, to_day, to_minute) = to_columns(&end);
        let rows: Vec<OccurrenceRow> = sqlx::query_as(
            r#"SELECT * FROM occurrences
            WHERE (start_year, start_day, start_minute) >= ($1, $2, $3)
              AND (start_year, start_day, start_minute) <= ($4, $5, $6)
            ORDER BY start_year, start_day, start_minute,
                item_id, orig_year, orig_day, orig_minute"#,
        )
        .bind(from_year)
        .bind(from_day)
        .bind(from_minute)
        .bind(to_year)
        .bind(to_day)
        .bind(to_minute)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(Occurrence::try_from).collect()
    }

    async fn find_occurrences_for_year(&self, year: i32) -> Result<Vec<Occurrence>, CoreError> {
        let rows: Vec<OccurrenceRow> = sqlx::query_as(
            r#"SELECT * FROM occurrences WHERE year = $1
            ORDER BY start_year, start_day, start_minute,
                item_id, orig_year, orig_day, orig_minute"#,
        )
        .bind(year)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(Occurrence::try_from).collect()
    }
}
