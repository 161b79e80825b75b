use almanac_core::materialization::RollingCache;
use almanac_core::repository::{OccurrenceRepository, SqliteRepository};
use almanac_core::window::RangeWindow;
use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::cli::CalendarCommand;
use crate::util::{parse_series_end, parse_timestamp};
use crate::views::table::display_occurrences;

/// Years inside the rolling window are read from the cache after a refresh; anything else is
/// materialized on demand without being stored.
pub async fn show_calendar(
    repo: &SqliteRepository,
    command: CalendarCommand,
    today: NaiveDate,
) -> Result<()> {
    let occurrences = match (command.from, command.until) {
        (Some(from), Some(until)) => {
            let start = parse_timestamp(&from)?;
            let end = parse_series_end(&until)?;
            let window = RangeWindow::new(start, end)
                .ok_or_else(|| anyhow!("--from must not be after --until"))?;
            repo.materialize_window(&window).await?
        }
        _ => {
            let year = command.year.unwrap_or_else(|| today.year());
            if RollingCache::rolling_years(today.year()).contains(&year) {
                repo.refresh(today).await?;
                repo.find_occurrences_for_year(year).await?
            } else {
                debug!(year, "year outside the rolling cache, materializing on demand");
                repo.materialize_window(&RangeWindow::year(year)).await?
            }
        }
    };

    display_occurrences(&occurrences);
    Ok(())
}
