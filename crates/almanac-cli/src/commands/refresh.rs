use almanac_core::repository::SqliteRepository;
use anyhow::Result;
use chrono::NaiveDate;

use crate::views::table::display_summary;

pub async fn refresh(repo: &SqliteRepository, today: NaiveDate) -> Result<()> {
    let summary = repo.refresh(today).await?;
    display_summary(&summary);
    Ok(())
}
