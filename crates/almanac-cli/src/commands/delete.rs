use almanac_core::repository::{RuleRepository, SqliteRepository};
use anyhow::Result;
use chrono::NaiveDate;
use owo_colors::{OwoColorize, Style};

pub async fn delete_rule(repo: &SqliteRepository, item_id: i64, today: NaiveDate) -> Result<()> {
    repo.delete_rule(item_id).await?;
    // Re-establish the cache for this process; occurrences of the rule are already gone.
    repo.refresh(today).await?;
    println!(
        "{} Deleted reminder {} with its overrides and occurrences",
        "✓".style(Style::new().green().bold()),
        item_id.to_string().yellow()
    );
    Ok(())
}
