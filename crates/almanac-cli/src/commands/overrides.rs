use almanac_core::error::CoreError;
use almanac_core::models::NewOverrideData;
use almanac_core::repository::{OverrideRepository, RuleRepository, SqliteRepository};
use anyhow::Result;
use chrono::NaiveDate;
use owo_colors::{OwoColorize, Style};

use crate::cli::{OverrideAction, OverrideAddCommand, OverrideCommand, OverrideRemoveCommand};
use crate::util::parse_timestamp;

pub async fn override_command(
    repo: &SqliteRepository,
    command: OverrideCommand,
    today: NaiveDate,
) -> Result<()> {
    // Populate the cache first so the mutation rebuilds the affected years.
    repo.refresh(today).await?;
    match command.action {
        OverrideAction::Add(command) => add_override(repo, command).await,
        OverrideAction::Rm(command) => remove_override(repo, command).await,
    }
}

async fn add_override(repo: &SqliteRepository, command: OverrideAddCommand) -> Result<()> {
    let rule = repo
        .find_rule(command.id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("Rule with id {} not found", command.id)))?;

    let original = parse_timestamp(&command.original)?;
    let start = parse_timestamp(&command.start)?;
    let mut data = NewOverrideData::moved(&rule, original, start);
    if let Some(end) = &command.end {
        data.effective_end = parse_timestamp(end)?;
    }
    if let Some(notify_at) = &command.notify_at {
        data.effective_notif = parse_timestamp(notify_at)?;
    }
    if command.mute {
        data.has_notif = false;
    }

    let created = repo.add_override(data).await?;
    println!(
        "{} Occurrence {} of '{}' now starts at {}",
        "✓".style(Style::new().green().bold()),
        created.original_start,
        rule.title.bright_white().bold(),
        created.effective_start.to_string().yellow()
    );
    if !created.has_notif {
        println!("  {} Notification muted", "→".blue());
    }
    Ok(())
}

async fn remove_override(repo: &SqliteRepository, command: OverrideRemoveCommand) -> Result<()> {
    let original = parse_timestamp(&command.original)?;
    let removed = repo.remove_override(command.id, original).await?;
    println!(
        "{} Restored occurrence {} of rule {}",
        "✓".style(Style::new().green().bold()),
        removed.original_start.to_string().yellow(),
        removed.linked_item_id
    );
    Ok(())
}
