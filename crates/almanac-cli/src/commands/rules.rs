use almanac_core::repository::RuleRepository;
use anyhow::Result;

use crate::views::table::display_rules;

pub async fn list_rules(repo: &impl RuleRepository) -> Result<()> {
    let rules = repo.list_rules().await?;
    display_rules(&rules);
    Ok(())
}
