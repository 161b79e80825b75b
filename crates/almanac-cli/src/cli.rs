use almanac_core::models::RecurrenceFamily;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Recurring reminders with a rolling three-year occurrence calendar
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add a recurring reminder
    Add(AddCommand),
    /// List recurring reminders
    Rules,
    /// Delete a recurring reminder with its overrides
    Delete(DeleteCommand),
    /// Move, retime or mute a single occurrence
    Override(OverrideCommand),
    /// Rebuild the cached previous/current/next years
    Refresh,
    /// Show occurrences for a year or an explicit range
    Calendar(CalendarCommand),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyArg {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl From<FamilyArg> for RecurrenceFamily {
    fn from(value: FamilyArg) -> Self {
        match value {
            FamilyArg::Daily => RecurrenceFamily::Daily,
            FamilyArg::Weekly => RecurrenceFamily::Weekly,
            FamilyArg::Monthly => RecurrenceFamily::Monthly,
            FamilyArg::Yearly => RecurrenceFamily::Yearly,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// Recurrence family
    #[arg(value_enum)]
    pub family: FamilyArg,
    /// Title of the reminder
    pub title: String,
    /// First day of the series (YYYY-MM-DD or "YYYY-MM-DD HH:MM")
    #[arg(long)]
    pub from: String,
    /// Last day of the series; a bare date includes the whole day
    #[arg(long)]
    pub until: String,
    /// Time of day each occurrence starts (HH:MM)
    #[arg(long)]
    pub at: String,
    /// Duration in minutes
    #[arg(long)]
    pub duration: Option<u32>,
    /// Notification lead time in minutes; negative values notify after the start
    #[arg(long, allow_hyphen_values = true, conflicts_with = "no_notify")]
    pub notify: Option<i32>,
    /// Disable notifications for the series
    #[arg(long)]
    pub no_notify: bool,
    #[arg(long)]
    pub folder: Option<i64>,
    #[arg(long)]
    pub event_type: Option<i32>,
    /// Interval for daily and weekly rules
    #[arg(long)]
    pub every: Option<u32>,
    /// Weekdays for weekly rules (sun,mon,tue,wed,thu,fri,sat)
    #[arg(long)]
    pub on: Option<String>,
    /// Days of the month for monthly rules (e.g. 1,15,31)
    #[arg(long)]
    pub days: Option<String>,
    /// Also fire on the last day of every month
    #[arg(long)]
    pub last_day: bool,
    /// Anchor date for yearly rules (MM-DD)
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// Item id of the rule
    pub id: i64,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct OverrideCommand {
    #[command(subcommand)]
    pub action: OverrideAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum OverrideAction {
    /// Override one occurrence of a rule
    Add(OverrideAddCommand),
    /// Remove an override, restoring the computed occurrence
    Rm(OverrideRemoveCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct OverrideAddCommand {
    /// Item id of the rule
    pub id: i64,
    /// Computed start of the occurrence to override
    #[arg(long)]
    pub original: String,
    /// New start
    #[arg(long)]
    pub start: String,
    /// New end; defaults to the rule's duration after the new start
    #[arg(long)]
    pub end: Option<String>,
    /// New notification time; defaults to the rule's lead time before the new start
    #[arg(long)]
    pub notify_at: Option<String>,
    /// Silence the notification for this occurrence
    #[arg(long)]
    pub mute: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct OverrideRemoveCommand {
    /// Item id of the rule
    pub id: i64,
    /// Computed start of the overridden occurrence
    #[arg(long)]
    pub original: String,
}

#[derive(Parser, Debug, Clone)]
pub struct CalendarCommand {
    /// Year to show; defaults to the current year
    #[arg(long, conflicts_with_all = ["from", "until"])]
    pub year: Option<i32>,
    /// Start of an explicit range
    #[arg(long, requires = "until")]
    pub from: Option<String>,
    /// End of an explicit range
    #[arg(long, requires = "from")]
    pub until: Option<String>,
}
