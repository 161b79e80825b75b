use almanac_core::calendar::CivilTimestamp;
use almanac_core::codec::normalize;
use almanac_core::models::{Cadence, MonthDaySet, NewRuleData, RecurrenceFamily, WeekdaySet};
use almanac_core::repository::{RuleRepository, SqliteRepository};
use anyhow::Result;
use chrono::NaiveDate;
use owo_colors::{OwoColorize, Style};

use crate::cli::AddCommand;
use crate::config::RuleDefaults;
use crate::util::{
    format_minute_of_day, parse_month_day, parse_series_end, parse_time_of_day, parse_timestamp,
};
use crate::views::table::{describe_cadence, display_summary};

/// Builds the cadence from the family flags. Omitted selectors fall back to the series start:
/// its weekday, its day of the month, or its date for yearly rules.
pub fn cadence_from_command(
    command: &AddCommand,
    series_start: &CivilTimestamp,
) -> Result<Cadence> {
    let cadence = match RecurrenceFamily::from(command.family) {
        RecurrenceFamily::Daily => Cadence::Daily {
            every_n_days: command.every.unwrap_or(1),
        },
        RecurrenceFamily::Weekly => Cadence::Weekly {
            every_n_weeks: command.every.unwrap_or(1),
            days_of_week: match &command.on {
                Some(days) => days.parse::<WeekdaySet>()?,
                None => WeekdaySet::from_weekdays([series_start.weekday()]),
            },
        },
        RecurrenceFamily::Monthly => {
            let days_of_month = match &command.days {
                Some(days) => days.parse::<MonthDaySet>()?,
                None if command.last_day => MonthDaySet::EMPTY,
                None => MonthDaySet::from_days([series_start.day()]),
            };
            Cadence::Monthly {
                last_day_of_month: command.last_day,
                days_of_month,
            }
        }
        RecurrenceFamily::Yearly => Cadence::Yearly {
            day_of_year: match &command.date {
                Some(date) => parse_month_day(date)?,
                None => normalize(series_start.year(), series_start.day_of_year()),
            },
        },
    };
    Ok(cadence)
}

pub async fn add_rule(
    repo: &SqliteRepository,
    command: AddCommand,
    defaults: &RuleDefaults,
    today: NaiveDate,
) -> Result<()> {
    let series_start = parse_timestamp(&command.from)?;
    let series_end = parse_series_end(&command.until)?;
    let cadence = cadence_from_command(&command, &series_start)?;

    let data = NewRuleData {
        folder_id: command.folder.unwrap_or(0),
        event_type: command.event_type.unwrap_or(0),
        series_start,
        series_end,
        time_of_day: parse_time_of_day(&command.at)?,
        duration_minutes: command.duration.unwrap_or(defaults.duration_minutes),
        notif_offset_minutes: command.notify.unwrap_or(defaults.notif_offset_minutes),
        has_notifications: !command.no_notify
            && (command.notify.is_some() || defaults.has_notifications),
        title: command.title,
        cadence,
    };

    let rule = repo.add_rule(data).await?;

    let success_style = Style::new().green().bold();
    let info_style = Style::new().blue();
    println!(
        "{} Created {} reminder: {}",
        "✓".style(success_style),
        rule.family(),
        rule.title.bright_white().bold()
    );
    println!("  {} Rule ID: {}", "→".style(info_style), rule.item_id.to_string().yellow());
    println!(
        "  {} {} at {}",
        "→".style(info_style),
        describe_cadence(&rule.cadence),
        format_minute_of_day(rule.time_of_day)
    );

    let summary = repo.refresh(today).await?;
    display_summary(&summary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::FamilyArg;

    fn command(family: FamilyArg) -> AddCommand {
        AddCommand {
            family,
            title: "Test".to_string(),
            from: "2024-01-03".to_string(),
            until: "2024-12-31".to_string(),
            at: "09:00".to_string(),
            duration: None,
            notify: None,
            no_notify: false,
            folder: None,
            event_type: None,
            every: None,
            on: None,
            days: None,
            last_day: false,
            date: None,
        }
    }

    fn start() -> CivilTimestamp {
        // A Wednesday.
        CivilTimestamp::date(2024, 1, 3).unwrap()
    }

    #[test]
    fn test_selectors_default_to_series_start() {
        assert_eq!(
            cadence_from_command(&command(FamilyArg::Weekly), &start()).unwrap(),
            Cadence::Weekly {
                every_n_weeks: 1,
                days_of_week: WeekdaySet::from_weekdays([3]),
            }
        );
        assert_eq!(
            cadence_from_command(&command(FamilyArg::Monthly), &start()).unwrap(),
            Cadence::Monthly {
                last_day_of_month: false,
                days_of_month: MonthDaySet::from_days([3]),
            }
        );
        assert_eq!(
            cadence_from_command(&command(FamilyArg::Yearly), &start()).unwrap(),
            Cadence::Yearly { day_of_year: 3 }
        );
    }

    #[test]
    fn test_explicit_selectors() {
        let mut weekly = command(FamilyArg::Weekly);
        weekly.every = Some(2);
        weekly.on = Some("mon,fri".to_string());
        assert_eq!(
            cadence_from_command(&weekly, &start()).unwrap(),
            Cadence::Weekly {
                every_n_weeks: 2,
                days_of_week: WeekdaySet::from_weekdays([1, 5]),
            }
        );

        let mut monthly = command(FamilyArg::Monthly);
        monthly.last_day = true;
        assert_eq!(
            cadence_from_command(&monthly, &start()).unwrap(),
            Cadence::Monthly {
                last_day_of_month: true,
                days_of_month: MonthDaySet::EMPTY,
            }
        );

        let mut yearly = command(FamilyArg::Yearly);
        yearly.date = Some("02-29".to_string());
        assert_eq!(
            cadence_from_command(&yearly, &start()).unwrap(),
            Cadence::Yearly { day_of_year: 60 }
        );
    }

    #[test]
    fn test_bad_weekday_is_rejected() {
        let mut weekly = command(FamilyArg::Weekly);
        weekly.on = Some("funday".to_string());
        assert!(cadence_from_command(&weekly, &start()).is_err());
    }
}
