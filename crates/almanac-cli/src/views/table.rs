use almanac_core::calendar::CivilTimestamp;
use almanac_core::materialization::MaterializationSummary;
use almanac_core::models::{Cadence, Occurrence, RecurrenceRule};
use comfy_table::{Attribute, Cell, Color, Row, Table};
use owo_colors::OwoColorize;

use crate::util::format_minute_of_day;

/// Human-readable cadence, e.g. `every 2 weeks on mon,wed`.
pub fn describe_cadence(cadence: &Cadence) -> String {
    match *cadence {
        Cadence::Daily { every_n_days: 1 } => "every day".to_string(),
        Cadence::Daily { every_n_days } => format!("every {} days", every_n_days),
        Cadence::Weekly {
            every_n_weeks: 1,
            days_of_week,
        } => format!("weekly on {}", days_of_week),
        Cadence::Weekly {
            every_n_weeks,
            days_of_week,
        } => format!("every {} weeks on {}", every_n_weeks, days_of_week),
        Cadence::Monthly {
            last_day_of_month,
            days_of_month,
        } => match (days_of_month.is_empty(), last_day_of_month) {
            (true, _) => "monthly on the last day of short months".to_string(),
            (false, true) => {
                format!("monthly on {} and the last day of short months", days_of_month)
            }
            (false, false) => format!("monthly on {}", days_of_month),
        },
        Cadence::Yearly { day_of_year } => {
            match CivilTimestamp::from_ordinal(2000, day_of_year, 0) {
                Some(anchor) => format!("yearly on {:02}-{:02}", anchor.month(), anchor.day()),
                None => format!("yearly on day {}", day_of_year),
            }
        }
    }
}

pub fn display_rules(rules: &[RecurrenceRule]) {
    if rules.is_empty() {
        println!("No recurring reminders found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Family", "Cadence", "At", "Series", "Notify"]);

    for rule in rules {
        let mut row = Row::new();
        row.add_cell(Cell::new(rule.item_id));
        row.add_cell(Cell::new(&rule.title).add_attribute(Attribute::Bold));
        row.add_cell(Cell::new(rule.family()));
        row.add_cell(Cell::new(describe_cadence(&rule.cadence)));
        row.add_cell(Cell::new(format_minute_of_day(rule.time_of_day)));
        row.add_cell(Cell::new(format!("{} → {}", rule.series_start, rule.series_end)));
        let notify = if rule.has_notifications {
            Cell::new(format!("{} min", rule.notif_offset_minutes))
        } else {
            Cell::new("off").fg(Color::DarkGrey)
        };
        row.add_cell(notify);
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_occurrences(occurrences: &[Occurrence]) {
    if occurrences.is_empty() {
        println!("No occurrences found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Start", "End", "Title", "Rule", "Notify"]);

    for occurrence in occurrences {
        let mut row = Row::new();
        let mut start = Cell::new(occurrence.effective_start);
        if occurrence.is_overridden() {
            start = start.fg(Color::Yellow);
        }
        row.add_cell(start);

        let mut end = Cell::new(occurrence.effective_end);
        if occurrence.is_extended {
            end = end.add_attribute(Attribute::Italic);
        }
        row.add_cell(end);

        let mut title = occurrence.title.clone();
        if occurrence.is_overridden() {
            title.push_str(&format!(" (moved from {})", occurrence.original_start));
        }
        row.add_cell(Cell::new(title));
        row.add_cell(Cell::new(occurrence.item_id));

        let notify = if occurrence.has_notif {
            Cell::new(occurrence.effective_notif)
        } else {
            Cell::new("muted").fg(Color::DarkGrey)
        };
        row.add_cell(notify);
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_summary(summary: &MaterializationSummary) {
    if let Some(year) = summary.current_year {
        println!("{} Rolling window centered on {}", "→".blue(), year.to_string().yellow());
    }
    if !summary.years_pruned.is_empty() {
        println!("  {} Pruned years: {:?}", "→".blue(), summary.years_pruned);
    }
    if summary.years_materialized.is_empty() {
        println!("  {} All years already materialized", "→".blue());
    } else {
        println!(
            "  {} Materialized years: {:?} ({} occurrences)",
            "→".blue(),
            summary.years_materialized,
            summary.occurrences_written
        );
    }
    println!("  {} Took {} ms", "→".bright_black(), summary.duration_ms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use almanac_core::models::{MonthDaySet, WeekdaySet};
    use rstest::rstest;

    fn weekly(every_n_weeks: u32, days: &[u32]) -> Cadence {
        Cadence::Weekly {
            every_n_weeks,
            days_of_week: WeekdaySet::from_weekdays(days.iter().copied()),
        }
    }

    fn monthly(last_day_of_month: bool, days: &[u32]) -> Cadence {
        Cadence::Monthly {
            last_day_of_month,
            days_of_month: MonthDaySet::from_days(days.iter().copied()),
        }
    }

    #[rstest]
    #[case(Cadence::Daily { every_n_days: 1 }, "every day")]
    #[case(Cadence::Daily { every_n_days: 3 }, "every 3 days")]
    #[case(weekly(1, &[1, 3]), "weekly on mon,wed")]
    #[case(weekly(2, &[0]), "every 2 weeks on sun")]
    #[case(monthly(true, &[]), "monthly on the last day of short months")]
    #[case(monthly(true, &[1, 15]), "monthly on 1,15 and the last day of short months")]
    #[case(Cadence::Yearly { day_of_year: 60 }, "yearly on 02-29")]
    #[case(Cadence::Yearly { day_of_year: 366 }, "yearly on 12-31")]
    fn test_describe_cadence(#[case] cadence: Cadence, #[case] expected: &str) {
        assert_eq!(describe_cadence(&cadence), expected);
    }
}
