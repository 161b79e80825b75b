use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::calendar::{CivilTimestamp, MINUTES_PER_DAY};
use crate::codec::MAX_NORMALIZED_DAY;
use crate::error::CoreError;

// ============================================================================
// Recurrence families and day sets
// ============================================================================

/// Tag of a recurrence family, persisted as 1..=4.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[repr(i32)]
pub enum RecurrenceFamily {
    Daily = 1,
    Weekly = 2,
    Monthly = 3,
    Yearly = 4,
}

impl RecurrenceFamily {
    pub const ALL: [RecurrenceFamily; 4] = [
        RecurrenceFamily::Daily,
        RecurrenceFamily::Weekly,
        RecurrenceFamily::Monthly,
        RecurrenceFamily::Yearly,
    ];

    pub fn tag(self) -> i32 {
        self as i32
    }

    pub fn from_tag(tag: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|family| family.tag() == tag)
    }
}

impl fmt::Display for RecurrenceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrenceFamily::Daily => write!(f, "daily"),
            RecurrenceFamily::Weekly => write!(f, "weekly"),
            RecurrenceFamily::Monthly => write!(f, "monthly"),
            RecurrenceFamily::Yearly => write!(f, "yearly"),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid recurrence family: {0}")]
pub struct ParseRecurrenceFamilyError(String);

impl FromStr for RecurrenceFamily {
    type Err = ParseRecurrenceFamilyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(RecurrenceFamily::Daily),
            "weekly" => Ok(RecurrenceFamily::Weekly),
            "monthly" => Ok(RecurrenceFamily::Monthly),
            "yearly" => Ok(RecurrenceFamily::Yearly),
            _ => Err(ParseRecurrenceFamilyError(s.to_string())),
        }
    }
}

const WEEKDAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];

/// Weekdays a weekly rule fires on. Bit 0 is Sunday, bit 6 is Saturday.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: WeekdaySet = WeekdaySet(0);
    pub const ALL: WeekdaySet = WeekdaySet(0x7f);

    /// Keeps the low seven bits of `bits`.
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Builds a set from weekday numbers (0 = Sunday); numbers above 6 are ignored.
    pub fn from_weekdays(days: impl IntoIterator<Item = u32>) -> Self {
        Self::from_bits(
            days.into_iter()
                .filter(|day| *day < 7)
                .fold(0u8, |bits, day| bits | (1 << day)),
        )
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, weekday: u32) -> bool {
        weekday < 7 && self.0 & (1 << weekday) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = u32> {
        (0..7).filter(move |day| self.contains(*day))
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|day| WEEKDAY_NAMES[day as usize]).collect();
        write!(f, "{}", names.join(","))
    }
}

impl FromStr for WeekdaySet {
    type Err = CoreError;

    /// Parses a comma separated list such as `mon,wed,fri`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut days = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let prefix: String = part.to_lowercase().chars().take(3).collect();
            let day = WEEKDAY_NAMES
                .iter()
                .position(|name| *name == prefix)
                .ok_or_else(|| CoreError::InvalidInput(format!("Unknown weekday '{}'", part)))?;
            days.push(day as u32);
        }
        Ok(Self::from_weekdays(days))
    }
}

/// Days of the month a monthly rule fires on. Bit 0 is the 1st, bit 30 the 31st.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonthDaySet(u32);

impl MonthDaySet {
    pub const EMPTY: MonthDaySet = MonthDaySet(0);
    const MASK: u32 = 0x7fff_ffff;

    pub fn from_bits(bits: u32) -> Self {
        Self(bits & Self::MASK)
    }

    /// Builds a set from 1-based days; values outside 1..=31 are ignored.
    pub fn from_days(days: impl IntoIterator<Item = u32>) -> Self {
        Self::from_bits(
            days.into_iter()
                .filter(|day| (1..=31).contains(day))
                .fold(0u32, |bits, day| bits | (1 << (day - 1))),
        )
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, day: u32) -> bool {
        (1..=31).contains(&day) && self.0 & (1 << (day - 1)) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = u32> {
        (1..=31).filter(move |day| self.contains(*day))
    }
}

impl fmt::Display for MonthDaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days: Vec<String> = self.iter().map(|day| day.to_string()).collect();
        write!(f, "{}", days.join(","))
    }
}

impl FromStr for MonthDaySet {
    type Err = CoreError;

    /// Parses a comma separated list such as `1,15,31`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut days = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let day: u32 = part
                .parse()
                .ok()
                .filter(|day| (1..=31).contains(day))
                .ok_or_else(|| {
                    CoreError::InvalidInput(format!("Invalid day of month '{}'", part))
                })?;
            days.push(day);
        }
        Ok(Self::from_days(days))
    }
}

// ============================================================================
// Recurrence rules
// ============================================================================

/// Family-specific part of a recurrence rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cadence {
    Daily {
        every_n_days: u32,
    },
    Weekly {
        every_n_weeks: u32,
        days_of_week: WeekdaySet,
    },
    Monthly {
        last_day_of_month: bool,
        days_of_month: MonthDaySet,
    },
    /// `day_of_year` is normalized, see [`crate::codec`].
    Yearly {
        day_of_year: u32,
    },
}

impl Cadence {
    pub fn family(&self) -> RecurrenceFamily {
        match self {
            Cadence::Daily { .. } => RecurrenceFamily::Daily,
            Cadence::Weekly { .. } => RecurrenceFamily::Weekly,
            Cadence::Monthly { .. } => RecurrenceFamily::Monthly,
            Cadence::Yearly { .. } => RecurrenceFamily::Yearly,
        }
    }

    fn validate(&self) -> Result<(), CoreError> {
        match *self {
            Cadence::Daily { every_n_days } if every_n_days == 0 => {
                Err(CoreError::InvalidRule("every_n_days must be at least 1".to_string()))
            }
            Cadence::Weekly { every_n_weeks, .. } if every_n_weeks == 0 => {
                Err(CoreError::InvalidRule("every_n_weeks must be at least 1".to_string()))
            }
            Cadence::Weekly { days_of_week, .. } if days_of_week.is_empty() => Err(
                CoreError::InvalidRule("a weekly rule needs at least one weekday".to_string()),
            ),
            Cadence::Monthly {
                last_day_of_month: false,
                days_of_month,
            } if days_of_month.is_empty() => Err(CoreError::InvalidRule(
                "a monthly rule needs at least one day or the last-day flag".to_string(),
            )),
            Cadence::Yearly { day_of_year } if !(1..=MAX_NORMALIZED_DAY).contains(&day_of_year) => {
                Err(CoreError::InvalidRule(format!(
                    "day_of_year {} is outside 1..={}",
                    day_of_year, MAX_NORMALIZED_DAY
                )))
            }
            _ => Ok(()),
        }
    }
}

/// A user-authored recurring reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    /// Stable identifier of the series
    pub item_id: i64,
    pub folder_id: i64,
    pub event_type: i32,
    /// Inclusive lower bound of the series
    pub series_start: CivilTimestamp,
    /// Inclusive upper bound of the series
    pub series_end: CivilTimestamp,
    /// Minute of the day each occurrence starts at
    pub time_of_day: u32,
    pub duration_minutes: u32,
    /// Lead time of the notification; negative values notify after the start
    pub notif_offset_minutes: i32,
    pub has_notifications: bool,
    pub title: String,
    pub cadence: Cadence,
}

impl RecurrenceRule {
    pub fn from_new(item_id: i64, data: NewRuleData) -> Self {
        Self {
            item_id,
            folder_id: data.folder_id,
            event_type: data.event_type,
            series_start: data.series_start,
            series_end: data.series_end,
            time_of_day: data.time_of_day,
            duration_minutes: data.duration_minutes,
            notif_offset_minutes: data.notif_offset_minutes,
            has_notifications: data.has_notifications,
            title: data.title,
            cadence: data.cadence,
        }
    }

    pub fn family(&self) -> RecurrenceFamily {
        self.cadence.family()
    }

    /// Rejects rules the expanders must never see.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.series_start > self.series_end {
            return Err(CoreError::InvalidRule(format!(
                "series start {} is after series end {}",
                self.series_start, self.series_end
            )));
        }
        if self.time_of_day >= MINUTES_PER_DAY {
            return Err(CoreError::InvalidRule(format!(
                "time_of_day {} is not a minute of the day",
                self.time_of_day
            )));
        }
        self.cadence.validate()
    }

    /// Whether the series bounds touch `year` at all.
    pub fn intersects_year(&self, year: i32) -> bool {
        self.series_start.year() <= year && year <= self.series_end.year()
    }

    pub fn contains(&self, ts: &CivilTimestamp) -> bool {
        self.series_start <= *ts && *ts <= self.series_end
    }

    pub fn end_for(&self, start: &CivilTimestamp) -> CivilTimestamp {
        start.add_minutes(i64::from(self.duration_minutes))
    }

    pub fn notification_for(&self, start: &CivilTimestamp) -> CivilTimestamp {
        start.add_minutes(-i64::from(self.notif_offset_minutes))
    }

    /// Merges `update` into a copy of the rule.
    pub fn updated(&self, update: UpdateRuleData) -> Self {
        let mut rule = self.clone();
        if let Some(folder_id) = update.folder_id {
            rule.folder_id = folder_id;
        }
        if let Some(event_type) = update.event_type {
            rule.event_type = event_type;
        }
        if let Some(series_start) = update.series_start {
            rule.series_start = series_start;
        }
        if let Some(series_end) = update.series_end {
            rule.series_end = series_end;
        }
        if let Some(time_of_day) = update.time_of_day {
            rule.time_of_day = time_of_day;
        }
        if let Some(duration_minutes) = update.duration_minutes {
            rule.duration_minutes = duration_minutes;
        }
        if let Some(notif_offset_minutes) = update.notif_offset_minutes {
            rule.notif_offset_minutes = notif_offset_minutes;
        }
        if let Some(has_notifications) = update.has_notifications {
            rule.has_notifications = has_notifications;
        }
        if let Some(title) = update.title {
            rule.title = title;
        }
        if let Some(cadence) = update.cadence {
            rule.cadence = cadence;
        }
        rule
    }
}

// ============================================================================
// Overrides and materialized occurrences
// ============================================================================

/// A per-occurrence exception that moves, retimes or mutes one instance of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Override {
    pub item_id: i64,
    /// The rule this override modifies
    pub linked_item_id: i64,
    /// Un-overridden start of the occurrence; the correlation key
    pub original_start: CivilTimestamp,
    pub effective_start: CivilTimestamp,
    pub effective_end: CivilTimestamp,
    pub effective_notif: CivilTimestamp,
    pub has_notif: bool,
}

/// One concrete instance of a recurring reminder. Always reproducible from its rule and
/// overrides; `(item_id, original_start)` identifies it across regenerations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub item_id: i64,
    pub folder_id: i64,
    pub event_type: i32,
    pub family: RecurrenceFamily,
    pub original_start: CivilTimestamp,
    pub effective_start: CivilTimestamp,
    pub effective_end: CivilTimestamp,
    pub effective_notif: CivilTimestamp,
    /// The occurrence ends on a later date than it starts
    pub is_extended: bool,
    pub has_notif: bool,
    pub title: String,
    /// Override applied to this occurrence, if any
    pub override_id: Option<i64>,
}

impl Occurrence {
    /// Cache bucket of the occurrence.
    pub fn year(&self) -> i32 {
        self.effective_start.year()
    }

    pub fn is_overridden(&self) -> bool {
        self.override_id.is_some()
    }
}

// ============================================================================
// Data Transfer Objects (DTOs)
// ============================================================================

/// Data required to create a new recurrence rule
#[derive(Debug, Clone)]
pub struct NewRuleData {
    pub folder_id: i64,
    pub event_type: i32,
    pub series_start: CivilTimestamp,
    pub series_end: CivilTimestamp,
    pub time_of_day: u32,
    pub duration_minutes: u32,
    pub notif_offset_minutes: i32,
    pub has_notifications: bool,
    pub title: String,
    pub cadence: Cadence,
}

/// Data for modifying an existing rule
#[derive(Debug, Clone, Default)]
pub struct UpdateRuleData {
    pub folder_id: Option<i64>,
    pub event_type: Option<i32>,
    pub series_start: Option<CivilTimestamp>,
    pub series_end: Option<CivilTimestamp>,
    pub time_of_day: Option<u32>,
    pub duration_minutes: Option<u32>,
    pub notif_offset_minutes: Option<i32>,
    pub has_notifications: Option<bool>,
    pub title: Option<String>,
    pub cadence: Option<Cadence>,
}

/// Data for creating an override
#[derive(Debug, Clone)]
pub struct NewOverrideData {
    pub linked_item_id: i64,
    /// Which occurrence to affect
    pub original_start: CivilTimestamp,
    pub effective_start: CivilTimestamp,
    pub effective_end: CivilTimestamp,
    pub effective_notif: CivilTimestamp,
    pub has_notif: bool,
}

impl NewOverrideData {
    /// Moves an occurrence, keeping the rule's duration and notification lead time.
    pub fn moved(
        rule: &RecurrenceRule,
        original_start: CivilTimestamp,
        new_start: CivilTimestamp,
    ) -> Self {
        Self {
            linked_item_id: rule.item_id,
            original_start,
            effective_start: new_start,
            effective_end: rule.end_for(&new_start),
            effective_notif: rule.notification_for(&new_start),
            has_notif: rule.has_notifications,
        }
    }
}
