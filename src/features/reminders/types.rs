//! Reminder domain types
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.3.0
//!
//! ## Changelog
//! - 1.2.0: Recurrence enum (daily / once)
//! - 1.1.0: Occurrence keeps its own time and label copies
//! - 1.0.0: Initial release

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::BotError;

/// A wall-clock time of day, local to a reminder's timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(BotError::validation(format!(
                "time out of range: {hour:02}:{minute:02}"
            )));
        }
        Ok(TimeOfDay { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// The same time as a `chrono` value. Infallible: the constructor already
    /// bounds-checked both fields.
    pub(crate) fn naive(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || BotError::validation(format!("expected HH:MM (e.g. 20:30), got {s:?}"));
        let (hh, mm) = s.trim().split_once(':').ok_or_else(invalid)?;
        if hh.len() != 2 || mm.len() != 2 {
            return Err(invalid());
        }
        let hour: u8 = hh.parse().map_err(|_| invalid())?;
        let minute: u8 = mm.parse().map_err(|_| invalid())?;
        TimeOfDay::new(hour, minute).map_err(|_| invalid())
    }
}

/// How often a reminder fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recurrence {
    /// Every day at the configured time
    Daily,
    /// A single firing, after which the reminder is deactivated
    Once,
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recurrence::Daily => write!(f, "daily"),
            Recurrence::Once => write!(f, "once"),
        }
    }
}

impl FromStr for Recurrence {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Recurrence::Daily),
            "once" => Ok(Recurrence::Once),
            _ => Err(BotError::validation(format!("invalid recurrence: {s}"))),
        }
    }
}

/// A stored reminder definition.
///
/// The owner pair (`user_id`, `chat_id`) is immutable after creation.
/// `streak` counts consecutive days acknowledged; `last_taken_date` is the
/// anchor the streak algorithm compares against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub user_id: String,
    pub chat_id: String,
    pub time: TimeOfDay,
    pub label: String,
    /// IANA zone name, e.g. `Asia/Tashkent`
    pub timezone: String,
    pub recurrence: Recurrence,
    /// Soft-delete / pause flag
    pub active: bool,
    pub streak: u32,
    pub last_taken_date: Option<NaiveDate>,
}

/// Acknowledgment state of a single occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OccurrenceStatus {
    /// Created at fire time, not yet acknowledged
    Scheduled,
    /// User confirmed the dose
    Taken,
    /// User snoozed or otherwise skipped the notification
    Skipped,
}

impl OccurrenceStatus {
    /// Terminal statuses are never overwritten by a snooze.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OccurrenceStatus::Taken | OccurrenceStatus::Skipped)
    }
}

impl fmt::Display for OccurrenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OccurrenceStatus::Scheduled => write!(f, "scheduled"),
            OccurrenceStatus::Taken => write!(f, "taken"),
            OccurrenceStatus::Skipped => write!(f, "skipped"),
        }
    }
}

impl FromStr for OccurrenceStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "scheduled" => Ok(OccurrenceStatus::Scheduled),
            "taken" => Ok(OccurrenceStatus::Taken),
            "skipped" => Ok(OccurrenceStatus::Skipped),
            _ => Err(anyhow::anyhow!("Invalid occurrence status: {}", s)),
        }
    }
}

/// One calendar-day instance of a reminder.
///
/// `time` and `label` are copied from the reminder at creation so later edits
/// don't rewrite history. `date` is the calendar day in the reminder's own
/// timezone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: i64,
    pub schedule_id: i64,
    pub date: NaiveDate,
    pub time: TimeOfDay,
    pub label: String,
    pub status: OccurrenceStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_of_day_parse() {
        let t: TimeOfDay = "08:30".parse().unwrap();
        assert_eq!(t.hour(), 8);
        assert_eq!(t.minute(), 30);
        assert_eq!(t.to_string(), "08:30");

        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("12:60".parse::<TimeOfDay>().is_err());
        assert!("8:30".parse::<TimeOfDay>().is_err());
        assert!("0830".parse::<TimeOfDay>().is_err());
        assert!("".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_time_of_day_boundaries() {
        assert!("00:00".parse::<TimeOfDay>().is_ok());
        assert!("23:59".parse::<TimeOfDay>().is_ok());
        assert!(TimeOfDay::new(24, 0).is_err());
        assert!(TimeOfDay::new(0, 60).is_err());
    }

    #[test]
    fn test_recurrence_round_trip() {
        assert_eq!("daily".parse::<Recurrence>().unwrap(), Recurrence::Daily);
        assert_eq!("ONCE".parse::<Recurrence>().unwrap(), Recurrence::Once);
        assert!("weekly".parse::<Recurrence>().is_err());
        assert_eq!(Recurrence::Daily.to_string(), "daily");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(
            "taken".parse::<OccurrenceStatus>().unwrap(),
            OccurrenceStatus::Taken
        );
        assert!("unknown".parse::<OccurrenceStatus>().is_err());
        assert!(OccurrenceStatus::Taken.is_terminal());
        assert!(OccurrenceStatus::Skipped.is_terminal());
        assert!(!OccurrenceStatus::Scheduled.is_terminal());
    }
}
