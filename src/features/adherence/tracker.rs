//! Acknowledgment and streak tracking
//!
//! Turns "taken" and "snooze" signals into occurrence status updates and
//! consecutive-day streaks. Dates are always computed in the reminder's own
//! timezone, so a user in Tashkent and a user in New York both get their
//! streak counted against their own calendar.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.4.0
//!
//! ## Changelog
//! - 1.1.0: Acknowledgment cancels pending snoozes
//! - 1.0.0: Initial release with taken / snooze / delete

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use log::info;
use std::sync::Arc;

use crate::core::error::BotError;
use crate::database::Database;
use crate::features::reminders::scheduler::ReminderScheduler;
use crate::features::reminders::timing;
use crate::features::reminders::types::{Occurrence, OccurrenceStatus, Reminder};

/// Processes acknowledgment signals for reminders.
pub struct AdherenceTracker {
    database: Database,
    scheduler: Arc<ReminderScheduler>,
}

impl AdherenceTracker {
    pub fn new(database: Database, scheduler: Arc<ReminderScheduler>) -> Self {
        AdherenceTracker {
            database,
            scheduler,
        }
    }

    /// Mark today's dose as taken and return the updated streak.
    ///
    /// Creates today's occurrence when none exists yet — a user may tap
    /// "taken" before the scheduled fire. Idempotent within a calendar day:
    /// repeated calls never double-increment the streak. Any pending snooze
    /// for the reminder is cancelled so it cannot re-notify after the dose
    /// was confirmed.
    pub async fn mark_taken(&self, schedule_id: i64) -> Result<u32> {
        let reminder = self.active_reminder(schedule_id).await?;
        let zone = timing::resolve_timezone(&reminder.timezone)?;
        let today = timing::now_in(zone).date_naive();

        self.database
            .create_occurrence_if_absent(schedule_id, today, reminder.time, &reminder.label)
            .await?;
        let occurrence = self
            .database
            .get_latest_occurrence(schedule_id)
            .await?
            .ok_or_else(|| BotError::store("occurrence missing after upsert"))?;
        self.database
            .set_occurrence_status(occurrence.id, OccurrenceStatus::Taken)
            .await?;

        let streak = self.database.update_streak(schedule_id, today).await?;
        self.scheduler.disarm_oneshots(schedule_id).await?;
        self.database
            .log_action(&reminder.user_id, &format!("took:{schedule_id}"))
            .await?;

        info!(
            "Reminder {schedule_id} ({}) taken, streak {streak}",
            reminder.label
        );
        Ok(streak)
    }

    /// Postpone the current occurrence by `delay` and return the instant the
    /// re-notification will fire. Never affects the streak.
    pub async fn snooze(&self, schedule_id: i64, delay: Duration) -> Result<DateTime<Utc>> {
        let reminder = self.active_reminder(schedule_id).await?;

        if let Some(occurrence) = self.database.get_latest_occurrence(schedule_id).await? {
            if !occurrence.status.is_terminal() {
                self.database
                    .set_occurrence_status(occurrence.id, OccurrenceStatus::Skipped)
                    .await?;
            }
        }

        let fire_at = Utc::now() + delay;
        self.scheduler.arm_once_at(schedule_id, fire_at).await?;
        self.database
            .log_action(&reminder.user_id, &format!("snooze:{schedule_id}"))
            .await?;

        info!(
            "Reminder {schedule_id} ({}) snoozed until {fire_at}",
            reminder.label
        );
        Ok(fire_at)
    }

    /// Soft-delete a reminder: disarm its timers, mark it inactive. The
    /// occurrence history is retained for reporting.
    pub async fn delete(&self, schedule_id: i64) -> Result<()> {
        let reminder = self.active_reminder(schedule_id).await?;

        self.scheduler.disarm(schedule_id);
        self.scheduler.disarm_oneshots(schedule_id).await?;
        self.database.set_reminder_active(schedule_id, false).await?;
        self.database
            .log_action(&reminder.user_id, &format!("delete:{schedule_id}"))
            .await?;

        info!("Reminder {schedule_id} ({}) deleted", reminder.label);
        Ok(())
    }

    /// A user's occurrences on one calendar day, oldest first.
    pub async fn daily_report(&self, user_id: &str, date: NaiveDate) -> Result<Vec<Occurrence>> {
        self.database.list_occurrences_for_date(user_id, date).await
    }

    /// A deleted reminder is gone from the user's point of view.
    async fn active_reminder(&self, schedule_id: i64) -> Result<Reminder> {
        let reminder = self.database.get_reminder(schedule_id).await?;
        if !reminder.active {
            return Err(BotError::not_found(format!("reminder {schedule_id}")));
        }
        Ok(reminder)
    }
}
