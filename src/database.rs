//! # Database
//!
//! Durable storage for reminder definitions, occurrence history, pending
//! snoozes and user settings. Single source of truth: the scheduler rebuilds
//! all in-memory timer state from here on every restart.
//!
//! One SQLite connection behind an async mutex. Locking the connection for
//! the whole of each operation is what makes multi-step mutations (the streak
//! update, the occurrence upsert) atomic per row — there is exactly one
//! writer at any time.
//!
//! - **Version**: 2.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.1.0: Pending snoozes persisted for restart recovery
//! - 2.0.0: Occurrence history with a unique (schedule, date) index
//! - 1.0.0: Initial release with schedules and users tables

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use log::debug;
use sqlite::{Connection, State};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::error::BotError;
use crate::features::reminders::types::{
    Occurrence, OccurrenceStatus, Recurrence, Reminder, TimeOfDay,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    tz TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS schedules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    chat_id TEXT NOT NULL,
    hhmm TEXT NOT NULL,
    label TEXT NOT NULL,
    tz TEXT NOT NULL,
    recurrence TEXT NOT NULL DEFAULT 'daily',
    active INTEGER NOT NULL DEFAULT 1,
    streak INTEGER NOT NULL DEFAULT 0,
    last_taken_date TEXT
);
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    schedule_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    time TEXT NOT NULL,
    label TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'scheduled',
    created_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_events_schedule_date
    ON events (schedule_id, date);
CREATE TABLE IF NOT EXISTS snoozes (
    id TEXT PRIMARY KEY,
    schedule_id INTEGER NOT NULL,
    fire_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS action_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    action TEXT NOT NULL,
    timestamp TEXT NOT NULL
);
";

/// A persisted snooze one-shot, re-armed during reconciliation.
#[derive(Debug, Clone)]
pub struct PendingSnooze {
    pub id: String,
    pub schedule_id: i64,
    pub fire_at: DateTime<Utc>,
}

/// Handle to the SQLite store. Cheap to clone; all clones share one
/// connection.
#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub async fn new(path: &str) -> Result<Self> {
        let connection = sqlite::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;
        connection
            .execute(SCHEMA)
            .context("failed to initialize database schema")?;
        debug!("Database ready at {path}");
        Ok(Database {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    // Reminders

    /// Insert a new reminder and return its id. The label must be non-empty
    /// after trimming.
    pub async fn create_reminder(
        &self,
        user_id: &str,
        chat_id: &str,
        time: TimeOfDay,
        label: &str,
        timezone: &str,
        recurrence: Recurrence,
    ) -> Result<i64> {
        let label = label.trim();
        if label.is_empty() {
            return Err(BotError::validation("label must not be empty"));
        }

        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "INSERT INTO schedules (user_id, chat_id, hhmm, label, tz, recurrence)
             VALUES (?, ?, ?, ?, ?, ?)",
        )?;
        statement.bind((1, user_id))?;
        statement.bind((2, chat_id))?;
        statement.bind((3, time.to_string().as_str()))?;
        statement.bind((4, label))?;
        statement.bind((5, timezone))?;
        statement.bind((6, recurrence.to_string().as_str()))?;
        statement.next()?;

        let id = last_insert_rowid(&connection)?;
        debug!("Created reminder {id} ({label} at {time}, {recurrence})");
        Ok(id)
    }

    /// Fetch a reminder by id, active or not.
    pub async fn get_reminder(&self, id: i64) -> Result<Reminder> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "SELECT id, user_id, chat_id, hhmm, label, tz, recurrence, active, streak,
                    last_taken_date
             FROM schedules WHERE id = ?",
        )?;
        statement.bind((1, id))?;
        if let State::Row = statement.next()? {
            read_reminder(&statement)
        } else {
            Err(BotError::not_found(format!("reminder {id}")))
        }
    }

    /// All active reminders, for reconciliation.
    pub async fn list_active_reminders(&self) -> Result<Vec<Reminder>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "SELECT id, user_id, chat_id, hhmm, label, tz, recurrence, active, streak,
                    last_taken_date
             FROM schedules WHERE active = 1 ORDER BY id",
        )?;
        let mut reminders = Vec::new();
        while let State::Row = statement.next()? {
            reminders.push(read_reminder(&statement)?);
        }
        Ok(reminders)
    }

    /// Active reminders belonging to one user.
    pub async fn list_reminders_for_user(&self, user_id: &str) -> Result<Vec<Reminder>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "SELECT id, user_id, chat_id, hhmm, label, tz, recurrence, active, streak,
                    last_taken_date
             FROM schedules WHERE user_id = ? AND active = 1 ORDER BY hhmm",
        )?;
        statement.bind((1, user_id))?;
        let mut reminders = Vec::new();
        while let State::Row = statement.next()? {
            reminders.push(read_reminder(&statement)?);
        }
        Ok(reminders)
    }

    pub async fn update_reminder_label(&self, id: i64, label: &str) -> Result<()> {
        let label = label.trim();
        if label.is_empty() {
            return Err(BotError::validation("label must not be empty"));
        }
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare("UPDATE schedules SET label = ? WHERE id = ?")?;
        statement.bind((1, label))?;
        statement.bind((2, id))?;
        statement.next()?;
        require_change(&connection, || format!("reminder {id}"))
    }

    pub async fn update_reminder_time(&self, id: i64, time: TimeOfDay) -> Result<()> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare("UPDATE schedules SET hhmm = ? WHERE id = ?")?;
        statement.bind((1, time.to_string().as_str()))?;
        statement.bind((2, id))?;
        statement.next()?;
        require_change(&connection, || format!("reminder {id}"))
    }

    /// Flip the soft-delete / pause flag. Occurrence history is retained.
    pub async fn set_reminder_active(&self, id: i64, active: bool) -> Result<()> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare("UPDATE schedules SET active = ? WHERE id = ?")?;
        statement.bind((1, active as i64))?;
        statement.bind((2, id))?;
        statement.next()?;
        require_change(&connection, || format!("reminder {id}"))
    }

    // Occurrences

    /// Create today's occurrence unless one already exists for
    /// `(schedule_id, date)`. Returns whether a row was inserted.
    ///
    /// Backed by a unique index, so concurrent callers racing on the same day
    /// cannot produce a second row.
    pub async fn create_occurrence_if_absent(
        &self,
        schedule_id: i64,
        date: NaiveDate,
        time: TimeOfDay,
        label: &str,
    ) -> Result<bool> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "INSERT OR IGNORE INTO events (schedule_id, date, time, label, status, created_at)
             VALUES (?, ?, ?, ?, 'scheduled', ?)",
        )?;
        statement.bind((1, schedule_id))?;
        statement.bind((2, date.format("%Y-%m-%d").to_string().as_str()))?;
        statement.bind((3, time.to_string().as_str()))?;
        statement.bind((4, label))?;
        statement.bind((5, Utc::now().to_rfc3339().as_str()))?;
        statement.next()?;
        Ok(changes(&connection)? > 0)
    }

    /// The most recent occurrence for a reminder, if any.
    pub async fn get_latest_occurrence(&self, schedule_id: i64) -> Result<Option<Occurrence>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "SELECT id, schedule_id, date, time, label, status, created_at
             FROM events WHERE schedule_id = ?
             ORDER BY date DESC, id DESC LIMIT 1",
        )?;
        statement.bind((1, schedule_id))?;
        if let State::Row = statement.next()? {
            Ok(Some(read_occurrence(&statement)?))
        } else {
            Ok(None)
        }
    }

    pub async fn set_occurrence_status(
        &self,
        occurrence_id: i64,
        status: OccurrenceStatus,
    ) -> Result<()> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare("UPDATE events SET status = ? WHERE id = ?")?;
        statement.bind((1, status.to_string().as_str()))?;
        statement.bind((2, occurrence_id))?;
        statement.next()?;
        require_change(&connection, || format!("occurrence {occurrence_id}"))
    }

    /// All of a user's occurrences on one calendar day, for the daily report.
    pub async fn list_occurrences_for_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<Occurrence>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "SELECT e.id, e.schedule_id, e.date, e.time, e.label, e.status, e.created_at
             FROM events e JOIN schedules s ON s.id = e.schedule_id
             WHERE s.user_id = ? AND e.date = ?
             ORDER BY e.time",
        )?;
        statement.bind((1, user_id))?;
        statement.bind((2, date.format("%Y-%m-%d").to_string().as_str()))?;
        let mut occurrences = Vec::new();
        while let State::Row = statement.next()? {
            occurrences.push(read_occurrence(&statement)?);
        }
        Ok(occurrences)
    }

    // Streaks

    /// Apply the consecutive-day streak rule for an acknowledgment dated
    /// `today` (the current date in the reminder's own timezone) and return
    /// the resulting streak.
    ///
    /// Same day twice: unchanged. Yesterday acknowledged: +1. Anything else,
    /// including the first acknowledgment ever: reset to 1. Runs as a single
    /// read-modify-write under the connection lock, so a concurrent fire for
    /// the same reminder cannot interleave.
    pub async fn update_streak(&self, schedule_id: i64, today: NaiveDate) -> Result<u32> {
        let connection = self.connection.lock().await;

        let (last_taken, streak) = {
            let mut statement = connection
                .prepare("SELECT last_taken_date, streak FROM schedules WHERE id = ?")?;
            statement.bind((1, schedule_id))?;
            if let State::Row = statement.next()? {
                let last: Option<String> = statement.read("last_taken_date")?;
                let streak: i64 = statement.read("streak")?;
                (last, streak as u32)
            } else {
                return Err(BotError::not_found(format!("reminder {schedule_id}")));
            }
        };

        let last_taken = last_taken
            .map(|raw| parse_date(&raw))
            .transpose()?;

        let new_streak = match last_taken {
            Some(date) if date == today => return Ok(streak),
            Some(date) if date == today - Duration::days(1) => streak + 1,
            _ => 1,
        };

        let mut statement = connection
            .prepare("UPDATE schedules SET streak = ?, last_taken_date = ? WHERE id = ?")?;
        statement.bind((1, new_streak as i64))?;
        statement.bind((2, today.format("%Y-%m-%d").to_string().as_str()))?;
        statement.bind((3, schedule_id))?;
        statement.next()?;

        debug!("Streak for reminder {schedule_id} is now {new_streak}");
        Ok(new_streak)
    }

    // Users

    pub async fn set_user_timezone(&self, user_id: &str, timezone: &str) -> Result<()> {
        let connection = self.connection.lock().await;
        let mut statement =
            connection.prepare("INSERT OR REPLACE INTO users (id, tz) VALUES (?, ?)")?;
        statement.bind((1, user_id))?;
        statement.bind((2, timezone))?;
        statement.next()?;
        Ok(())
    }

    pub async fn get_user_timezone(&self, user_id: &str) -> Result<Option<String>> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare("SELECT tz FROM users WHERE id = ?")?;
        statement.bind((1, user_id))?;
        if let State::Row = statement.next()? {
            Ok(Some(statement.read("tz")?))
        } else {
            Ok(None)
        }
    }

    // Snoozes

    pub async fn create_snooze(
        &self,
        id: &str,
        schedule_id: i64,
        fire_at: DateTime<Utc>,
    ) -> Result<()> {
        let connection = self.connection.lock().await;
        let mut statement = connection
            .prepare("INSERT OR REPLACE INTO snoozes (id, schedule_id, fire_at) VALUES (?, ?, ?)")?;
        statement.bind((1, id))?;
        statement.bind((2, schedule_id))?;
        statement.bind((3, fire_at.to_rfc3339().as_str()))?;
        statement.next()?;
        Ok(())
    }

    /// Remove a single snooze. No-op when absent (it may already have been
    /// consumed by an acknowledgment).
    pub async fn delete_snooze(&self, id: &str) -> Result<()> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare("DELETE FROM snoozes WHERE id = ?")?;
        statement.bind((1, id))?;
        statement.next()?;
        Ok(())
    }

    pub async fn delete_snoozes_for(&self, schedule_id: i64) -> Result<()> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare("DELETE FROM snoozes WHERE schedule_id = ?")?;
        statement.bind((1, schedule_id))?;
        statement.next()?;
        Ok(())
    }

    pub async fn list_snoozes(&self) -> Result<Vec<PendingSnooze>> {
        let connection = self.connection.lock().await;
        let mut statement =
            connection.prepare("SELECT id, schedule_id, fire_at FROM snoozes ORDER BY fire_at")?;
        let mut snoozes = Vec::new();
        while let State::Row = statement.next()? {
            let raw: String = statement.read("fire_at")?;
            let fire_at = DateTime::parse_from_rfc3339(&raw)
                .with_context(|| format!("bad snooze fire_at: {raw}"))?
                .with_timezone(&Utc);
            snoozes.push(PendingSnooze {
                id: statement.read("id")?,
                schedule_id: statement.read("schedule_id")?,
                fire_at,
            });
        }
        Ok(snoozes)
    }

    // Action log

    /// Append a user action to the audit trail.
    pub async fn log_action(&self, user_id: &str, action: &str) -> Result<()> {
        let connection = self.connection.lock().await;
        let mut statement = connection.prepare(
            "INSERT INTO action_log (user_id, action, timestamp) VALUES (?, ?, ?)",
        )?;
        statement.bind((1, user_id))?;
        statement.bind((2, action))?;
        statement.bind((3, Utc::now().to_rfc3339().as_str()))?;
        statement.next()?;
        Ok(())
    }
}

fn last_insert_rowid(connection: &Connection) -> Result<i64> {
    let mut statement = connection.prepare("SELECT last_insert_rowid()")?;
    if let State::Row = statement.next()? {
        Ok(statement.read::<i64, _>(0)?)
    } else {
        Err(BotError::store("last_insert_rowid returned no row"))
    }
}

fn changes(connection: &Connection) -> Result<i64> {
    let mut statement = connection.prepare("SELECT changes()")?;
    if let State::Row = statement.next()? {
        Ok(statement.read::<i64, _>(0)?)
    } else {
        Err(BotError::store("changes() returned no row"))
    }
}

/// Map "UPDATE touched zero rows" to the NotFound condition.
fn require_change(connection: &Connection, what: impl Fn() -> String) -> Result<()> {
    if changes(connection)? > 0 {
        Ok(())
    } else {
        Err(BotError::not_found(what()))
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("bad date: {raw}"))
}

fn read_reminder(statement: &sqlite::Statement<'_>) -> Result<Reminder> {
    let time_raw: String = statement.read("hhmm")?;
    let recurrence_raw: String = statement.read("recurrence")?;
    let last_taken: Option<String> = statement.read("last_taken_date")?;
    let active: i64 = statement.read("active")?;
    let streak: i64 = statement.read("streak")?;
    Ok(Reminder {
        id: statement.read("id")?,
        user_id: statement.read("user_id")?,
        chat_id: statement.read("chat_id")?,
        time: time_raw.parse()?,
        label: statement.read("label")?,
        timezone: statement.read("tz")?,
        recurrence: recurrence_raw.parse()?,
        active: active != 0,
        streak: streak as u32,
        last_taken_date: last_taken.map(|raw| parse_date(&raw)).transpose()?,
    })
}

fn read_occurrence(statement: &sqlite::Statement<'_>) -> Result<Occurrence> {
    let date_raw: String = statement.read("date")?;
    let time_raw: String = statement.read("time")?;
    let status_raw: String = statement.read("status")?;
    let created_raw: String = statement.read("created_at")?;
    Ok(Occurrence {
        id: statement.read("id")?,
        schedule_id: statement.read("schedule_id")?,
        date: parse_date(&date_raw)?,
        time: time_raw.parse()?,
        label: statement.read("label")?,
        status: status_raw.parse()?,
        created_at: DateTime::parse_from_rfc3339(&created_raw)
            .with_context(|| format!("bad created_at: {created_raw}"))?
            .with_timezone(&Utc),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::BotError;

    async fn temp_db(name: &str) -> Database {
        let path = std::env::temp_dir().join(format!(
            "pillbox_db_test_{name}_{}.db",
            uuid::Uuid::new_v4()
        ));
        Database::new(path.to_str().unwrap()).await.unwrap()
    }

    fn tod(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn seed(db: &Database) -> i64 {
        db.create_reminder(
            "u1",
            "c1",
            tod("08:00"),
            "Vitamin C",
            "Asia/Tashkent",
            Recurrence::Daily,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_reminder() {
        let db = temp_db("create_get").await;
        let id = seed(&db).await;

        let reminder = db.get_reminder(id).await.unwrap();
        assert_eq!(reminder.label, "Vitamin C");
        assert_eq!(reminder.time, tod("08:00"));
        assert_eq!(reminder.recurrence, Recurrence::Daily);
        assert!(reminder.active);
        assert_eq!(reminder.streak, 0);
        assert!(reminder.last_taken_date.is_none());
    }

    #[tokio::test]
    async fn test_get_unknown_reminder_is_not_found() {
        let db = temp_db("not_found").await;
        let err = db.get_reminder(9999).await.unwrap_err();
        assert!(BotError::is_not_found(&err));
    }

    #[tokio::test]
    async fn test_empty_label_rejected() {
        let db = temp_db("empty_label").await;
        let err = db
            .create_reminder("u1", "c1", tod("08:00"), "   ", "UTC", Recurrence::Daily)
            .await
            .unwrap_err();
        assert!(BotError::is_validation(&err));
    }

    #[tokio::test]
    async fn test_soft_delete_keeps_history() {
        let db = temp_db("soft_delete").await;
        let id = seed(&db).await;
        db.create_occurrence_if_absent(id, day("2026-08-06"), tod("08:00"), "Vitamin C")
            .await
            .unwrap();

        db.set_reminder_active(id, false).await.unwrap();
        assert!(db.list_active_reminders().await.unwrap().is_empty());

        // History survives the soft delete.
        let latest = db.get_latest_occurrence(id).await.unwrap();
        assert!(latest.is_some());
        // And the row itself is still readable.
        assert!(!db.get_reminder(id).await.unwrap().active);
    }

    #[tokio::test]
    async fn test_occurrence_upsert_is_idempotent() {
        let db = temp_db("occ_upsert").await;
        let id = seed(&db).await;
        let date = day("2026-08-06");

        assert!(db
            .create_occurrence_if_absent(id, date, tod("08:00"), "Vitamin C")
            .await
            .unwrap());
        assert!(!db
            .create_occurrence_if_absent(id, date, tod("08:00"), "Vitamin C")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_occurrence_unique_under_concurrency() {
        let db = temp_db("occ_race").await;
        let id = seed(&db).await;
        let date = day("2026-08-06");

        let mut handles = Vec::new();
        for _ in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.create_occurrence_if_absent(id, date, tod("08:00"), "Vitamin C")
                    .await
                    .unwrap()
            }));
        }
        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
    }

    #[tokio::test]
    async fn test_occurrence_keeps_time_after_edit() {
        let db = temp_db("occ_history").await;
        let id = seed(&db).await;
        db.create_occurrence_if_absent(id, day("2026-08-06"), tod("08:00"), "Vitamin C")
            .await
            .unwrap();

        db.update_reminder_time(id, tod("21:00")).await.unwrap();
        db.update_reminder_label(id, "Vitamin D").await.unwrap();

        let occurrence = db.get_latest_occurrence(id).await.unwrap().unwrap();
        assert_eq!(occurrence.time, tod("08:00"));
        assert_eq!(occurrence.label, "Vitamin C");
    }

    #[tokio::test]
    async fn test_streak_consecutive_days() {
        let db = temp_db("streak_consecutive").await;
        let id = seed(&db).await;

        assert_eq!(db.update_streak(id, day("2026-08-01")).await.unwrap(), 1);
        assert_eq!(db.update_streak(id, day("2026-08-02")).await.unwrap(), 2);
        assert_eq!(db.update_streak(id, day("2026-08-03")).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_streak_same_day_is_idempotent() {
        let db = temp_db("streak_idempotent").await;
        let id = seed(&db).await;

        assert_eq!(db.update_streak(id, day("2026-08-01")).await.unwrap(), 1);
        assert_eq!(db.update_streak(id, day("2026-08-02")).await.unwrap(), 2);
        assert_eq!(db.update_streak(id, day("2026-08-02")).await.unwrap(), 2);
        assert_eq!(db.update_streak(id, day("2026-08-02")).await.unwrap(), 2);

        let reminder = db.get_reminder(id).await.unwrap();
        assert_eq!(reminder.streak, 2);
    }

    #[tokio::test]
    async fn test_streak_gap_resets() {
        let db = temp_db("streak_gap").await;
        let id = seed(&db).await;

        assert_eq!(db.update_streak(id, day("2026-08-01")).await.unwrap(), 1);
        assert_eq!(db.update_streak(id, day("2026-08-02")).await.unwrap(), 2);
        // Two missed days.
        assert_eq!(db.update_streak(id, day("2026-08-05")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_user_timezone_round_trip() {
        let db = temp_db("user_tz").await;
        assert!(db.get_user_timezone("u1").await.unwrap().is_none());
        db.set_user_timezone("u1", "Europe/London").await.unwrap();
        assert_eq!(
            db.get_user_timezone("u1").await.unwrap().as_deref(),
            Some("Europe/London")
        );
        db.set_user_timezone("u1", "Asia/Tashkent").await.unwrap();
        assert_eq!(
            db.get_user_timezone("u1").await.unwrap().as_deref(),
            Some("Asia/Tashkent")
        );
    }

    #[tokio::test]
    async fn test_snooze_round_trip() {
        let db = temp_db("snoozes").await;
        let id = seed(&db).await;
        let fire_at = Utc::now() + Duration::minutes(10);

        db.create_snooze("snooze_1_abc", id, fire_at).await.unwrap();
        let pending = db.list_snoozes().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].schedule_id, id);
        assert_eq!(pending[0].fire_at.timestamp(), fire_at.timestamp());

        db.delete_snoozes_for(id).await.unwrap();
        assert!(db.list_snoozes().await.unwrap().is_empty());

        // Deleting an already-consumed snooze is a no-op.
        db.delete_snooze("snooze_1_abc").await.unwrap();
    }
}
