//! Reminder trigger scheduler
//!
//! One timer task per active reminder plus uuid-tagged one-shots for snoozes
//! and catch-up fires. Timer tasks do nothing but sleep and enqueue: every
//! fire is handed to a bounded worker pool, so a slow or failing delivery
//! never stalls another reminder's timer.
//!
//! The in-memory timer set is private to this process and never trusted
//! across a restart — [`ReminderScheduler::reconcile`] drops everything and
//! re-arms from the database, which is the single source of truth.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.3.0
//!
//! ## Changelog
//! - 2.0.0: Bounded worker pool; persisted snoozes re-armed on reconcile
//! - 1.1.0: Catch-up one-shot for imminent reminders
//! - 1.0.0: Initial release with per-reminder daily timers

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::core::config::Config;
use crate::core::error::BotError;
use crate::database::Database;
use crate::features::notifications::NotificationDispatcher;

use super::timing;
use super::types::{OccurrenceStatus, Recurrence, Reminder};

/// Scheduler knobs, usually derived from [`Config`].
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Arm an immediate catch-up fire when the next regular fire is within
    /// this many minutes.
    pub catchup_window_minutes: i64,
    /// How long a catch-up (or past-due snooze) waits before firing.
    pub catchup_grace: StdDuration,
    /// Number of fire workers.
    pub workers: usize,
    /// Capacity of the fire queue.
    pub queue_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            catchup_window_minutes: 10,
            catchup_grace: StdDuration::from_secs(15),
            workers: 4,
            queue_capacity: 64,
        }
    }
}

impl From<&Config> for SchedulerConfig {
    fn from(config: &Config) -> Self {
        SchedulerConfig {
            catchup_window_minutes: config.catchup_window_minutes,
            catchup_grace: StdDuration::from_secs(config.catchup_grace_seconds),
            workers: config.fire_workers,
            queue_capacity: config.fire_queue_capacity,
        }
    }
}

/// Why a fire event was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FireKind {
    /// The regular timer of a daily reminder
    Daily,
    /// The single firing of a one-off reminder
    Once,
    /// Immediate fire for a reminder created/edited moments before its time
    CatchUp,
    /// A user-requested snooze re-notification
    Snooze,
}

#[derive(Debug, Clone)]
struct FireEvent {
    schedule_id: i64,
    kind: FireKind,
    /// Persisted snooze row to consume, for [`FireKind::Snooze`]
    snooze_id: Option<String>,
}

struct OneShot {
    schedule_id: i64,
    handle: JoinHandle<()>,
}

/// Owns the timer set and the fire worker pool. Constructed once per process
/// and shared behind an `Arc`; there is no ambient singleton.
pub struct ReminderScheduler {
    database: Database,
    config: SchedulerConfig,
    /// Regular timer per reminder id. Invariant: at most one entry per id.
    timers: Arc<DashMap<i64, JoinHandle<()>>>,
    /// Snooze/catch-up one-shots, keyed by their distinguishing tag.
    oneshots: Arc<DashMap<String, OneShot>>,
    fire_tx: mpsc::Sender<FireEvent>,
}

impl ReminderScheduler {
    /// Create the scheduler and spawn its worker pool. No timers are armed
    /// until [`arm`](Self::arm) or [`reconcile`](Self::reconcile) is called.
    pub fn new(
        database: Database,
        dispatcher: Arc<dyn NotificationDispatcher>,
        config: SchedulerConfig,
    ) -> Self {
        let (fire_tx, fire_rx) = mpsc::channel(config.queue_capacity.max(1));
        let timers: Arc<DashMap<i64, JoinHandle<()>>> = Arc::new(DashMap::new());

        let fire_rx = Arc::new(Mutex::new(fire_rx));
        for worker_id in 0..config.workers.max(1) {
            let worker = FireWorker {
                database: database.clone(),
                dispatcher: Arc::clone(&dispatcher),
                timers: Arc::clone(&timers),
            };
            let fire_rx = Arc::clone(&fire_rx);
            tokio::spawn(async move {
                loop {
                    let event = { fire_rx.lock().await.recv().await };
                    match event {
                        Some(event) => worker.handle(event).await,
                        None => break,
                    }
                }
                debug!("Fire worker {worker_id} stopped");
            });
        }

        ReminderScheduler {
            database,
            config,
            timers,
            oneshots: Arc::new(DashMap::new()),
            fire_tx,
        }
    }

    /// Arm (or re-arm) the regular timer for a reminder. Replaces any
    /// existing timer for the same id, preserving the one-timer-per-reminder
    /// invariant.
    pub fn arm(&self, reminder: &Reminder) -> Result<()> {
        if !reminder.active {
            self.disarm(reminder.id);
            return Ok(());
        }
        let zone = timing::resolve_timezone(&reminder.timezone)?;
        let schedule_id = reminder.id;
        let at = reminder.time;
        let recurrence = reminder.recurrence;
        let fire_tx = self.fire_tx.clone();
        let timers = Arc::clone(&self.timers);

        let handle = tokio::spawn(async move {
            loop {
                let now = timing::now_in(zone);
                let next = timing::next_fire_instant(now, at);
                let wait = (next - now).to_std().unwrap_or(StdDuration::ZERO);
                debug!("Reminder {schedule_id} sleeps {}s until {next}", wait.as_secs());
                tokio::time::sleep(wait).await;

                let kind = match recurrence {
                    Recurrence::Daily => FireKind::Daily,
                    Recurrence::Once => FireKind::Once,
                };
                let event = FireEvent {
                    schedule_id,
                    kind,
                    snooze_id: None,
                };
                if fire_tx.send(event).await.is_err() {
                    break;
                }
                if recurrence == Recurrence::Once {
                    timers.remove(&schedule_id);
                    break;
                }
            }
        });

        if let Some(previous) = self.timers.insert(reminder.id, handle) {
            previous.abort();
        }
        debug!(
            "Armed {} timer for reminder {} at {} ({})",
            reminder.recurrence, reminder.id, reminder.time, reminder.timezone
        );
        Ok(())
    }

    /// Arm a newly created or edited reminder. When the next regular fire is
    /// within the configured lookahead window, an immediate one-shot is armed
    /// a few seconds out as well, so a reminder set for "in five minutes" is
    /// not perceived as silently deferred.
    pub fn arm_with_catchup(&self, reminder: &Reminder) -> Result<()> {
        self.arm(reminder)?;

        let zone = timing::resolve_timezone(&reminder.timezone)?;
        let minutes = timing::minutes_until_next_fire(timing::now_in(zone), reminder.time);
        if minutes <= self.config.catchup_window_minutes {
            let fire_at = Utc::now()
                + Duration::from_std(self.config.catchup_grace).unwrap_or(Duration::zero());
            info!(
                "Catch-up fire armed for reminder {} ({minutes} min until the scheduled instant)",
                reminder.id
            );
            self.spawn_oneshot(
                oneshot_tag("catchup", reminder.id),
                reminder.id,
                fire_at,
                FireKind::CatchUp,
            );
        }
        Ok(())
    }

    /// Cancel the regular timer for a reminder. Idempotent; an already
    /// in-flight fire for the same id is not affected, only the next
    /// scheduled instance.
    pub fn disarm(&self, schedule_id: i64) {
        if let Some((_, handle)) = self.timers.remove(&schedule_id) {
            handle.abort();
            debug!("Disarmed timer for reminder {schedule_id}");
        }
    }

    /// Arm a persisted snooze one-shot for `schedule_id` at `fire_at`. The
    /// returned tag distinguishes it from the reminder's regular timer and
    /// from other one-shots for the same reminder.
    pub async fn arm_once_at(&self, schedule_id: i64, fire_at: DateTime<Utc>) -> Result<String> {
        let tag = oneshot_tag("snooze", schedule_id);
        self.database
            .create_snooze(&tag, schedule_id, fire_at)
            .await?;
        self.spawn_oneshot(tag.clone(), schedule_id, fire_at, FireKind::Snooze);
        debug!("Snooze {tag} armed for {fire_at}");
        Ok(tag)
    }

    /// Cancel every pending one-shot (snooze or catch-up) for a reminder and
    /// drop its persisted snoozes. Called on acknowledgment and deletion.
    pub async fn disarm_oneshots(&self, schedule_id: i64) -> Result<()> {
        let tags: Vec<String> = self
            .oneshots
            .iter()
            .filter(|entry| entry.value().schedule_id == schedule_id)
            .map(|entry| entry.key().clone())
            .collect();
        for tag in tags {
            if let Some((_, oneshot)) = self.oneshots.remove(&tag) {
                oneshot.handle.abort();
                debug!("Disarmed one-shot {tag}");
            }
        }
        self.database.delete_snoozes_for(schedule_id).await
    }

    /// Rebuild the entire timer set from the database: drop every in-memory
    /// timer, arm all active reminders, re-arm persisted snoozes (past-due
    /// ones fire a few seconds out). Idempotent; called once at startup.
    pub async fn reconcile(&self) -> Result<usize> {
        self.timers.retain(|_, handle| {
            handle.abort();
            false
        });
        self.oneshots.retain(|_, oneshot| {
            oneshot.handle.abort();
            false
        });

        let reminders = self.database.list_active_reminders().await?;
        let mut armed = 0;
        for reminder in &reminders {
            match self.arm(reminder) {
                Ok(()) => armed += 1,
                Err(e) => error!("Failed to arm reminder {}: {e:#}", reminder.id),
            }
        }

        let snoozes = self.database.list_snoozes().await?;
        let grace = Duration::from_std(self.config.catchup_grace).unwrap_or(Duration::zero());
        for snooze in &snoozes {
            let fire_at = if snooze.fire_at <= Utc::now() {
                Utc::now() + grace
            } else {
                snooze.fire_at
            };
            self.spawn_oneshot(
                snooze.id.clone(),
                snooze.schedule_id,
                fire_at,
                FireKind::Snooze,
            );
        }

        info!(
            "Reconciled timers: {armed} reminders armed, {} pending snoozes re-armed",
            snoozes.len()
        );
        Ok(armed)
    }

    /// Number of armed regular timers. Exposed for status reporting.
    pub fn armed_timers(&self) -> usize {
        self.timers.len()
    }

    /// Number of pending one-shots (snoozes and catch-ups).
    pub fn pending_oneshots(&self) -> usize {
        self.oneshots.len()
    }

    fn spawn_oneshot(
        &self,
        tag: String,
        schedule_id: i64,
        fire_at: DateTime<Utc>,
        kind: FireKind,
    ) {
        let fire_tx = self.fire_tx.clone();
        let oneshots = Arc::clone(&self.oneshots);
        let snooze_id = (kind == FireKind::Snooze).then(|| tag.clone());
        let task_tag = tag.clone();

        let handle = tokio::spawn(async move {
            let wait = (fire_at - Utc::now()).to_std().unwrap_or(StdDuration::ZERO);
            tokio::time::sleep(wait).await;
            let event = FireEvent {
                schedule_id,
                kind,
                snooze_id,
            };
            let _ = fire_tx.send(event).await;
            oneshots.remove(&task_tag);
        });

        if let Some(previous) = self.oneshots.insert(
            tag,
            OneShot {
                schedule_id,
                handle,
            },
        ) {
            previous.handle.abort();
        }
    }
}

fn oneshot_tag(prefix: &str, schedule_id: i64) -> String {
    format!("{prefix}_{schedule_id}_{}", uuid::Uuid::new_v4())
}

/// Consumes fire events off the queue. Occurrence creation always
/// happens-before dispatch; no scheduling lock is held across either await.
struct FireWorker {
    database: Database,
    dispatcher: Arc<dyn NotificationDispatcher>,
    timers: Arc<DashMap<i64, JoinHandle<()>>>,
}

impl FireWorker {
    async fn handle(&self, event: FireEvent) {
        let schedule_id = event.schedule_id;
        if let Err(e) = self.process(event).await {
            if BotError::is_not_found(&e) {
                // Reminder vanished between arm and fire; drop its timer.
                debug!("Fire for unknown reminder {schedule_id}, disarming");
                if let Some((_, handle)) = self.timers.remove(&schedule_id) {
                    handle.abort();
                }
            } else {
                error!("Fire for reminder {schedule_id} failed: {e:#}");
            }
        }
    }

    async fn process(&self, event: FireEvent) -> Result<()> {
        // Consume the persisted snooze first; once we are processing it, it
        // must not come back after a restart.
        if let Some(snooze_id) = &event.snooze_id {
            self.database.delete_snooze(snooze_id).await?;
        }

        let reminder = self.database.get_reminder(event.schedule_id).await?;
        if !reminder.active && event.kind != FireKind::Snooze {
            return Ok(());
        }

        let zone = timing::resolve_timezone(&reminder.timezone)?;
        let today = timing::now_in(zone).date_naive();
        let inserted = self
            .database
            .create_occurrence_if_absent(reminder.id, today, reminder.time, &reminder.label)
            .await?;

        let should_dispatch = match event.kind {
            // A regular or catch-up fire that finds today's occurrence
            // already present is a duplicate (restart replay, catch-up plus
            // regular timer, or a pre-emptive acknowledgment).
            FireKind::Daily | FireKind::Once | FireKind::CatchUp => inserted,
            // A snooze re-notifies unless the dose was taken meanwhile.
            FireKind::Snooze => match self.database.get_latest_occurrence(reminder.id).await? {
                Some(occurrence) => {
                    !(occurrence.date == today && occurrence.status == OccurrenceStatus::Taken)
                }
                None => true,
            },
        };

        if should_dispatch {
            if let Err(e) = self
                .dispatcher
                .send(&reminder.chat_id, &reminder.label, reminder.time)
                .await
            {
                // Best-effort delivery: log for the operator, never retry the
                // same fire.
                warn!(
                    "Delivery failed for reminder {} ({}): {e:#}",
                    reminder.id, reminder.label
                );
            }
        } else {
            debug!(
                "Suppressed duplicate {:?} fire for reminder {} on {today}",
                event.kind, reminder.id
            );
        }

        // A one-off reminder is done after its single firing.
        if reminder.recurrence == Recurrence::Once && event.kind != FireKind::Snooze {
            self.database.set_reminder_active(reminder.id, false).await?;
            if let Some((_, handle)) = self.timers.remove(&reminder.id) {
                handle.abort();
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::notifications::RecordingDispatcher;
    use crate::features::reminders::types::TimeOfDay;
    use chrono::Timelike;

    async fn temp_db(name: &str) -> Database {
        let path = std::env::temp_dir().join(format!(
            "pillbox_sched_test_{name}_{}.db",
            uuid::Uuid::new_v4()
        ));
        Database::new(path.to_str().unwrap()).await.unwrap()
    }

    fn fast_config() -> SchedulerConfig {
        SchedulerConfig {
            catchup_window_minutes: 10,
            catchup_grace: StdDuration::from_millis(50),
            workers: 2,
            queue_capacity: 16,
        }
    }

    fn scheduler_with(
        database: Database,
    ) -> (Arc<ReminderScheduler>, Arc<RecordingDispatcher>) {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let scheduler = Arc::new(ReminderScheduler::new(
            database,
            dispatcher.clone(),
            fast_config(),
        ));
        (scheduler, dispatcher)
    }

    /// A time of day a few minutes ahead of now in `zone`.
    fn soon_in(zone: chrono_tz::Tz, minutes: i64) -> TimeOfDay {
        let at = timing::now_in(zone) + Duration::minutes(minutes);
        TimeOfDay::new(at.hour() as u8, at.minute() as u8).unwrap()
    }

    async fn seed_daily(db: &Database, label: &str, time: TimeOfDay) -> i64 {
        db.create_reminder("u1", "c1", time, label, "Asia/Tashkent", Recurrence::Daily)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_reconcile_arms_all_active_reminders() {
        let db = temp_db("reconcile").await;
        let zone = chrono_tz::Asia::Tashkent;
        for label in ["Vitamin C", "Zinc", "Aspirin"] {
            seed_daily(&db, label, soon_in(zone, 120)).await;
        }
        // An inactive reminder must not get a timer.
        let paused = seed_daily(&db, "Paused", soon_in(zone, 120)).await;
        db.set_reminder_active(paused, false).await.unwrap();

        let (scheduler, _) = scheduler_with(db);
        assert_eq!(scheduler.reconcile().await.unwrap(), 3);
        assert_eq!(scheduler.armed_timers(), 3);

        // Idempotent: a second reconcile neither duplicates nor drops timers.
        assert_eq!(scheduler.reconcile().await.unwrap(), 3);
        assert_eq!(scheduler.armed_timers(), 3);
    }

    #[tokio::test]
    async fn test_catchup_fires_within_window() {
        let db = temp_db("catchup").await;
        let zone = chrono_tz::Asia::Tashkent;
        let id = seed_daily(&db, "Vitamin C", soon_in(zone, 5)).await;

        let (scheduler, dispatcher) = scheduler_with(db.clone());
        let reminder = db.get_reminder(id).await.unwrap();
        scheduler.arm_with_catchup(&reminder).unwrap();

        tokio::time::sleep(StdDuration::from_millis(400)).await;
        assert_eq!(dispatcher.sent_count(), 1);

        let today = timing::now_in(zone).date_naive();
        let occurrence = db.get_latest_occurrence(id).await.unwrap().unwrap();
        assert_eq!(occurrence.date, today);
        assert_eq!(occurrence.status, OccurrenceStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_duplicate_catchup_is_suppressed() {
        let db = temp_db("catchup_dup").await;
        let zone = chrono_tz::Asia::Tashkent;
        let id = seed_daily(&db, "Vitamin C", soon_in(zone, 5)).await;

        let (scheduler, dispatcher) = scheduler_with(db.clone());
        let reminder = db.get_reminder(id).await.unwrap();
        scheduler.arm_with_catchup(&reminder).unwrap();
        tokio::time::sleep(StdDuration::from_millis(400)).await;

        // Re-arming (as an edit would) finds today's occurrence and stays quiet.
        scheduler.arm_with_catchup(&reminder).unwrap();
        tokio::time::sleep(StdDuration::from_millis(400)).await;
        assert_eq!(dispatcher.sent_count(), 1);
    }

    #[tokio::test]
    async fn test_no_catchup_outside_window() {
        let db = temp_db("no_catchup").await;
        let zone = chrono_tz::Asia::Tashkent;
        let id = seed_daily(&db, "Vitamin C", soon_in(zone, 120)).await;

        let (scheduler, dispatcher) = scheduler_with(db.clone());
        let reminder = db.get_reminder(id).await.unwrap();
        scheduler.arm_with_catchup(&reminder).unwrap();

        tokio::time::sleep(StdDuration::from_millis(300)).await;
        assert_eq!(dispatcher.sent_count(), 0);
        assert_eq!(scheduler.armed_timers(), 1);
    }

    #[tokio::test]
    async fn test_past_due_snooze_fires_after_reconcile() {
        let db = temp_db("snooze_recover").await;
        let zone = chrono_tz::Asia::Tashkent;
        let id = seed_daily(&db, "Vitamin C", soon_in(zone, 120)).await;
        // Snooze that came due while the process was down.
        db.create_snooze("snooze_stale", id, Utc::now() - Duration::minutes(3))
            .await
            .unwrap();

        let (scheduler, dispatcher) = scheduler_with(db.clone());
        scheduler.reconcile().await.unwrap();

        tokio::time::sleep(StdDuration::from_millis(400)).await;
        assert_eq!(dispatcher.sent_count(), 1);
        // Consumed: it must not fire again after another restart.
        assert!(db.list_snoozes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disarm_is_idempotent() {
        let db = temp_db("disarm").await;
        let zone = chrono_tz::Asia::Tashkent;
        let id = seed_daily(&db, "Vitamin C", soon_in(zone, 120)).await;

        let (scheduler, _) = scheduler_with(db.clone());
        let reminder = db.get_reminder(id).await.unwrap();
        scheduler.arm(&reminder).unwrap();
        assert_eq!(scheduler.armed_timers(), 1);

        scheduler.disarm(id);
        scheduler.disarm(id);
        scheduler.disarm(9999);
        assert_eq!(scheduler.armed_timers(), 0);
    }

    #[tokio::test]
    async fn test_arm_replaces_existing_timer() {
        let db = temp_db("rearm").await;
        let zone = chrono_tz::Asia::Tashkent;
        let id = seed_daily(&db, "Vitamin C", soon_in(zone, 120)).await;

        let (scheduler, _) = scheduler_with(db.clone());
        let reminder = db.get_reminder(id).await.unwrap();
        scheduler.arm(&reminder).unwrap();
        scheduler.arm(&reminder).unwrap();
        scheduler.arm(&reminder).unwrap();
        assert_eq!(scheduler.armed_timers(), 1);
    }

    #[tokio::test]
    async fn test_invalid_timezone_fails_to_arm() {
        let db = temp_db("bad_tz").await;
        let id = db
            .create_reminder(
                "u1",
                "c1",
                "08:00".parse().unwrap(),
                "Vitamin C",
                "Not/AZone",
                Recurrence::Daily,
            )
            .await
            .unwrap();

        let (scheduler, _) = scheduler_with(db.clone());
        let reminder = db.get_reminder(id).await.unwrap();
        assert!(scheduler.arm(&reminder).is_err());
        assert_eq!(scheduler.armed_timers(), 0);
    }
}
