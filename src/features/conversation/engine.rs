//! Multi-turn dialog state machine
//!
//! Tracks the create/edit dialogs as a finite state machine keyed per
//! `(user, chat)` pair. Inputs and replies are closed enums so the transport
//! layer can match them exhaustively; the engine itself never formats user
//! text. Scratch data survives rejected input — a malformed time re-prompts
//! without losing the label collected two turns earlier.
//!
//! State is ephemeral by design: dropping it on restart just means the dialog
//! starts over from idle.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.2.0: Optional recurrence step behind `ask_recurrence`
//! - 1.1.0: Label and time edit flows with the target id in scratch
//! - 1.0.0: Initial create dialog

use anyhow::Result;
use dashmap::DashMap;
use log::debug;
use regex::Regex;
use std::sync::Arc;

use crate::core::config::Config;
use crate::core::error::BotError;
use crate::database::Database;
use crate::features::reminders::scheduler::ReminderScheduler;
use crate::features::reminders::timing;
use crate::features::reminders::types::{Recurrence, TimeOfDay};

/// Preset time buttons offered in the time step.
pub const PRESET_TIMES: [&str; 7] = [
    "08:00", "10:00", "12:00", "14:00", "18:00", "20:00", "22:00",
];

/// Format description repeated verbatim on every rejected time input.
pub const EXPECTED_TIME_FORMAT: &str = "HH:MM (e.g. 20:30)";

/// Dialog position for one (user, chat) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingLabel,
    AwaitingTime,
    AwaitingCustomTime,
    AwaitingRecurrence,
}

/// Which reminder field an edit dialog is changing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditTarget {
    Label(i64),
    Time(i64),
}

/// Partially built reminder collected across turns.
#[derive(Debug, Clone, Default)]
struct Scratch {
    label: Option<String>,
    time: Option<TimeOfDay>,
    edit: Option<EditTarget>,
}

#[derive(Debug, Clone, Default)]
struct Session {
    state: ConversationState,
    scratch: Scratch,
}

/// One inbound user turn, already decoded by the transport (text message or
/// button payload).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationInput {
    /// "Add a reminder" button
    StartCreate,
    /// Free text
    Text(String),
    /// One of the preset time buttons
    PresetTime(String),
    /// "Other time" button
    CustomTimeRequested,
    /// Recurrence choice button
    RecurrenceChoice(Recurrence),
    /// "Edit name" button for an existing reminder
    StartEditLabel(i64),
    /// "Edit time" button for an existing reminder
    StartEditTime(i64),
    /// Abort the dialog from any state
    Cancel,
}

/// What the transport should render next. The engine decides state, the
/// transport decides wording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationReply {
    PromptLabel,
    PromptTime,
    PromptCustomTime,
    PromptRecurrence,
    /// Rejected time input; `expected` is the format description to repeat
    InvalidTime { expected: &'static str },
    InvalidLabel,
    Created {
        id: i64,
        label: String,
        time: TimeOfDay,
        timezone: String,
    },
    Updated { id: i64 },
    Cancelled,
    NotFound,
    /// Input that has no meaning in the current state
    Ignored,
}

type OwnerKey = (String, String);

/// The dialog engine. Holds every in-flight session; sessions never share
/// scratch, so concurrent owners cannot interfere.
pub struct ConversationEngine {
    database: Database,
    scheduler: Arc<ReminderScheduler>,
    sessions: DashMap<OwnerKey, Session>,
    time_format: Regex,
    default_timezone: String,
    default_recurrence: Recurrence,
    ask_recurrence: bool,
}

impl ConversationEngine {
    pub fn new(
        database: Database,
        scheduler: Arc<ReminderScheduler>,
        config: &Config,
    ) -> Result<Self> {
        // Fail at startup, not mid-dialog, when the defaults are unusable.
        timing::resolve_timezone(&config.default_timezone)?;
        let default_recurrence: Recurrence = config.default_recurrence.parse()?;
        let time_format = Regex::new(r"^([01][0-9]|2[0-3]):([0-5][0-9])$")?;

        Ok(ConversationEngine {
            database,
            scheduler,
            sessions: DashMap::new(),
            time_format,
            default_timezone: config.default_timezone.clone(),
            default_recurrence,
            ask_recurrence: config.ask_recurrence,
        })
    }

    /// Advance one owner's dialog by one turn.
    pub async fn handle(
        &self,
        user_id: &str,
        chat_id: &str,
        input: ConversationInput,
    ) -> Result<ConversationReply> {
        let key: OwnerKey = (user_id.to_string(), chat_id.to_string());

        // Cancel wins from any state and discards scratch.
        if input == ConversationInput::Cancel {
            self.sessions.remove(&key);
            return Ok(ConversationReply::Cancelled);
        }

        // Snapshot the session; the map guard must not be held across store
        // I/O below.
        let mut session = self
            .sessions
            .get(&key)
            .map(|entry| entry.clone())
            .unwrap_or_default();

        let reply = self.step(user_id, chat_id, &mut session, input).await?;

        if session.state == ConversationState::Idle {
            self.sessions.remove(&key);
        } else {
            self.sessions.insert(key, session);
        }
        Ok(reply)
    }

    async fn step(
        &self,
        user_id: &str,
        chat_id: &str,
        session: &mut Session,
        input: ConversationInput,
    ) -> Result<ConversationReply> {
        use ConversationInput as In;
        use ConversationReply as Out;
        use ConversationState as St;

        match input {
            // Dialog starters reset whatever was in flight.
            In::StartCreate => {
                *session = Session {
                    state: St::AwaitingLabel,
                    scratch: Scratch::default(),
                };
                Ok(Out::PromptLabel)
            }
            In::StartEditLabel(id) => match self.editable(id).await? {
                true => {
                    *session = Session {
                        state: St::AwaitingLabel,
                        scratch: Scratch {
                            edit: Some(EditTarget::Label(id)),
                            ..Scratch::default()
                        },
                    };
                    Ok(Out::PromptLabel)
                }
                false => {
                    session.state = St::Idle;
                    Ok(Out::NotFound)
                }
            },
            In::StartEditTime(id) => match self.editable(id).await? {
                true => {
                    *session = Session {
                        state: St::AwaitingTime,
                        scratch: Scratch {
                            edit: Some(EditTarget::Time(id)),
                            ..Scratch::default()
                        },
                    };
                    Ok(Out::PromptTime)
                }
                false => {
                    session.state = St::Idle;
                    Ok(Out::NotFound)
                }
            },

            In::Text(text) => match session.state {
                St::AwaitingLabel => {
                    let label = text.trim();
                    if label.is_empty() {
                        return Ok(Out::InvalidLabel);
                    }
                    if let Some(EditTarget::Label(id)) = session.scratch.edit {
                        return self.apply_label_edit(user_id, session, id, label).await;
                    }
                    session.scratch.label = Some(label.to_string());
                    session.state = St::AwaitingTime;
                    Ok(Out::PromptTime)
                }
                St::AwaitingCustomTime => match self.parse_time(&text) {
                    // Rejected input leaves scratch untouched and re-prompts.
                    None => Ok(Out::InvalidTime {
                        expected: EXPECTED_TIME_FORMAT,
                    }),
                    Some(time) => self.accept_time(user_id, chat_id, session, time).await,
                },
                _ => Ok(Out::Ignored),
            },

            In::PresetTime(raw) => match session.state {
                St::AwaitingTime => match self.parse_time(&raw) {
                    None => Ok(Out::InvalidTime {
                        expected: EXPECTED_TIME_FORMAT,
                    }),
                    Some(time) => self.accept_time(user_id, chat_id, session, time).await,
                },
                _ => Ok(Out::Ignored),
            },

            In::CustomTimeRequested => match session.state {
                St::AwaitingTime => {
                    session.state = St::AwaitingCustomTime;
                    Ok(Out::PromptCustomTime)
                }
                _ => Ok(Out::Ignored),
            },

            In::RecurrenceChoice(recurrence) => match session.state {
                St::AwaitingRecurrence => {
                    let time = match session.scratch.time {
                        Some(time) => time,
                        None => {
                            // Scratch lost its time; restart rather than guess.
                            session.state = St::Idle;
                            return Ok(Out::Ignored);
                        }
                    };
                    self.finalize_create(user_id, chat_id, session, time, recurrence)
                        .await
                }
                _ => Ok(Out::Ignored),
            },

            // Handled before dispatch; kept for exhaustiveness.
            In::Cancel => Ok(Out::Cancelled),
        }
    }

    /// A time was accepted in the time step (preset or custom). Either apply
    /// a pending time edit, ask for recurrence, or create right away.
    async fn accept_time(
        &self,
        user_id: &str,
        chat_id: &str,
        session: &mut Session,
        time: TimeOfDay,
    ) -> Result<ConversationReply> {
        if let Some(EditTarget::Time(id)) = session.scratch.edit {
            return self.apply_time_edit(user_id, session, id, time).await;
        }
        if self.ask_recurrence {
            session.scratch.time = Some(time);
            session.state = ConversationState::AwaitingRecurrence;
            return Ok(ConversationReply::PromptRecurrence);
        }
        self.finalize_create(user_id, chat_id, session, time, self.default_recurrence)
            .await
    }

    async fn finalize_create(
        &self,
        user_id: &str,
        chat_id: &str,
        session: &mut Session,
        time: TimeOfDay,
        recurrence: Recurrence,
    ) -> Result<ConversationReply> {
        let label = session
            .scratch
            .label
            .take()
            .unwrap_or_else(|| "Medication".to_string());
        let timezone = self.timezone_for(user_id).await?;

        let id = self
            .database
            .create_reminder(user_id, chat_id, time, &label, &timezone, recurrence)
            .await?;
        let reminder = self.database.get_reminder(id).await?;
        self.scheduler.arm_with_catchup(&reminder)?;
        self.database
            .log_action(user_id, &format!("add:{label}@{time}"))
            .await?;

        debug!("Dialog for {user_id} created reminder {id}");
        session.state = ConversationState::Idle;
        session.scratch = Scratch::default();
        Ok(ConversationReply::Created {
            id,
            label,
            time,
            timezone,
        })
    }

    async fn apply_label_edit(
        &self,
        user_id: &str,
        session: &mut Session,
        id: i64,
        label: &str,
    ) -> Result<ConversationReply> {
        session.state = ConversationState::Idle;
        session.scratch = Scratch::default();

        match self.database.update_reminder_label(id, label).await {
            Ok(()) => {
                self.database
                    .log_action(user_id, &format!("update_label:{id}:{label}"))
                    .await?;
                Ok(ConversationReply::Updated { id })
            }
            Err(e) if BotError::is_not_found(&e) => Ok(ConversationReply::NotFound),
            Err(e) => Err(e),
        }
    }

    async fn apply_time_edit(
        &self,
        user_id: &str,
        session: &mut Session,
        id: i64,
        time: TimeOfDay,
    ) -> Result<ConversationReply> {
        session.state = ConversationState::Idle;
        session.scratch = Scratch::default();

        match self.database.update_reminder_time(id, time).await {
            Ok(()) => {
                // The changed time moves the next fire; re-arm with catch-up
                // so an imminent new time still notifies today.
                let reminder = self.database.get_reminder(id).await?;
                self.scheduler.arm_with_catchup(&reminder)?;
                self.database
                    .log_action(user_id, &format!("update_time:{id}@{time}"))
                    .await?;
                Ok(ConversationReply::Updated { id })
            }
            Err(e) if BotError::is_not_found(&e) => Ok(ConversationReply::NotFound),
            Err(e) => Err(e),
        }
    }

    async fn editable(&self, id: i64) -> Result<bool> {
        match self.database.get_reminder(id).await {
            Ok(reminder) => Ok(reminder.active),
            Err(e) if BotError::is_not_found(&e) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn timezone_for(&self, user_id: &str) -> Result<String> {
        if let Some(stored) = self.database.get_user_timezone(user_id).await? {
            if timing::resolve_timezone(&stored).is_ok() {
                return Ok(stored);
            }
            debug!("Stored timezone {stored:?} for {user_id} is invalid, using default");
        }
        Ok(self.default_timezone.clone())
    }

    fn parse_time(&self, raw: &str) -> Option<TimeOfDay> {
        let raw = raw.trim();
        if !self.time_format.is_match(raw) {
            return None;
        }
        raw.parse().ok()
    }
}
