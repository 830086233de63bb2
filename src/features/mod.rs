//! # Features Module
//!
//! All feature modules of the reminder engine.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0

pub mod adherence;
pub mod conversation;
pub mod notifications;
pub mod reminders;
pub mod timezone;

// Re-export feature items
pub use adherence::AdherenceTracker;
pub use conversation::{ConversationEngine, ConversationInput, ConversationReply};
pub use notifications::{LogDispatcher, NotificationDispatcher, RecordingDispatcher};
pub use reminders::{
    Occurrence, OccurrenceStatus, Recurrence, Reminder, ReminderScheduler, SchedulerConfig,
    TimeOfDay,
};
pub use timezone::detect_timezone_by_ip;
