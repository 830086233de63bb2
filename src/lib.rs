// Core layer - configuration and error taxonomy
pub mod core;

// Features layer - all feature modules
pub mod features;

// Infrastructure - durable storage
pub mod database;

// Re-export core config for convenience
pub use core::{BotError, Config};

// Re-export feature items
pub use features::{
    // Adherence
    AdherenceTracker,
    // Conversation
    ConversationEngine, ConversationInput, ConversationReply,
    // Notifications
    LogDispatcher, NotificationDispatcher,
    // Reminders
    Occurrence, OccurrenceStatus, Recurrence, Reminder, ReminderScheduler, SchedulerConfig,
    TimeOfDay,
    // Timezone detection
    detect_timezone_by_ip,
};

// Re-export storage handle
pub use database::Database;
