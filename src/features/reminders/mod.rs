//! # Reminders Feature
//!
//! Timezone-aware reminder definitions, next-fire computation and the trigger
//! scheduler.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: true

pub mod scheduler;
pub mod timing;
pub mod types;

pub use scheduler::{ReminderScheduler, SchedulerConfig};
pub use types::{Occurrence, OccurrenceStatus, Recurrence, Reminder, TimeOfDay};
