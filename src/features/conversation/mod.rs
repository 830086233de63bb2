//! # Conversation Feature
//!
//! Per-chat dialog state machine for creating and editing reminders.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false

pub mod engine;

pub use engine::{
    ConversationEngine, ConversationInput, ConversationReply, ConversationState,
    EXPECTED_TIME_FORMAT, PRESET_TIMES,
};
