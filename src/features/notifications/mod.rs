//! # Notifications Feature
//!
//! Delivery boundary between the reminder engine and the chat transport.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.5.0
//! - **Toggleable**: false

pub mod dispatcher;

pub use dispatcher::{LogDispatcher, NotificationDispatcher, RecordingDispatcher};
