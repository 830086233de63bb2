//! Notification delivery seam
//!
//! The engine never talks to a chat transport directly; it hands a fully
//! resolved "send this reminder now" instruction to whatever implements
//! [`NotificationDispatcher`]. Delivery is best-effort: the scheduler logs a
//! failure and moves on, the next opportunity being tomorrow's fire or a
//! manual snooze.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.5.0

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::sync::Mutex;

use crate::features::reminders::types::TimeOfDay;

/// Delivers one reminder notification to a chat channel.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Deliver the reminder for `label` (scheduled at `time`) to `chat_id`.
    ///
    /// An `Err` means delivery failed; the caller logs it and does not retry.
    async fn send(&self, chat_id: &str, label: &str, time: TimeOfDay) -> Result<()>;
}

/// Dispatcher that writes notifications to the log. Default for the console
/// binary and for running the engine without a transport attached.
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn send(&self, chat_id: &str, label: &str, time: TimeOfDay) -> Result<()> {
        info!("💊 [{chat_id}] {label} — time for your {time} dose");
        Ok(())
    }
}

/// Dispatcher that records every notification in memory. Used by tests and
/// dry runs to observe what would have been delivered.
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<(String, String, TimeOfDay)>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String, TimeOfDay)> {
        self.sent.lock().expect("dispatcher lock poisoned").clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("dispatcher lock poisoned").len()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send(&self, chat_id: &str, label: &str, time: TimeOfDay) -> Result<()> {
        self.sent
            .lock()
            .expect("dispatcher lock poisoned")
            .push((chat_id.to_string(), label.to_string(), time));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait must stay object-safe: the scheduler holds it as Arc<dyn ...>.
    fn _assert_object_safe(_: &dyn NotificationDispatcher) {}

    #[tokio::test]
    async fn test_recording_dispatcher_captures_sends() {
        let dispatcher = RecordingDispatcher::new();
        let time: TimeOfDay = "08:00".parse().unwrap();
        dispatcher.send("chat-1", "Vitamin C", time).await.unwrap();

        let sent = dispatcher.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "chat-1");
        assert_eq!(sent[0].1, "Vitamin C");
    }
}
