//! Error taxonomy for the reminder engine
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.4.0
//!
//! ## Changelog
//! - 1.0.0: Initial taxonomy (validation / not-found / delivery / store)

use std::fmt;

/// Failure classes the engine distinguishes.
///
/// Carried inside `anyhow::Error` so call sites keep the usual `Result`/`?`
/// flow; callers that need to branch (e.g. turn an unknown id into a
/// user-visible "not found" instead of an operator alert) downcast with
/// [`BotError::is_not_found`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotError {
    /// Malformed user input (bad `HH:MM`, empty label). Recovered locally by
    /// re-prompting; never logged as an error.
    Validation(String),
    /// Operation on an unknown or deleted reminder.
    NotFound(String),
    /// Notification delivery failed. Logged, not retried in-line.
    Delivery(String),
    /// Database I/O or statement failure. Fatal to the specific operation.
    Store(String),
}

impl fmt::Display for BotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotError::Validation(msg) => write!(f, "invalid input: {msg}"),
            BotError::NotFound(what) => write!(f, "not found: {what}"),
            BotError::Delivery(msg) => write!(f, "delivery failed: {msg}"),
            BotError::Store(msg) => write!(f, "store failure: {msg}"),
        }
    }
}

impl std::error::Error for BotError {}

impl BotError {
    pub fn validation(msg: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(BotError::Validation(msg.into()))
    }

    pub fn not_found(what: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(BotError::NotFound(what.into()))
    }

    pub fn delivery(msg: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(BotError::Delivery(msg.into()))
    }

    pub fn store(msg: impl Into<String>) -> anyhow::Error {
        anyhow::Error::new(BotError::Store(msg.into()))
    }

    /// True when `err` wraps a [`BotError::NotFound`].
    pub fn is_not_found(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<BotError>(), Some(BotError::NotFound(_)))
    }

    /// True when `err` wraps a [`BotError::Validation`].
    pub fn is_validation(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<BotError>(), Some(BotError::Validation(_)))
    }
}
