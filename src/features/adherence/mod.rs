//! # Adherence Feature
//!
//! Acknowledgment handling and consecutive-day streak tracking.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.4.0
//! - **Toggleable**: true

pub mod tracker;

pub use tracker::AdherenceTracker;
