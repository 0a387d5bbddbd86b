//! Notification adapters.
//!
//! Implements the `port::Notifier` trait for alert backends. The log
//! notifier lives next to the port; Telegram is behind the `telegram` feature.

#[cfg(feature = "telegram")]
pub mod telegram;
