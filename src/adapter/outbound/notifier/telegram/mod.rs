//! Telegram alerts.
//!
//! Events are queued on a channel and delivered by a background task, so a
//! slow or unreachable Bot API never blocks the pipeline.

mod format;
mod notifier;

pub use notifier::{TelegramConfig, TelegramNotifier};
