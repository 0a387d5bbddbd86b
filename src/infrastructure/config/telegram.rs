//! Telegram notification configuration.

use serde::Deserialize;

/// Telegram alerts (`[telegram]`). Credentials come from the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramAppConfig {
    /// Enable telegram notifications.
    #[serde(default)]
    pub enabled: bool,
    /// Send a message for every execution attempt (can be noisy).
    #[serde(default)]
    pub notify_executions: bool,
}
