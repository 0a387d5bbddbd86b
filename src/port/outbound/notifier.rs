//! Notifier port for alerts.
//!
//! This module defines the trait for best-effort notifications about
//! halts, overrides, emergencies and execution outcomes.

use rust_decimal::Decimal;

use crate::domain::{AccountId, IntentId, Symbol};

/// Events that can trigger notifications.
#[derive(Debug, Clone)]
pub enum Event {
    /// An account was halted by the risk gate.
    TradingHalted {
        account_id: AccountId,
        reason: String,
        drawdown_pct: Decimal,
    },
    /// An account was re-enabled by an operator.
    TradingResumed {
        account_id: AccountId,
        operator: String,
        reason: String,
    },
    /// The global kill switch changed.
    KillSwitch {
        halted: bool,
        reason: String,
    },
    /// Systemic-risk override rewrote BUY signals.
    SystemicOverride {
        account_id: AccountId,
        sell_count: usize,
        overridden: usize,
    },
    /// Emergency liquidation ran.
    EmergencyLiquidation {
        account_id: AccountId,
        orders_canceled: usize,
        positions_closed: usize,
    },
    /// A decision failed identity checks.
    SecurityViolation {
        account_id: AccountId,
        detail: String,
    },
    /// An execution attempt completed.
    ExecutionCompleted {
        account_id: AccountId,
        intent_id: Option<IntentId>,
        symbol: Symbol,
        success: bool,
        details: String,
    },
    /// An account cycle aborted.
    CycleFailed {
        account_id: AccountId,
        error: String,
    },
}

/// Trait for notification handlers.
///
/// Notifications are fire-and-forget.
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`)
/// - The `notify` method should not block or perform slow I/O synchronously
/// - Consider spawning async tasks for slow operations
pub trait Notifier: Send + Sync {
    /// Handle an event.
    fn notify(&self, event: Event);
}

/// Registry of notifiers (composite pattern).
///
/// Broadcasts events to all registered notifiers.
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { notifiers: vec![] }
    }

    /// Register a notifier.
    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Notify all registered notifiers.
    pub fn notify_all(&self, event: Event) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
    }

    /// Number of registered notifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    /// Check if registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A no-op notifier for testing or when notifications are disabled.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: Event) {}
}

/// A logging notifier that logs events via tracing.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        use tracing::{error, info, warn};
        match event {
            Event::TradingHalted {
                account_id,
                reason,
                drawdown_pct,
            } => {
                warn!(account = %account_id, reason = %reason, drawdown = %drawdown_pct, "Trading halted");
            }
            Event::TradingResumed {
                account_id,
                operator,
                reason,
            } => {
                info!(account = %account_id, operator = %operator, reason = %reason, "Trading resumed");
            }
            Event::KillSwitch { halted, reason } => {
                warn!(halted, reason = %reason, "Kill switch changed");
            }
            Event::SystemicOverride {
                account_id,
                sell_count,
                overridden,
            } => {
                info!(account = %account_id, sell_count, overridden, "Systemic risk override applied");
            }
            Event::EmergencyLiquidation {
                account_id,
                orders_canceled,
                positions_closed,
            } => {
                warn!(account = %account_id, orders_canceled, positions_closed, "Emergency liquidation");
            }
            Event::SecurityViolation { account_id, detail } => {
                error!(account = %account_id, detail = %detail, "Security violation");
            }
            Event::ExecutionCompleted {
                account_id,
                intent_id,
                symbol,
                success,
                details,
            } => {
                let intent = intent_id.map(|i| i.to_string()).unwrap_or_default();
                info!(account = %account_id, intent = %intent, symbol = %symbol, success, details = %details, "Execution completed");
            }
            Event::CycleFailed { account_id, error } => {
                error!(account = %account_id, error = %error, "Cycle failed");
            }
        }
    }
}
