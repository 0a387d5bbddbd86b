//! Message formatting for Telegram notifications.

use rust_decimal::Decimal;

use crate::port::Event;

use super::notifier::TelegramConfig;

/// Format an event into a `MarkdownV2` message, or `None` to skip it.
pub fn format_event_message(event: &Event, config: &TelegramConfig) -> Option<String> {
    match event {
        Event::TradingHalted {
            account_id,
            reason,
            drawdown_pct,
        } => Some(format!(
            "🛑 *Trading Halted*\n\
            \n\
            👤 Account: {}\n\
            📉 Drawdown: {}%\n\
            ⚠️ Reason: {}",
            escape_markdown(account_id.as_str()),
            escape_markdown(&percent(*drawdown_pct)),
            escape_markdown(reason)
        )),
        Event::TradingResumed {
            account_id,
            operator,
            reason,
        } => Some(format!(
            "✅ *Trading Resumed*\n\
            \n\
            👤 Account: {}\n\
            🧑 Operator: {}\n\
            📝 {}",
            escape_markdown(account_id.as_str()),
            escape_markdown(operator),
            escape_markdown(reason)
        )),
        Event::KillSwitch { halted, reason } => {
            let title = if *halted {
                "🚨 *Kill Switch Engaged*"
            } else {
                "▶️ *Kill Switch Released*"
            };
            Some(format!("{title}\n\n📝 {}", escape_markdown(reason)))
        }
        Event::SystemicOverride {
            account_id,
            sell_count,
            overridden,
        } => Some(format!(
            "⚠️ *Systemic Risk Override*\n\
            \n\
            👤 Account: {}\n\
            🔻 SELL signals: {}\n\
            ⏸️ BUYs held: {}",
            escape_markdown(account_id.as_str()),
            sell_count,
            overridden
        )),
        Event::EmergencyLiquidation {
            account_id,
            orders_canceled,
            positions_closed,
        } => Some(format!(
            "🚨 *Emergency Liquidation*\n\
            \n\
            👤 Account: {}\n\
            ❌ Orders canceled: {}\n\
            📦 Positions closed: {}",
            escape_markdown(account_id.as_str()),
            orders_canceled,
            positions_closed
        )),
        Event::SecurityViolation { account_id, detail } => Some(format!(
            "🔐 *Security Violation*\n\
            \n\
            👤 Account: {}\n\
            📝 {}",
            escape_markdown(account_id.as_str()),
            escape_markdown(detail)
        )),
        Event::ExecutionCompleted {
            account_id,
            symbol,
            success,
            details,
            ..
        } if config.notify_executions => {
            let (emoji, title) = if *success {
                ("✅", "Order Placed")
            } else {
                ("❌", "Execution Not Placed")
            };
            Some(format!(
                "{emoji} *{title}*\n\
                \n\
                👤 Account: {}\n\
                📋 Symbol: {}\n\
                📝 {}",
                escape_markdown(account_id.as_str()),
                escape_markdown(symbol.as_str()),
                escape_markdown(&truncate(details, 200))
            ))
        }
        Event::ExecutionCompleted { .. } => None,
        Event::CycleFailed { account_id, error } => Some(format!(
            "💥 *Cycle Failed*\n\
            \n\
            👤 Account: {}\n\
            📝 {}",
            escape_markdown(account_id.as_str()),
            escape_markdown(&truncate(error, 200))
        )),
    }
}

fn percent(fraction: Decimal) -> String {
    (fraction * Decimal::ONE_HUNDRED).round_dp(2).to_string()
}

/// Truncate to `max_chars` characters, appending an ellipsis.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Escape special characters for Telegram `MarkdownV2`.
pub fn escape_markdown(text: &str) -> String {
    const SPECIAL: [char; 19] = [
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
        '\\',
    ];
    let mut result = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        if SPECIAL.contains(&c) {
            result.push('\\');
        }
        result.push(c);
    }
    result
}
