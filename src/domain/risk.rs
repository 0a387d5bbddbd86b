//! Persisted risk state and the global kill switch.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::AccountId;

/// Fractional decline from the high-water mark, never negative.
///
/// Returns zero when the high-water mark is not positive.
#[must_use]
pub fn drawdown(equity: Decimal, hwm: Decimal) -> Decimal {
    if hwm <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    ((hwm - equity) / hwm).max(Decimal::ZERO)
}

/// Risk state of one account. Single logical writer per account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskState {
    pub account_id: AccountId,
    pub high_water_mark: Decimal,
    pub current_equity: Decimal,
    /// Fraction, e.g. 0.05 = 5%.
    pub drawdown_pct: Decimal,
    pub trading_enabled: bool,
    pub halt_reason: Option<String>,
    pub breached_at: Option<DateTime<Utc>>,
    pub trades_in_period: u32,
    pub period_started_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Optimistic concurrency counter, bumped on every persisted write.
    pub version: u64,
}

impl RiskState {
    /// Fresh state for an account never seen before.
    pub fn new(account_id: AccountId, equity: Decimal) -> Self {
        let now = Utc::now();
        Self {
            account_id,
            high_water_mark: equity.max(Decimal::ZERO),
            current_equity: equity,
            drawdown_pct: Decimal::ZERO,
            trading_enabled: true,
            halt_reason: None,
            breached_at: None,
            trades_in_period: 0,
            period_started_at: now,
            last_updated: now,
            version: 0,
        }
    }

    /// Record a new equity observation. The high-water mark never decreases.
    pub fn update_high_water_mark(&mut self, equity: Decimal) {
        self.high_water_mark = self.high_water_mark.max(equity);
        self.current_equity = equity;
        self.drawdown_pct = drawdown(equity, self.high_water_mark);
        self.last_updated = Utc::now();
    }

    /// Disable trading with the given reason.
    pub fn halt(&mut self, reason: impl Into<String>) {
        let now = Utc::now();
        self.trading_enabled = false;
        self.halt_reason = Some(reason.into());
        self.breached_at = Some(now);
        self.last_updated = now;
    }

    /// Re-enable trading and clear the breach.
    pub fn resume(&mut self) {
        self.trading_enabled = true;
        self.halt_reason = None;
        self.breached_at = None;
        self.last_updated = Utc::now();
    }

    /// Reset the high-water mark to current equity.
    ///
    /// Only an audited manual resume may lower the mark; otherwise the next
    /// evaluation would re-trip the breaker on the same loss.
    pub fn rebaseline(&mut self) {
        self.high_water_mark = self.current_equity.max(Decimal::ZERO);
        self.drawdown_pct = Decimal::ZERO;
        self.last_updated = Utc::now();
    }

    /// Start a new trade-counting period if the current one has elapsed.
    pub fn roll_trade_period(&mut self, period: chrono::Duration, now: DateTime<Utc>) {
        if now - self.period_started_at >= period {
            self.trades_in_period = 0;
            self.period_started_at = now;
        }
    }
}

/// Global kill switch shared by every worker and account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    pub halted: bool,
    pub reason: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            halted: false,
            reason: None,
            updated_at: Utc::now(),
            version: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn drawdown_is_zero_at_or_above_hwm() {
        assert_eq!(drawdown(dec!(110), dec!(100)), Decimal::ZERO);
        assert_eq!(drawdown(dec!(100), dec!(100)), Decimal::ZERO);
        assert_eq!(drawdown(dec!(50), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn drawdown_fraction() {
        assert_eq!(drawdown(dec!(95), dec!(100)), dec!(0.05));
    }

    #[test]
    fn high_water_mark_never_decreases() {
        let mut state = RiskState::new(AccountId::from("a"), dec!(100));
        for equity in [dec!(90), dec!(120), dec!(80), dec!(119), dec!(121)] {
            let before = state.high_water_mark;
            state.update_high_water_mark(equity);
            assert!(state.high_water_mark >= before);
        }
        assert_eq!(state.high_water_mark, dec!(121));
    }

    #[test]
    fn halt_and_resume() {
        let mut state = RiskState::new(AccountId::from("a"), dec!(100));
        state.halt("manual");
        assert!(!state.trading_enabled);
        assert!(state.breached_at.is_some());
        state.resume();
        assert!(state.trading_enabled);
        assert!(state.halt_reason.is_none());
    }
}
