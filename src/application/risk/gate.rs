//! Risk gate.
//!
//! The only component allowed to deny or halt trading. Every read and write
//! of risk state is bounded by a timeout, and any failure is reported as
//! [`RiskError::StateUnavailable`], which callers treat as a halt.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::RiskLimits;
use crate::domain::{AccountId, AccountSnapshot, Action, ControlState, OrchestratedDecision, RiskState};
use crate::error::{Error, Result, RiskError};
use crate::port::{Broker, Event, NotifierRegistry, PreTradeVerdict, RiskStateStore};

/// Attempts at a kill-switch write before giving up on contention.
const CONTROL_RETRIES: usize = 3;

/// Outcome of [`RiskGate::emergency_liquidate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidationReport {
    pub account_id: AccountId,
    pub orders_canceled: usize,
    pub positions_closed: usize,
}

/// Circuit breaker, kill switch and pre-trade checks.
pub struct RiskGate {
    store: Arc<dyn RiskStateStore>,
    notifier: Arc<NotifierRegistry>,
    limits: RiskLimits,
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl RiskGate {
    pub fn new(
        store: Arc<dyn RiskStateStore>,
        notifier: Arc<NotifierRegistry>,
        limits: RiskLimits,
    ) -> Self {
        Self {
            store,
            notifier,
            limits,
            locks: DashMap::new(),
        }
    }

    #[must_use]
    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Update the high-water mark and drawdown for an account, halting it
    /// when drawdown strictly exceeds the limit.
    ///
    /// A halted account stays halted whatever its equity does afterwards;
    /// only [`RiskGate::resume`] re-enables it.
    ///
    /// # Errors
    /// Returns [`RiskError::StateUnavailable`] or [`RiskError::Conflict`] when
    /// the state cannot be read or persisted. Callers must treat that as a halt.
    pub async fn evaluate(
        &self,
        account_id: &AccountId,
        equity: Decimal,
    ) -> std::result::Result<RiskState, RiskError> {
        let lock = self.lock_for(account_id);
        let _guard = lock.lock().await;

        let stored = self
            .bounded("load risk state", self.store.load(account_id))
            .await?;
        let mut state = stored.unwrap_or_else(|| RiskState::new(account_id.clone(), equity));
        let expected = state.version;

        state.update_high_water_mark(equity);
        state.roll_trade_period(self.limits.trade_period, Utc::now());

        let breached = state.trading_enabled && state.drawdown_pct > self.limits.max_drawdown_pct;
        if breached {
            state.halt(format!(
                "drawdown {}% exceeds {}% threshold",
                (state.drawdown_pct * Decimal::ONE_HUNDRED).round_dp(2),
                (self.limits.max_drawdown_pct * Decimal::ONE_HUNDRED).normalize()
            ));
        }

        self.persist(expected, &mut state).await?;

        if breached {
            warn!(
                account = %account_id,
                equity = %equity,
                high_water_mark = %state.high_water_mark,
                drawdown = %state.drawdown_pct,
                "Drawdown limit breached, trading halted"
            );
            self.notifier.notify_all(Event::TradingHalted {
                account_id: account_id.clone(),
                reason: state.halt_reason.clone().unwrap_or_default(),
                drawdown_pct: state.drawdown_pct,
            });
        }
        Ok(state)
    }

    /// Re-enable a halted account. Audited manual override.
    ///
    /// The high-water mark is reset to current equity so the same loss does
    /// not re-trip the breaker on the next evaluation.
    ///
    /// # Errors
    /// Fails if the account has no persisted state or the write fails.
    pub async fn resume(
        &self,
        account_id: &AccountId,
        operator: &str,
        reason: &str,
    ) -> std::result::Result<RiskState, RiskError> {
        let lock = self.lock_for(account_id);
        let _guard = lock.lock().await;

        let mut state = self
            .bounded("load risk state", self.store.load(account_id))
            .await?
            .ok_or_else(|| RiskError::StateUnavailable {
                reason: format!("no risk state for account {account_id}"),
            })?;
        let expected = state.version;
        let previous_reason = state.halt_reason.clone();
        let previous_hwm = state.high_water_mark;

        state.resume();
        state.rebaseline();
        self.persist(expected, &mut state).await?;

        info!(
            target: "audit",
            account = %account_id,
            operator = %operator,
            reason = %reason,
            previous_halt = previous_reason.as_deref().unwrap_or("none"),
            previous_high_water_mark = %previous_hwm,
            high_water_mark = %state.high_water_mark,
            "Trading manually resumed"
        );
        self.notifier.notify_all(Event::TradingResumed {
            account_id: account_id.clone(),
            operator: operator.to_string(),
            reason: reason.to_string(),
        });
        Ok(state)
    }

    /// Force an account into the halted state.
    ///
    /// # Errors
    /// Fails if the state cannot be persisted.
    pub async fn halt(
        &self,
        account_id: &AccountId,
        reason: &str,
    ) -> std::result::Result<RiskState, RiskError> {
        let lock = self.lock_for(account_id);
        let _guard = lock.lock().await;

        let mut state = self
            .bounded("load risk state", self.store.load(account_id))
            .await?
            .unwrap_or_else(|| RiskState::new(account_id.clone(), Decimal::ZERO));
        let expected = state.version;
        let newly_halted = state.trading_enabled;
        if newly_halted {
            state.halt(reason);
        }
        self.persist(expected, &mut state).await?;

        if newly_halted {
            warn!(target: "audit", account = %account_id, reason = %reason, "Account halted");
            self.notifier.notify_all(Event::TradingHalted {
                account_id: account_id.clone(),
                reason: reason.to_string(),
                drawdown_pct: state.drawdown_pct,
            });
        }
        Ok(state)
    }

    /// Engage the global kill switch.
    ///
    /// # Errors
    /// Fails if the control state cannot be persisted.
    pub async fn halt_all(&self, reason: &str) -> std::result::Result<ControlState, RiskError> {
        let control = self
            .update_control(|control| {
                control.halted = true;
                control.reason = Some(reason.to_string());
            })
            .await?;
        warn!(target: "audit", reason = %reason, "Global kill switch engaged");
        self.notifier.notify_all(Event::KillSwitch {
            halted: true,
            reason: reason.to_string(),
        });
        Ok(control)
    }

    /// Release the global kill switch. Audited manual override.
    ///
    /// # Errors
    /// Fails if the control state cannot be persisted.
    pub async fn resume_all(
        &self,
        operator: &str,
        reason: &str,
    ) -> std::result::Result<ControlState, RiskError> {
        let control = self
            .update_control(|control| {
                control.halted = false;
                control.reason = None;
            })
            .await?;
        info!(target: "audit", operator = %operator, reason = %reason, "Global kill switch released");
        self.notifier.notify_all(Event::KillSwitch {
            halted: false,
            reason: format!("released by {operator}: {reason}"),
        });
        Ok(control)
    }

    /// Fresh read of the kill switch and the account state.
    ///
    /// Never cached: a halt written by any worker is visible to the next call.
    ///
    /// # Errors
    /// [`RiskError::Halted`] when either switch is off, and
    /// [`RiskError::StateUnavailable`] when state cannot be read or the
    /// account has never been evaluated.
    pub async fn ensure_trading_enabled(
        &self,
        account_id: &AccountId,
    ) -> std::result::Result<RiskState, RiskError> {
        let control = self
            .bounded("load control state", self.store.load_control())
            .await?;
        if control.halted {
            return Err(RiskError::Halted {
                reason: format!(
                    "global kill switch: {}",
                    control.reason.as_deref().unwrap_or("no reason given")
                ),
            });
        }

        let state = self
            .bounded("load risk state", self.store.load(account_id))
            .await?
            .ok_or_else(|| RiskError::StateUnavailable {
                reason: format!("account {account_id} has not been evaluated"),
            })?;
        if !state.trading_enabled {
            return Err(RiskError::Halted {
                reason: state
                    .halt_reason
                    .clone()
                    .unwrap_or_else(|| "account halted".to_string()),
            });
        }
        Ok(state)
    }

    /// Check one decision against the halt switches and pre-trade limits.
    ///
    /// `mark_price` converts the allocation into a quantity.
    pub async fn evaluate_pre_trade(
        &self,
        decision: &OrchestratedDecision,
        account: &AccountSnapshot,
        mark_price: Decimal,
    ) -> PreTradeVerdict {
        let mut state = match self.ensure_trading_enabled(&account.account_id).await {
            Ok(state) => state,
            Err(e) => {
                warn!(account = %account.account_id, error = %e, "Pre-trade denied");
                return PreTradeVerdict::Deny(e);
            }
        };

        let action = decision.signal.action;
        if !action.is_actionable() {
            return PreTradeVerdict::Allow;
        }

        state.roll_trade_period(self.limits.trade_period, Utc::now());
        if state.trades_in_period >= self.limits.max_trades_per_period {
            return PreTradeVerdict::Deny(RiskError::TradeLimitExceeded {
                count: state.trades_in_period,
                limit: self.limits.max_trades_per_period,
            });
        }

        // Flattening only ever reduces exposure.
        if action == Action::CloseAll {
            return PreTradeVerdict::Allow;
        }

        if mark_price <= Decimal::ZERO {
            return PreTradeVerdict::Deny(RiskError::StateUnavailable {
                reason: format!("no mark price for {}", decision.signal.symbol),
            });
        }

        let symbol = &decision.signal.symbol;
        let current = account.position_quantity(symbol);
        let delta = account.buying_power * decision.allocation() / mark_price;
        let projected = match action {
            Action::Buy => current + delta,
            _ => current - delta,
        };
        if projected.abs() > self.limits.max_position_quantity {
            return PreTradeVerdict::Deny(RiskError::PositionLimitExceeded {
                symbol: symbol.to_string(),
                projected: projected.round_dp(8),
                limit: self.limits.max_position_quantity,
            });
        }

        if action == Action::Buy && account.equity > Decimal::ZERO {
            let concentration = projected.abs() * mark_price / account.equity;
            if concentration > self.limits.max_concentration_pct {
                let reason = format!(
                    "{symbol} would be {}% of equity, above the {}% concentration limit",
                    (concentration * Decimal::ONE_HUNDRED).round_dp(2),
                    (self.limits.max_concentration_pct * Decimal::ONE_HUNDRED).normalize()
                );
                info!(account = %account.account_id, reason = %reason, "BUY downgraded to HOLD");
                return PreTradeVerdict::Downgrade { reason };
            }
        }

        PreTradeVerdict::Allow
    }

    /// Count a placed trade against the per-period limit.
    ///
    /// # Errors
    /// Fails if the state cannot be read or persisted.
    pub async fn record_trade(&self, account_id: &AccountId) -> std::result::Result<(), RiskError> {
        let lock = self.lock_for(account_id);
        let _guard = lock.lock().await;

        let mut state = self
            .bounded("load risk state", self.store.load(account_id))
            .await?
            .ok_or_else(|| RiskError::StateUnavailable {
                reason: format!("account {account_id} has not been evaluated"),
            })?;
        let expected = state.version;
        state.roll_trade_period(self.limits.trade_period, Utc::now());
        state.trades_in_period = state.trades_in_period.saturating_add(1);
        state.last_updated = Utc::now();
        self.persist(expected, &mut state).await
    }

    /// Cancel every open order, close every position, then halt the account.
    ///
    /// Idempotent: a second call finds nothing to cancel or close and leaves
    /// the account halted. The halt is written even when the broker fails.
    ///
    /// # Errors
    /// Returns the broker or state error after the halt attempt.
    pub async fn emergency_liquidate(
        &self,
        account_id: &AccountId,
        broker: &dyn Broker,
    ) -> Result<LiquidationReport> {
        warn!(target: "audit", account = %account_id, broker = broker.name(), "Emergency liquidation started");

        let canceled = broker.cancel_all_orders().await;
        let closed = match &canceled {
            Ok(_) => Some(broker.close_all_positions().await),
            Err(_) => None,
        };

        self.halt(account_id, "emergency liquidation").await?;

        let orders_canceled = canceled.map_err(Error::from)?;
        let positions_closed = match closed {
            Some(result) => result.map_err(Error::from)?,
            None => 0,
        };

        warn!(
            target: "audit",
            account = %account_id,
            orders_canceled,
            positions_closed,
            "Emergency liquidation finished"
        );
        self.notifier.notify_all(Event::EmergencyLiquidation {
            account_id: account_id.clone(),
            orders_canceled,
            positions_closed,
        });
        Ok(LiquidationReport {
            account_id: account_id.clone(),
            orders_canceled,
            positions_closed,
        })
    }

    fn lock_for(&self, account_id: &AccountId) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .entry(account_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    async fn persist(
        &self,
        expected: u64,
        state: &mut RiskState,
    ) -> std::result::Result<(), RiskError> {
        let swapped = self
            .bounded(
                "persist risk state",
                self.store.compare_and_swap(expected, state),
            )
            .await?;
        if !swapped {
            error!(account = %state.account_id, expected, "Risk state version conflict");
            return Err(RiskError::Conflict {
                account_id: state.account_id.to_string(),
            });
        }
        state.version = expected + 1;
        Ok(())
    }

    async fn update_control<F>(&self, apply: F) -> std::result::Result<ControlState, RiskError>
    where
        F: Fn(&mut ControlState),
    {
        for _ in 0..CONTROL_RETRIES {
            let mut control = self
                .bounded("load control state", self.store.load_control())
                .await?;
            let expected = control.version;
            apply(&mut control);
            control.updated_at = Utc::now();
            let swapped = self
                .bounded(
                    "persist control state",
                    self.store.swap_control(expected, &control),
                )
                .await?;
            if swapped {
                control.version = expected + 1;
                return Ok(control);
            }
        }
        Err(RiskError::Conflict {
            account_id: "*".to_string(),
        })
    }

    async fn bounded<T, F>(&self, what: &str, operation: F) -> std::result::Result<T, RiskError>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.limits.state_timeout, operation).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!(operation = what, error = %e, "Risk state unavailable, failing closed");
                Err(RiskError::StateUnavailable {
                    reason: format!("{what}: {e}"),
                })
            }
            Err(_) => {
                error!(operation = what, "Risk state timed out, failing closed");
                Err(RiskError::StateUnavailable {
                    reason: format!(
                        "{what}: timed out after {} ms",
                        self.limits.state_timeout.as_millis()
                    ),
                })
            }
        }
    }
}
