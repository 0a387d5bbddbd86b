//! One account's trading cycle.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::application::aggregator::SignalAggregator;
use crate::application::execution::{ExecutionRouter, ReconcileReport};
use crate::application::risk::RiskGate;
use crate::application::strategy::StrategyRegistry;
use crate::domain::{AccountId, AssetClass, ExecutionResult, MarketSnapshot, Symbol};
use crate::error::{Result, RiskError};
use crate::port::{MarketDataProvider, PreTradeVerdict};

/// Decision that did not reach the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDecision {
    pub symbol: Symbol,
    pub reason: String,
}

/// Summary of one cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub account_id: AccountId,
    /// Set when the cycle stopped because trading is halted.
    pub halted: Option<String>,
    pub signals: usize,
    pub decisions: usize,
    pub systemic_override: bool,
    pub executions: Vec<ExecutionResult>,
    pub skipped: Vec<SkippedDecision>,
}

impl CycleReport {
    fn new(account_id: AccountId) -> Self {
        Self {
            account_id,
            halted: None,
            signals: 0,
            decisions: 0,
            systemic_override: false,
            executions: Vec::new(),
            skipped: Vec::new(),
        }
    }

    fn halted(account_id: AccountId, reason: impl Into<String>) -> Self {
        Self {
            halted: Some(reason.into()),
            ..Self::new(account_id)
        }
    }

    #[must_use]
    pub fn placed(&self) -> usize {
        self.executions.iter().filter(|r| r.is_placed()).count()
    }
}

/// Wires registry, aggregator, gate and router for a single account.
pub struct AccountPipeline {
    account_id: AccountId,
    universe: Vec<(Symbol, AssetClass)>,
    registry: Arc<StrategyRegistry>,
    aggregator: Arc<SignalAggregator>,
    gate: Arc<RiskGate>,
    market: Arc<dyn MarketDataProvider>,
    router: ExecutionRouter,
}

impl AccountPipeline {
    pub fn new(
        universe: Vec<(Symbol, AssetClass)>,
        registry: Arc<StrategyRegistry>,
        aggregator: Arc<SignalAggregator>,
        gate: Arc<RiskGate>,
        market: Arc<dyn MarketDataProvider>,
        router: ExecutionRouter,
    ) -> Self {
        Self {
            account_id: router.account_id().clone(),
            universe,
            registry,
            aggregator,
            gate,
            market,
            router,
        }
    }

    #[must_use]
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    #[must_use]
    pub fn router(&self) -> &ExecutionRouter {
        &self.router
    }

    /// Run one full cycle: gate, market, registry, aggregator, execution.
    ///
    /// A halt is a normal outcome reported in [`CycleReport::halted`].
    ///
    /// # Errors
    /// Fails when the broker account or market data cannot be read, or when
    /// aggregation fails. The previous risk state stays in force.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let id = &self.account_id;

        let account = self.router.broker().account().await?;
        match self.gate.evaluate(id, account.equity).await {
            Ok(state) if !state.trading_enabled => {
                let reason = state.halt_reason.unwrap_or_else(|| "account halted".into());
                info!(account = %id, reason = %reason, "Cycle skipped, account halted");
                return Ok(CycleReport::halted(id.clone(), reason));
            }
            Ok(_) => {}
            Err(e) => {
                warn!(account = %id, error = %e, "Risk state unavailable, treating as halted");
                return Ok(CycleReport::halted(id.clone(), e.to_string()));
            }
        }
        if let Some(report) = self.halted_report().await {
            return Ok(report);
        }

        let regime = self.market.get_regime_snapshot().await?;
        let mut market = MarketSnapshot {
            taken_at: Some(Utc::now()),
            ..MarketSnapshot::default()
        };
        for (symbol, asset_class) in &self.universe {
            let quote = self.market.get_quote(symbol, *asset_class).await?;
            market.quotes.insert(symbol.clone(), quote);
            market.asset_classes.insert(symbol.clone(), *asset_class);
        }

        let signals = self
            .registry
            .evaluate_all(market.clone(), account.clone(), regime)
            .await;
        if let Some(report) = self.halted_report().await {
            return Ok(report);
        }

        let outcome = self.aggregator.aggregate(id, &signals).await?;
        let mut report = CycleReport {
            signals: signals.len(),
            decisions: outcome.decisions.len(),
            systemic_override: outcome.systemic_risk.detected,
            ..CycleReport::new(id.clone())
        };

        for decision in outcome.actionable() {
            let symbol = decision.signal.symbol.clone();
            let mark = market.quote(&symbol).map(|q| q.mid).unwrap_or_default();

            match self.gate.evaluate_pre_trade(decision, &account, mark).await {
                PreTradeVerdict::Allow => {}
                PreTradeVerdict::Deny(e) => {
                    let halted = matches!(e, RiskError::Halted { .. } | RiskError::StateUnavailable { .. });
                    report.skipped.push(SkippedDecision {
                        symbol,
                        reason: e.to_string(),
                    });
                    if halted {
                        report.halted = Some(e.to_string());
                        break;
                    }
                    continue;
                }
                PreTradeVerdict::Downgrade { reason } => {
                    report.skipped.push(SkippedDecision { symbol, reason });
                    continue;
                }
            }

            let result = self.router.execute(decision, &account).await;
            debug!(account = %id, symbol = %symbol, status = %result.status, "Decision executed");
            if result.is_placed() {
                if let Err(e) = self.gate.record_trade(id).await {
                    warn!(account = %id, error = %e, "Failed to record trade");
                }
            }
            report.executions.push(result);
        }

        info!(
            account = %id,
            signals = report.signals,
            decisions = report.decisions,
            placed = report.placed(),
            skipped = report.skipped.len(),
            systemic_override = report.systemic_override,
            "Cycle complete"
        );
        Ok(report)
    }

    /// Resolve stale PENDING intents of this account.
    ///
    /// # Errors
    /// Returns an error if the ledger cannot be read.
    pub async fn reconcile(&self) -> Result<ReconcileReport> {
        self.router.reconcile_pending().await
    }

    async fn halted_report(&self) -> Option<CycleReport> {
        match self.gate.ensure_trading_enabled(&self.account_id).await {
            Ok(_) => None,
            Err(e) => {
                info!(account = %self.account_id, reason = %e, "Cycle stopped, trading disabled");
                Some(CycleReport::halted(self.account_id.clone(), e.to_string()))
            }
        }
    }
}
