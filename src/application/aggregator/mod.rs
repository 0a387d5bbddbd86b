//! Signal aggregation.
//!
//! Turns one cycle of module signals into weighted, signed decisions:
//!
//! 1. capital weights from trailing Sharpe ratios ([`weights`])
//! 2. systemic-risk detection and the BUY override ([`systemic`])
//! 3. one master decision per symbol ([`consensus`])
//! 4. identity attached to every decision ([`signing`])
//!
//! The reduction is single-threaded per cycle.

pub mod consensus;
pub mod signing;
pub mod systemic;
pub mod weights;

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info};

pub use signing::{DecisionSigner, ReplayGuard};
pub use systemic::SystemicRisk;
pub use weights::WeightCalculator;

use crate::domain::{
    AccountId, AgentWeight, ModuleId, OrchestratedDecision, SessionId, StrategySignal,
};
use crate::error::Result;
use crate::port::{Event, IdentityService, NotifierRegistry, PerformanceStore};

/// Tunables of the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorSettings {
    /// Performance records considered per module.
    pub lookback: usize,
    /// Capital against which period PnL is turned into a return.
    pub reference_capital: Decimal,
    pub daily_risk_free_rate: f64,
    pub periods_per_year: f64,
    /// Minimum Sharpe for ACTIVE.
    pub active_sharpe: f64,
    /// Minimum Sharpe for REDUCED.
    pub reduced_sharpe: f64,
    /// Distinct SELL votes that trigger the systemic override.
    pub systemic_sell_threshold: usize,
    /// Identity that signs master decisions.
    pub signer_id: String,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            lookback: 30,
            reference_capital: Decimal::from(100_000),
            daily_risk_free_rate: 0.0,
            periods_per_year: 252.0,
            active_sharpe: 1.0,
            reduced_sharpe: 0.5,
            systemic_sell_threshold: 3,
            signer_id: "orchestrator".to_string(),
        }
    }
}

/// Everything one aggregation cycle produced.
#[derive(Debug, Clone)]
pub struct AggregationOutcome {
    pub session_id: SessionId,
    pub weights: BTreeMap<ModuleId, AgentWeight>,
    pub systemic_risk: SystemicRisk,
    /// Per-module decisions after the override, signed by each module id.
    pub module_decisions: Vec<OrchestratedDecision>,
    /// Signed master decisions, one per symbol.
    pub decisions: Vec<OrchestratedDecision>,
    /// Decisions of SHADOW modules. Logged, never executed.
    pub shadow_signals: Vec<OrchestratedDecision>,
}

impl AggregationOutcome {
    /// Master decisions that ask for an order.
    pub fn actionable(&self) -> impl Iterator<Item = &OrchestratedDecision> {
        self.decisions
            .iter()
            .filter(|d| d.signal.action.is_actionable())
    }
}

/// Weights, overrides, arbitrates and signs module signals.
pub struct SignalAggregator {
    weights: WeightCalculator,
    signer: Arc<DecisionSigner>,
    notifier: Arc<NotifierRegistry>,
    settings: AggregatorSettings,
}

impl SignalAggregator {
    pub fn new(
        performance: Arc<dyn PerformanceStore>,
        identity: Arc<dyn IdentityService>,
        notifier: Arc<NotifierRegistry>,
        settings: AggregatorSettings,
    ) -> Self {
        Self {
            weights: WeightCalculator::new(performance, settings.clone()),
            signer: Arc::new(DecisionSigner::new(identity)),
            notifier,
            settings,
        }
    }

    /// Shared signer, also used by the router to verify decisions.
    #[must_use]
    pub fn signer(&self) -> Arc<DecisionSigner> {
        Arc::clone(&self.signer)
    }

    #[must_use]
    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// Capital weights for the given modules.
    ///
    /// # Errors
    /// Returns `DataUnavailable` if performance history cannot be read.
    pub async fn calculate_weights(
        &self,
        module_ids: &[ModuleId],
    ) -> Result<BTreeMap<ModuleId, AgentWeight>> {
        self.weights.calculate_weights(module_ids).await
    }

    /// Run one aggregation cycle for an account.
    ///
    /// # Errors
    /// Fails if performance data is unavailable or signing fails; no partial
    /// decisions are returned.
    pub async fn aggregate(
        &self,
        account_id: &AccountId,
        signals: &BTreeMap<ModuleId, StrategySignal>,
    ) -> Result<AggregationOutcome> {
        let session_id = SessionId::new(uuid::Uuid::new_v4().to_string());
        let module_ids: Vec<ModuleId> = signals.keys().cloned().collect();
        let weights = self.calculate_weights(&module_ids).await?;

        let systemic_risk =
            systemic::detect_systemic_risk(signals, self.settings.systemic_sell_threshold);

        let mut module_decisions: Vec<OrchestratedDecision> = signals
            .values()
            .map(|signal| {
                let weight = weights
                    .get(&signal.module_id)
                    .map_or(0.0, |w| w.capital_weight);
                OrchestratedDecision::unsigned(signal.clone(), weight)
            })
            .collect();

        let overridden = systemic::apply_override(&mut module_decisions, &systemic_risk);
        if systemic_risk.detected {
            info!(
                account = %account_id,
                sell_count = systemic_risk.sell_count(),
                overridden,
                "SystemicRiskOverride applied"
            );
            self.notifier.notify_all(Event::SystemicOverride {
                account_id: account_id.clone(),
                sell_count: systemic_risk.sell_count(),
                overridden,
            });
        }

        let orchestrator = ModuleId::new(self.settings.signer_id.clone());
        let mut decisions =
            consensus::master_decisions(&module_decisions, &weights, &orchestrator);

        for decision in &mut module_decisions {
            let signer_id = decision.signal.module_id.to_string();
            self.signer.sign(decision, &signer_id, &session_id).await?;
        }
        for decision in &mut decisions {
            self.signer
                .sign(decision, &self.settings.signer_id, &session_id)
                .await?;
        }

        let shadow_signals: Vec<OrchestratedDecision> = module_decisions
            .iter()
            .filter(|d| {
                weights
                    .get(&d.signal.module_id)
                    .is_some_and(|w| !w.is_eligible())
            })
            .cloned()
            .collect();
        for shadow in &shadow_signals {
            info!(
                account = %account_id,
                module = %shadow.signal.module_id,
                action = %shadow.signal.action,
                symbol = %shadow.signal.symbol,
                confidence = shadow.signal.confidence,
                "Shadow signal (not executed)"
            );
        }

        for decision in &decisions {
            debug!(
                account = %account_id,
                session = %session_id,
                action = %decision.signal.action,
                symbol = %decision.signal.symbol,
                allocation = %decision.allocation(),
                overridden = decision.overridden,
                "Master decision"
            );
        }

        Ok(AggregationOutcome {
            session_id,
            weights,
            systemic_risk,
            module_decisions,
            decisions,
            shadow_signals,
        })
    }
}
