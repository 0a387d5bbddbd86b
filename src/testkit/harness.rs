//! A single account wired over in-memory stores and the paper broker.

use std::sync::Arc;

use rust_decimal::Decimal;

use super::notifier::RecordingNotifier;
use super::store::FaultyRiskStore;
use crate::adapter::outbound::identity::LocalKeyIdentity;
use crate::adapter::outbound::memory::{MemoryLedger, MemoryPerformanceStore};
use crate::adapter::outbound::paper::{FillMode, PaperBroker, ScriptedMarketData};
use crate::application::aggregator::{AggregatorSettings, ReplayGuard, SignalAggregator};
use crate::application::execution::{ExecutionRouter, ExecutionSettings, RouterDeps};
use crate::application::pipeline::AccountPipeline;
use crate::application::risk::{RiskGate, RiskLimits};
use crate::application::strategy::{DecisionModule, StrategyRegistry};
use crate::domain::{
    AccountId, AccountSnapshot, Action, AssetClass, OrchestratedDecision, PerformanceRecord,
    Quote, RiskState, SessionId, StrategySignal, Symbol,
};
use crate::port::{Broker, NotifierRegistry, PerformanceStore};

/// Default symbol quoted by a fresh harness.
pub const SYMBOL: &str = "AAPL";

/// Tunables for a [`Harness`].
#[derive(Debug, Clone)]
pub struct HarnessSettings {
    pub starting_cash: Decimal,
    pub fill_mode: FillMode,
    pub limits: RiskLimits,
    pub execution: ExecutionSettings,
    pub aggregator: AggregatorSettings,
    pub replay_retention: chrono::Duration,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            starting_cash: Decimal::from(100_000),
            fill_mode: FillMode::Immediate,
            limits: RiskLimits::default(),
            execution: ExecutionSettings::default(),
            aggregator: AggregatorSettings::default(),
            replay_retention: chrono::Duration::hours(24),
        }
    }
}

/// Everything one account needs, with direct handles on each collaborator.
pub struct Harness {
    pub account_id: AccountId,
    pub broker: Arc<PaperBroker>,
    pub market: Arc<ScriptedMarketData>,
    pub ledger: Arc<MemoryLedger>,
    /// Healthy until a test injects a fault.
    pub risk_store: Arc<FaultyRiskStore>,
    pub performance: Arc<MemoryPerformanceStore>,
    pub identity: Arc<LocalKeyIdentity>,
    pub events: RecordingNotifier,
    pub notifier: Arc<NotifierRegistry>,
    pub gate: Arc<RiskGate>,
    pub aggregator: Arc<SignalAggregator>,
    pub replay: Arc<ReplayGuard>,
    pub settings: HarnessSettings,
}

impl Harness {
    pub fn new(account: &str) -> Self {
        Self::with_settings(account, HarnessSettings::default())
    }

    pub fn with_settings(account: &str, settings: HarnessSettings) -> Self {
        let account_id = AccountId::from(account);
        let events = RecordingNotifier::new();
        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(events.clone()));
        let notifier = Arc::new(registry);

        let market = Arc::new(ScriptedMarketData::new());
        market.set_quote(SYMBOL, Quote::new(Decimal::new(9999, 2), Decimal::new(10001, 2)));

        let risk_store = Arc::new(FaultyRiskStore::new());
        let performance = Arc::new(MemoryPerformanceStore::new());
        let identity = Arc::new(LocalKeyIdentity::new());

        let gate = Arc::new(RiskGate::new(
            risk_store.clone(),
            Arc::clone(&notifier),
            settings.limits.clone(),
        ));
        let aggregator = Arc::new(SignalAggregator::new(
            performance.clone(),
            identity.clone(),
            Arc::clone(&notifier),
            settings.aggregator.clone(),
        ));

        Self {
            broker: Arc::new(PaperBroker::with_fill_mode(
                account_id.clone(),
                settings.starting_cash,
                settings.fill_mode,
            )),
            ledger: Arc::new(MemoryLedger::new()),
            replay: Arc::new(ReplayGuard::new(settings.replay_retention)),
            account_id,
            market,
            risk_store,
            performance,
            identity,
            events,
            notifier,
            gate,
            aggregator,
            settings,
        }
    }

    /// Router collaborators; the replay guard is shared by every router.
    pub fn deps(&self) -> RouterDeps {
        RouterDeps {
            market: self.market.clone(),
            ledger: self.ledger.clone(),
            gate: Arc::clone(&self.gate),
            signer: self.aggregator.signer(),
            master_signer: self.settings.aggregator.signer_id.clone(),
            replay: Arc::clone(&self.replay),
            notifier: Arc::clone(&self.notifier),
        }
    }

    pub fn router(&self) -> ExecutionRouter {
        self.router_with(self.broker.clone())
    }

    /// Router over a different broker, e.g. one that fails.
    pub fn router_with(&self, broker: Arc<dyn Broker>) -> ExecutionRouter {
        ExecutionRouter::new(
            self.account_id.clone(),
            broker,
            self.deps(),
            self.settings.execution.clone(),
        )
    }

    /// Pipeline running `modules` over the symbols they trade.
    pub fn pipeline(&self, modules: Vec<Arc<dyn DecisionModule>>) -> AccountPipeline {
        let mut registry = StrategyRegistry::new(4, std::time::Duration::from_secs(1));
        let mut universe: Vec<(Symbol, AssetClass)> = Vec::new();
        for module in modules {
            let symbol = module.symbol().clone();
            if !universe.iter().any(|(s, _)| *s == symbol) {
                universe.push((symbol, AssetClass::Equity));
            }
            registry.register(module);
        }
        AccountPipeline::new(
            universe,
            Arc::new(registry),
            Arc::clone(&self.aggregator),
            Arc::clone(&self.gate),
            self.market.clone(),
            self.router(),
        )
    }

    /// Append performance history.
    pub async fn seed_history(&self, records: &[PerformanceRecord]) {
        for record in records {
            self.performance
                .append(record)
                .await
                .expect("append performance record");
        }
    }

    /// Evaluate the account once so the gate has persisted state.
    pub async fn prime(&self) -> RiskState {
        let equity = self.account().await.equity;
        self.gate
            .evaluate(&self.account_id, equity)
            .await
            .expect("evaluate risk state")
    }

    pub async fn account(&self) -> AccountSnapshot {
        self.broker.account().await.expect("paper account")
    }

    /// Master decision signed the way the aggregator signs one.
    pub async fn signed_decision(
        &self,
        symbol: &str,
        action: Action,
        allocation: Decimal,
    ) -> OrchestratedDecision {
        let signal = StrategySignal::new(
            self.settings.aggregator.signer_id.as_str().into(),
            action,
            Symbol::from(symbol),
            0.9,
            allocation,
            "harness decision",
            AssetClass::Equity,
        );
        let mut decision = OrchestratedDecision::unsigned(signal, 1.0);
        let session = SessionId::new(uuid::Uuid::new_v4().to_string());
        self.aggregator
            .signer()
            .sign(&mut decision, &self.settings.aggregator.signer_id, &session)
            .await
            .expect("sign decision");
        decision
    }
}
