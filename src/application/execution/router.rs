//! Execution router.
//!
//! Verifies, prices, builds and submits orders for one account. The ledger
//! entry is always written before the broker is called, and the broker is
//! called at most once per intent.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use super::builder::build_order;
use super::cost::{analyze_quote, CostAnalysis};
use super::ExecutionSettings;
use crate::application::aggregator::{DecisionSigner, ReplayGuard};
use crate::application::risk::RiskGate;
use crate::domain::{
    AccountId, AccountSnapshot, Action, BrokerOrder, BrokerOrderStatus, ExecutionResult,
    ExecutionStatus, IntentId, IntentState, LedgerEntry, LedgerStatus, LedgerUpdate,
    OrchestratedDecision, OrderIntent, OrderRequest, OrderSide, RoutingDecision,
};
use crate::error::{BrokerError, DataUnavailable, SecurityViolation, ValidationError};
use crate::port::{Broker, Event, LedgerStore, MarketDataProvider, NotifierRegistry};

/// Routes decisions of one account to its broker.
pub struct ExecutionRouter {
    account_id: AccountId,
    broker: Arc<dyn Broker>,
    market: Arc<dyn MarketDataProvider>,
    ledger: Arc<dyn LedgerStore>,
    gate: Arc<RiskGate>,
    signer: Arc<DecisionSigner>,
    master_signer: String,
    replay: Arc<ReplayGuard>,
    notifier: Arc<NotifierRegistry>,
    settings: ExecutionSettings,
}

/// Collaborators shared by every account's router.
#[derive(Clone)]
pub struct RouterDeps {
    pub market: Arc<dyn MarketDataProvider>,
    pub ledger: Arc<dyn LedgerStore>,
    pub gate: Arc<RiskGate>,
    pub signer: Arc<DecisionSigner>,
    /// The only identity whose decisions may be executed.
    pub master_signer: String,
    pub replay: Arc<ReplayGuard>,
    pub notifier: Arc<NotifierRegistry>,
}

impl ExecutionRouter {
    pub fn new(
        account_id: AccountId,
        broker: Arc<dyn Broker>,
        deps: RouterDeps,
        settings: ExecutionSettings,
    ) -> Self {
        Self {
            account_id,
            broker,
            market: deps.market,
            ledger: deps.ledger,
            gate: deps.gate,
            signer: deps.signer,
            master_signer: deps.master_signer,
            replay: deps.replay,
            notifier: deps.notifier,
            settings,
        }
    }

    #[must_use]
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    #[must_use]
    pub fn broker(&self) -> &Arc<dyn Broker> {
        &self.broker
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn LedgerStore> {
        &self.ledger
    }

    #[must_use]
    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    /// Fetch a quote for the intent and decide whether to trade now.
    ///
    /// # Errors
    /// Returns [`DataUnavailable`] when no usable quote exists.
    pub async fn analyze_intent(&self, intent: &OrderIntent) -> Result<CostAnalysis, DataUnavailable> {
        let quote = self
            .market
            .get_quote(&intent.symbol, intent.asset_class)
            .await?;
        analyze_quote(&quote, self.settings.max_spread_pct)
    }

    /// Execute one approved decision.
    ///
    /// Never returns an error: every outcome, including security violations
    /// and broker failures, is reported through [`ExecutionResult`].
    pub async fn execute(
        &self,
        decision: &OrchestratedDecision,
        account: &AccountSnapshot,
    ) -> ExecutionResult {
        let created_at = Utc::now();

        if let Err(violation) = self.authenticate(decision).await {
            error!(
                target: "security",
                account = %self.account_id,
                symbol = %decision.signal.symbol,
                violation = %violation,
                "Decision refused"
            );
            self.notifier.notify_all(Event::SecurityViolation {
                account_id: self.account_id.clone(),
                detail: violation.to_string(),
            });
            return self.finish(
                decision,
                ExecutionResult::not_routed(
                    None,
                    ExecutionStatus::Rejected,
                    RoutingDecision::None,
                    violation.to_string(),
                ),
            );
        }

        let mut intent = match self.intent_for(decision, account) {
            Ok(intent) => intent,
            Err(e) => {
                return self.finish(
                    decision,
                    ExecutionResult::not_routed(
                        None,
                        ExecutionStatus::Rejected,
                        RoutingDecision::None,
                        e.to_string(),
                    ),
                );
            }
        };
        let intent_id = intent.intent_id.clone();

        let analysis = match self.analyze_intent(&intent).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(account = %self.account_id, intent = %intent_id, error = %e, "No usable quote");
                return self.finish(
                    decision,
                    ExecutionResult::not_routed(
                        Some(intent_id),
                        ExecutionStatus::Failed,
                        RoutingDecision::None,
                        e.to_string(),
                    ),
                );
            }
        };
        intent.estimated_slippage = analysis.estimated_slippage;

        if !analysis.should_execute {
            advance(&mut intent, IntentState::Downgraded);
            info!(
                account = %self.account_id,
                intent = %intent_id,
                symbol = %intent.symbol,
                spread = %analysis.spread_pct,
                "Execution deferred"
            );
            return self.finish(
                decision,
                ExecutionResult::not_routed(
                    Some(intent_id),
                    ExecutionStatus::Downgraded,
                    RoutingDecision::Wait,
                    analysis.reason,
                ),
            );
        }

        let request = match build_order(&intent, account, &analysis.quote, self.settings.limit_buffer_pct) {
            Ok(request) => request,
            Err(e) => {
                advance(&mut intent, IntentState::Denied);
                warn!(account = %self.account_id, intent = %intent_id, error = %e, "Order rejected before submission");
                return self.finish(
                    decision,
                    ExecutionResult::not_routed(
                        Some(intent_id),
                        ExecutionStatus::Rejected,
                        RoutingDecision::Execute,
                        e.to_string(),
                    ),
                );
            }
        };

        let result = self
            .submit(&mut intent, request, decision, created_at)
            .await;
        self.finish(decision, result)
    }

    /// Write the ledger, re-check the kill switch and call the broker once.
    async fn submit(
        &self,
        intent: &mut OrderIntent,
        request: OrderRequest,
        decision: &OrchestratedDecision,
        created_at: chrono::DateTime<Utc>,
    ) -> ExecutionResult {
        let intent_id = intent.intent_id.clone();
        let module_id = decision
            .contributors
            .first()
            .cloned()
            .unwrap_or_else(|| decision.signal.module_id.clone());
        let entry = LedgerEntry::pending(self.account_id.clone(), module_id, &request);

        let stored = match self.ledger.create(&entry).await {
            Ok(stored) => stored,
            Err(e) => {
                error!(account = %self.account_id, intent = %intent_id, error = %e, "Ledger write failed, not submitting");
                return ExecutionResult::not_routed(
                    Some(intent_id),
                    ExecutionStatus::Failed,
                    RoutingDecision::Execute,
                    format!("ledger unavailable: {e}"),
                );
            }
        };
        if stored.status != LedgerStatus::Pending || stored.broker_order_id.is_some() {
            warn!(account = %self.account_id, intent = %intent_id, status = %stored.status, "Intent already processed");
            return ExecutionResult::not_routed(
                Some(intent_id),
                ExecutionStatus::Rejected,
                RoutingDecision::Execute,
                format!("intent already {}", stored.status),
            );
        }
        advance(intent, IntentState::Routed);

        if let Err(e) = self.gate.ensure_trading_enabled(&self.account_id).await {
            warn!(account = %self.account_id, intent = %intent_id, reason = %e, "Trading halted before submission");
            self.merge(
                &intent_id,
                LedgerStatus::Failed,
                IntentState::Rejected,
                None,
                Some(e.to_string()),
            )
            .await;
            return ExecutionResult::not_routed(
                Some(intent_id),
                ExecutionStatus::Rejected,
                RoutingDecision::Execute,
                e.to_string(),
            );
        }

        let submitted_at = Utc::now();
        let outcome = match tokio::time::timeout(
            self.settings.broker_timeout,
            self.broker.submit_order(&request),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(BrokerError::Timeout(
                u64::try_from(self.settings.broker_timeout.as_millis()).unwrap_or(u64::MAX),
            )),
        };

        let base = ExecutionResult {
            intent_id: Some(intent_id.clone()),
            status: ExecutionStatus::Pending,
            broker_order_id: None,
            routing_decision: RoutingDecision::Execute,
            reason: None,
            created_at,
            submitted_at: Some(submitted_at),
            completed_at: Utc::now(),
        };

        match outcome {
            Ok(order) if order.status == BrokerOrderStatus::Rejected => {
                advance(intent, IntentState::Rejected);
                let response = serde_json::to_string(&order).ok();
                self.merge(
                    &intent_id,
                    LedgerStatus::Failed,
                    IntentState::Rejected,
                    response,
                    Some("rejected by broker".into()),
                )
                .await;
                ExecutionResult {
                    status: ExecutionStatus::Rejected,
                    broker_order_id: Some(order.broker_order_id),
                    reason: Some("rejected by broker".into()),
                    ..base
                }
            }
            Ok(order) => {
                let state = advance_to_broker_state(intent, &order);
                let response = serde_json::to_string(&order).ok();
                self.merge_submitted(&intent_id, state, &order, response).await;
                info!(
                    account = %self.account_id,
                    intent = %intent_id,
                    broker_order = %order.broker_order_id,
                    symbol = %order.symbol,
                    side = %order.side,
                    quantity = %order.quantity,
                    "Order placed"
                );
                ExecutionResult {
                    status: ExecutionStatus::Placed,
                    broker_order_id: Some(order.broker_order_id),
                    ..base
                }
            }
            Err(e) if e.is_ambiguous() => {
                warn!(
                    account = %self.account_id,
                    intent = %intent_id,
                    error = %e,
                    "Broker outcome unknown, leaving intent pending for reconciliation"
                );
                ExecutionResult {
                    status: ExecutionStatus::Pending,
                    reason: Some(e.to_string()),
                    ..base
                }
            }
            Err(e) => {
                advance(intent, IntentState::Rejected);
                self.merge(
                    &intent_id,
                    LedgerStatus::Failed,
                    IntentState::Rejected,
                    Some(e.to_string()),
                    Some("broker error".into()),
                )
                .await;
                ExecutionResult {
                    status: ExecutionStatus::Failed,
                    reason: Some(e.to_string()),
                    ..base
                }
            }
        }
    }

    async fn authenticate(&self, decision: &OrchestratedDecision) -> Result<(), SecurityViolation> {
        self.signer.verify(decision).await?;
        let identity = decision
            .identity
            .as_ref()
            .ok_or(SecurityViolation::MissingSignature)?;
        if identity.signer_id != self.master_signer {
            return Err(SecurityViolation::UnauthorizedSigner {
                signer_id: identity.signer_id.clone(),
            });
        }
        self.replay.check_and_record(identity)
    }

    fn intent_for(
        &self,
        decision: &OrchestratedDecision,
        account: &AccountSnapshot,
    ) -> Result<OrderIntent, ValidationError> {
        let signal = &decision.signal;
        let (side, close_quantity) = match signal.action {
            Action::Buy => (OrderSide::Buy, None),
            Action::Sell => (OrderSide::Sell, None),
            Action::CloseAll => {
                let held = account.position_quantity(&signal.symbol);
                if held.is_zero() {
                    return Err(ValidationError::ZeroQuantity(held));
                }
                let side = if held > Decimal::ZERO {
                    OrderSide::Sell
                } else {
                    OrderSide::Buy
                };
                (side, Some(held))
            }
            Action::Hold => return Err(ValidationError::NotExecutable(signal.action.to_string())),
        };

        let mut intent = OrderIntent {
            intent_id: IntentId::generate(),
            account_id: self.account_id.clone(),
            module_id: signal.module_id.clone(),
            symbol: signal.symbol.clone(),
            side,
            allocation: decision.allocation(),
            close_quantity,
            asset_class: signal.asset_class,
            estimated_slippage: Decimal::ZERO,
            state: IntentState::Created,
            created_at: Utc::now(),
        };
        intent.advance(IntentState::RiskChecked)?;
        Ok(intent)
    }

    async fn merge_submitted(
        &self,
        intent_id: &IntentId,
        state: IntentState,
        order: &BrokerOrder,
        response: Option<String>,
    ) {
        let update = LedgerUpdate {
            status: LedgerStatus::Submitted,
            intent_state: state,
            broker_order_id: Some(order.broker_order_id.clone()),
            response,
            note: Some("accepted by broker".into()),
        };
        if let Err(e) = self.ledger.merge(intent_id, &update).await {
            // The order is live; reconciliation will pick the entry up.
            error!(account = %self.account_id, intent = %intent_id, error = %e, "Ledger merge failed after submission");
        }
    }

    async fn merge(
        &self,
        intent_id: &IntentId,
        status: LedgerStatus,
        state: IntentState,
        response: Option<String>,
        note: Option<String>,
    ) {
        let update = LedgerUpdate {
            status,
            intent_state: state,
            broker_order_id: None,
            response,
            note,
        };
        if let Err(e) = self.ledger.merge(intent_id, &update).await {
            error!(account = %self.account_id, intent = %intent_id, error = %e, "Ledger merge failed");
        }
    }

    fn finish(&self, decision: &OrchestratedDecision, result: ExecutionResult) -> ExecutionResult {
        self.notifier.notify_all(Event::ExecutionCompleted {
            account_id: self.account_id.clone(),
            intent_id: result.intent_id.clone(),
            symbol: decision.signal.symbol.clone(),
            success: result.is_placed(),
            details: result
                .reason
                .clone()
                .unwrap_or_else(|| result.status.to_string()),
        });
        result
    }
}

/// Move `intent` to `next`, logging a transition the state machine forbids.
fn advance(intent: &mut OrderIntent, next: IntentState) {
    let from = intent.state;
    if let Err(e) = intent.advance(next) {
        warn!(intent = %intent.intent_id, from = %from, to = %next, error = %e, "Illegal intent transition");
    }
}

/// Walk the intent from ROUTED to the state the broker reported.
fn advance_to_broker_state(intent: &mut OrderIntent, order: &BrokerOrder) -> IntentState {
    advance(intent, IntentState::Submitted);
    let reported = order.status.intent_state();
    if reported != IntentState::Submitted {
        advance(intent, reported);
    }
    intent.state
}
