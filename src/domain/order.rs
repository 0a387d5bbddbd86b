//! Order intents, broker requests and execution outcomes.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{AccountId, BrokerOrderId, IntentId, ModuleId, Symbol};
use super::signal::AssetClass;
use crate::error::ValidationError;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Signed direction: +1 for buys, -1 for sells.
    #[must_use]
    pub fn sign(self) -> Decimal {
        match self {
            Self::Buy => Decimal::ONE,
            Self::Sell => Decimal::NEGATIVE_ONE,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }

    /// Parse a persisted side.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "buy" => Some(Self::Buy),
            "sell" => Some(Self::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order type sent to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "price", rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit(Decimal),
}

impl OrderType {
    #[must_use]
    pub const fn limit_price(self) -> Option<Decimal> {
        match self {
            Self::Market => None,
            Self::Limit(p) => Some(p),
        }
    }
}

/// Lifecycle of an order intent.
///
/// `Created -> RiskChecked -> Routed -> Submitted -> {Filled, PartiallyFilled,
/// Rejected, Canceled}`. `Denied` and `Downgraded` end the intent before it
/// reaches the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentState {
    Created,
    RiskChecked,
    Denied,
    Routed,
    Downgraded,
    Submitted,
    PartiallyFilled,
    Filled,
    Rejected,
    Canceled,
}

impl IntentState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Rejected | Self::Canceled | Self::Denied | Self::Downgraded
        )
    }

    /// Whether `self -> next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use IntentState::*;
        matches!(
            (self, next),
            (Created, RiskChecked)
                | (Created, Denied)
                | (RiskChecked, Routed)
                | (RiskChecked, Denied)
                | (RiskChecked, Downgraded)
                | (Routed, Submitted)
                | (Routed, Downgraded)
                | (Routed, Rejected)
                | (Submitted, PartiallyFilled)
                | (Submitted, Filled)
                | (Submitted, Rejected)
                | (Submitted, Canceled)
                | (PartiallyFilled, PartiallyFilled)
                | (PartiallyFilled, Filled)
                | (PartiallyFilled, Canceled)
        )
    }

    /// Move to `next`, rejecting illegal transitions.
    ///
    /// # Errors
    /// Returns [`ValidationError::IllegalTransition`] for transitions outside the
    /// state machine, including any move out of a terminal state.
    pub fn transition(self, next: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ValidationError::IllegalTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::RiskChecked => "RISK_CHECKED",
            Self::Denied => "DENIED",
            Self::Routed => "ROUTED",
            Self::Downgraded => "DOWNGRADED",
            Self::Submitted => "SUBMITTED",
            Self::PartiallyFilled => "PARTIALLY_FILLED",
            Self::Filled => "FILLED",
            Self::Rejected => "REJECTED",
            Self::Canceled => "CANCELED",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Some(match value {
            "CREATED" => Self::Created,
            "RISK_CHECKED" => Self::RiskChecked,
            "DENIED" => Self::Denied,
            "ROUTED" => Self::Routed,
            "DOWNGRADED" => Self::Downgraded,
            "SUBMITTED" => Self::Submitted,
            "PARTIALLY_FILLED" => Self::PartiallyFilled,
            "FILLED" => Self::Filled,
            "REJECTED" => Self::Rejected,
            "CANCELED" => Self::Canceled,
            _ => return None,
        })
    }
}

impl fmt::Display for IntentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decision turned into an order-to-be.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub intent_id: IntentId,
    pub account_id: AccountId,
    pub module_id: ModuleId,
    pub symbol: Symbol,
    pub side: OrderSide,
    /// Allocation fraction of buying power.
    pub allocation: Decimal,
    /// Full position quantity to flatten, for CLOSE_ALL intents.
    pub close_quantity: Option<Decimal>,
    pub asset_class: AssetClass,
    pub estimated_slippage: Decimal,
    pub state: IntentState,
    pub created_at: DateTime<Utc>,
}

impl OrderIntent {
    /// Advance the intent through the state machine.
    ///
    /// # Errors
    /// Returns an error for illegal transitions.
    pub fn advance(&mut self, next: IntentState) -> Result<(), ValidationError> {
        self.state = self.state.transition(next)?;
        Ok(())
    }
}

/// Concrete order sent to the broker. `client_order_id` is the intent id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub client_order_id: IntentId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub order_type: OrderType,
    pub asset_class: AssetClass,
}

impl OrderRequest {
    /// Fail fast on parameters the broker must never see.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] for zero quantity, non-positive limit price
    /// or an empty symbol.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.symbol.as_str().trim().is_empty() {
            return Err(ValidationError::UnknownSymbol(self.symbol.to_string()));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(ValidationError::ZeroQuantity(self.quantity));
        }
        if let OrderType::Limit(price) = self.order_type {
            if price <= Decimal::ZERO {
                return Err(ValidationError::NonPositivePrice(price));
            }
        }
        Ok(())
    }
}

/// Status of an order as reported by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerOrderStatus {
    Accepted,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
}

impl BrokerOrderStatus {
    /// Intent state reached once the broker reports this status.
    #[must_use]
    pub const fn intent_state(self) -> IntentState {
        match self {
            Self::Accepted => IntentState::Submitted,
            Self::PartiallyFilled => IntentState::PartiallyFilled,
            Self::Filled => IntentState::Filled,
            Self::Canceled => IntentState::Canceled,
            Self::Rejected => IntentState::Rejected,
        }
    }
}

/// Broker acknowledgement of a submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerOrder {
    pub broker_order_id: BrokerOrderId,
    pub client_order_id: IntentId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub filled_quantity: Decimal,
    pub average_price: Option<Decimal>,
    pub status: BrokerOrderStatus,
    /// When the broker received the request.
    pub received_at: DateTime<Utc>,
}

/// Cost-based routing outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingDecision {
    Execute,
    /// Deferred for cost reasons (spread too wide). Not an error.
    Wait,
    /// Not routed at all (denied, invalid, halted).
    None,
}

/// Final status of an execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Placed,
    Rejected,
    Downgraded,
    Failed,
    /// Outcome unknown; the ledger entry awaits reconciliation.
    Pending,
}

impl ExecutionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Placed => "PLACED",
            Self::Rejected => "REJECTED",
            Self::Downgraded => "DOWNGRADED",
            Self::Failed => "FAILED",
            Self::Pending => "PENDING",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`crate::application::execution::ExecutionRouter::execute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub intent_id: Option<IntentId>,
    pub status: ExecutionStatus,
    pub broker_order_id: Option<BrokerOrderId>,
    pub routing_decision: RoutingDecision,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// Result for an attempt that ended before any order existed.
    pub fn not_routed(
        intent_id: Option<IntentId>,
        status: ExecutionStatus,
        routing_decision: RoutingDecision,
        reason: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            intent_id,
            status,
            broker_order_id: None,
            routing_decision,
            reason: Some(reason.into()),
            created_at: now,
            submitted_at: None,
            completed_at: now,
        }
    }

    #[must_use]
    pub fn is_placed(&self) -> bool {
        self.status == ExecutionStatus::Placed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn happy_path_transitions() {
        let s = IntentState::Created
            .transition(IntentState::RiskChecked)
            .and_then(|s| s.transition(IntentState::Routed))
            .and_then(|s| s.transition(IntentState::Submitted))
            .and_then(|s| s.transition(IntentState::Filled))
            .unwrap();
        assert_eq!(s, IntentState::Filled);
        assert!(s.is_terminal());
    }

    #[test]
    fn terminal_states_cannot_move() {
        for terminal in [
            IntentState::Filled,
            IntentState::Rejected,
            IntentState::Canceled,
            IntentState::Denied,
            IntentState::Downgraded,
        ] {
            assert!(terminal.is_terminal());
            assert!(terminal.transition(IntentState::Submitted).is_err());
        }
    }

    #[test]
    fn cannot_skip_risk_check() {
        assert!(IntentState::Created.transition(IntentState::Submitted).is_err());
        assert!(IntentState::Created.transition(IntentState::Routed).is_err());
    }

    #[test]
    fn state_names_round_trip() {
        for s in [
            IntentState::Created,
            IntentState::RiskChecked,
            IntentState::PartiallyFilled,
            IntentState::Canceled,
        ] {
            assert_eq!(IntentState::parse(s.as_str()), Some(s));
        }
    }

    fn request(quantity: Decimal, order_type: OrderType) -> OrderRequest {
        OrderRequest {
            client_order_id: IntentId::generate(),
            symbol: Symbol::from("AAPL"),
            side: OrderSide::Buy,
            quantity,
            order_type,
            asset_class: AssetClass::Equity,
        }
    }

    #[test]
    fn validate_rejects_bad_parameters() {
        assert_eq!(
            request(Decimal::ZERO, OrderType::Market).validate(),
            Err(ValidationError::ZeroQuantity(Decimal::ZERO))
        );
        assert_eq!(
            request(dec!(1), OrderType::Limit(Decimal::ZERO)).validate(),
            Err(ValidationError::NonPositivePrice(Decimal::ZERO))
        );
        let mut r = request(dec!(1), OrderType::Market);
        r.symbol = Symbol::from(" ");
        assert!(matches!(r.validate(), Err(ValidationError::UnknownSymbol(_))));
        assert!(request(dec!(1), OrderType::Limit(dec!(10))).validate().is_ok());
    }
}
