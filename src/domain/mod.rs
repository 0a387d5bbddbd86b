//! Exchange-agnostic domain types.

pub mod decision;
pub mod id;
pub mod ledger;
pub mod market;
pub mod order;
pub mod performance;
pub mod risk;
pub mod signal;
pub mod weight;

pub use decision::{Identity, OrchestratedDecision};
pub use id::{AccountId, BrokerOrderId, IntentId, ModuleId, SessionId, Symbol};
pub use ledger::{LedgerEntry, LedgerStatus, LedgerTransition, LedgerUpdate};
pub use market::{AccountSnapshot, MarketSnapshot, OpenOrder, Position, Quote, RegimeSnapshot};
pub use order::{
    BrokerOrder, BrokerOrderStatus, ExecutionResult, ExecutionStatus, IntentState, OrderIntent,
    OrderRequest, OrderSide, OrderType, RoutingDecision,
};
pub use performance::PerformanceRecord;
pub use risk::{drawdown, ControlState, RiskState};
pub use signal::{Action, AssetClass, StrategySignal};
pub use weight::{AgentMode, AgentWeight};
