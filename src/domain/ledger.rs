//! Append-only execution audit ledger.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{AccountId, BrokerOrderId, IntentId, ModuleId, Symbol};
use super::order::{IntentState, OrderRequest, OrderSide};

/// Ledger status of an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerStatus {
    /// Written before the broker call; outcome unknown until merged.
    Pending,
    Submitted,
    Failed,
}

impl LedgerStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Submitted => "SUBMITTED",
            Self::Failed => "FAILED",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(Self::Pending),
            "SUBMITTED" => Some(Self::Submitted),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Only PENDING entries may change status.
    #[must_use]
    pub const fn can_merge_into(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Submitted) | (Self::Pending, Self::Failed)
        )
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransition {
    pub from: LedgerStatus,
    pub to: LedgerStatus,
    pub at: DateTime<Utc>,
    pub note: Option<String>,
}

/// Ledger record of one order intent, keyed by `intent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub intent_id: IntentId,
    pub account_id: AccountId,
    pub module_id: ModuleId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub limit_price: Option<Decimal>,
    pub status: LedgerStatus,
    pub intent_state: IntentState,
    pub broker_order_id: Option<BrokerOrderId>,
    /// Full broker response (JSON) or failure description.
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub history: Vec<LedgerTransition>,
}

impl LedgerEntry {
    /// New PENDING entry for a request about to be submitted.
    #[must_use]
    pub fn pending(account_id: AccountId, module_id: ModuleId, request: &OrderRequest) -> Self {
        let now = Utc::now();
        Self {
            intent_id: request.client_order_id.clone(),
            account_id,
            module_id,
            symbol: request.symbol.clone(),
            side: request.side,
            quantity: request.quantity,
            limit_price: request.order_type.limit_price(),
            status: LedgerStatus::Pending,
            intent_state: IntentState::Routed,
            broker_order_id: None,
            response: None,
            created_at: now,
            updated_at: now,
            history: Vec::new(),
        }
    }
}

/// Status transition merged into an existing entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerUpdate {
    pub status: LedgerStatus,
    pub intent_state: IntentState,
    pub broker_order_id: Option<BrokerOrderId>,
    pub response: Option<String>,
    pub note: Option<String>,
}

impl LedgerUpdate {
    /// Apply the update to `entry`, appending to its history.
    ///
    /// Returns `false` (leaving the entry untouched) when the status transition
    /// is not allowed, which makes repeated merges harmless.
    pub fn apply_to(&self, entry: &mut LedgerEntry) -> bool {
        if !entry.status.can_merge_into(self.status) {
            return false;
        }
        let now = Utc::now();
        entry.history.push(LedgerTransition {
            from: entry.status,
            to: self.status,
            at: now,
            note: self.note.clone(),
        });
        entry.status = self.status;
        entry.intent_state = self.intent_state;
        if self.broker_order_id.is_some() {
            entry.broker_order_id = self.broker_order_id.clone();
        }
        if self.response.is_some() {
            entry.response = self.response.clone();
        }
        entry.updated_at = now;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetClass, OrderType};
    use rust_decimal_macros::dec;

    fn entry() -> LedgerEntry {
        let request = OrderRequest {
            client_order_id: IntentId::generate(),
            symbol: Symbol::from("AAPL"),
            side: OrderSide::Buy,
            quantity: dec!(10),
            order_type: OrderType::Limit(dec!(100.5)),
            asset_class: AssetClass::Equity,
        };
        LedgerEntry::pending(AccountId::from("acct"), ModuleId::from("m"), &request)
    }

    #[test]
    fn pending_entry_copies_request() {
        let e = entry();
        assert_eq!(e.status, LedgerStatus::Pending);
        assert_eq!(e.limit_price, Some(dec!(100.5)));
        assert!(e.history.is_empty());
    }

    #[test]
    fn merge_appends_history_and_is_one_shot() {
        let mut e = entry();
        let update = LedgerUpdate {
            status: LedgerStatus::Submitted,
            intent_state: IntentState::Submitted,
            broker_order_id: Some(BrokerOrderId::from("b-1")),
            response: Some("{}".into()),
            note: None,
        };
        assert!(update.apply_to(&mut e));
        assert_eq!(e.status, LedgerStatus::Submitted);
        assert_eq!(e.history.len(), 1);

        let fail = LedgerUpdate {
            status: LedgerStatus::Failed,
            intent_state: IntentState::Rejected,
            broker_order_id: None,
            response: None,
            note: None,
        };
        assert!(!fail.apply_to(&mut e));
        assert_eq!(e.status, LedgerStatus::Submitted);
        assert_eq!(e.broker_order_id, Some(BrokerOrderId::from("b-1")));
    }
}
