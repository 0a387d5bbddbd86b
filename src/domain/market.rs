//! Read-only market and account snapshots.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{AccountId, BrokerOrderId, IntentId, Symbol};
use super::order::OrderSide;
use super::signal::AssetClass;
use crate::error::DataUnavailable;

/// Top-of-book quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: Decimal,
    pub ask: Decimal,
    pub mid: Decimal,
}

impl Quote {
    /// Build a quote, deriving the mid price.
    #[must_use]
    pub fn new(bid: Decimal, ask: Decimal) -> Self {
        Self {
            bid,
            ask,
            mid: (bid + ask) / Decimal::TWO,
        }
    }

    /// Reject quotes that cannot be priced against.
    ///
    /// # Errors
    /// Returns [`DataUnavailable`] for non-positive or crossed quotes.
    pub fn validate(&self) -> Result<(), DataUnavailable> {
        if self.bid <= Decimal::ZERO || self.ask <= Decimal::ZERO {
            return Err(DataUnavailable::new(
                "market data",
                format!("non-positive quote bid={} ask={}", self.bid, self.ask),
            ));
        }
        if self.ask < self.bid {
            return Err(DataUnavailable::new(
                "market data",
                format!("crossed quote bid={} ask={}", self.bid, self.ask),
            ));
        }
        Ok(())
    }

    /// Relative spread `(ask - bid) / mid`.
    #[must_use]
    pub fn spread_pct(&self) -> Decimal {
        if self.mid <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.ask - self.bid) / self.mid
    }
}

/// Dealer-positioning regime inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RegimeSnapshot {
    pub net_gamma_exposure: f64,
    pub volatility_bias: f64,
}

/// Quotes for the account universe at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub quotes: HashMap<Symbol, Quote>,
    pub asset_classes: HashMap<Symbol, AssetClass>,
    pub taken_at: Option<DateTime<Utc>>,
}

impl MarketSnapshot {
    #[must_use]
    pub fn quote(&self, symbol: &Symbol) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    #[must_use]
    pub fn asset_class(&self, symbol: &Symbol) -> AssetClass {
        self.asset_classes.get(symbol).copied().unwrap_or_default()
    }
}

/// Position held at the broker. Negative quantity is short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    pub quantity: Decimal,
    pub average_price: Decimal,
    pub market_price: Decimal,
    pub asset_class: AssetClass,
}

impl Position {
    /// Absolute market value.
    #[must_use]
    pub fn notional(&self) -> Decimal {
        (self.quantity * self.market_price).abs()
    }
}

/// Resting order at the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub broker_order_id: BrokerOrderId,
    pub client_order_id: IntentId,
    pub symbol: Symbol,
    pub side: OrderSide,
    pub quantity: Decimal,
}

/// Account state as reported by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub account_id: AccountId,
    pub equity: Decimal,
    pub buying_power: Decimal,
    pub positions: Vec<Position>,
    pub open_orders: Vec<OpenOrder>,
}

impl AccountSnapshot {
    /// Signed quantity held in `symbol` (zero when flat).
    #[must_use]
    pub fn position_quantity(&self, symbol: &Symbol) -> Decimal {
        self.positions
            .iter()
            .filter(|p| &p.symbol == symbol)
            .map(|p| p.quantity)
            .sum()
    }

    #[must_use]
    pub fn position(&self, symbol: &Symbol) -> Option<&Position> {
        self.positions.iter().find(|p| &p.symbol == symbol)
    }
}
