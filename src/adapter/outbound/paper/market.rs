//! Config-driven market data.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{AssetClass, Quote, RegimeSnapshot, Symbol};
use crate::error::DataUnavailable;
use crate::port::MarketDataProvider;

/// Serves whatever quotes and regime it was last given.
#[derive(Default)]
pub struct ScriptedMarketData {
    quotes: RwLock<HashMap<Symbol, Quote>>,
    regime: RwLock<Option<RegimeSnapshot>>,
}

impl ScriptedMarketData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_quote(&self, symbol: impl Into<Symbol>, quote: Quote) {
        self.quotes.write().insert(symbol.into(), quote);
    }

    pub fn remove_quote(&self, symbol: &Symbol) {
        self.quotes.write().remove(symbol);
    }

    pub fn set_regime(&self, regime: RegimeSnapshot) {
        *self.regime.write() = Some(regime);
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedMarketData {
    async fn get_quote(
        &self,
        symbol: &Symbol,
        _asset_class: AssetClass,
    ) -> Result<Quote, DataUnavailable> {
        self.quotes
            .read()
            .get(symbol)
            .copied()
            .ok_or_else(|| DataUnavailable::new("market data", format!("no quote for {symbol}")))
    }

    async fn get_regime_snapshot(&self) -> Result<RegimeSnapshot, DataUnavailable> {
        Ok(self.regime.read().unwrap_or_default())
    }
}
