//! Scripted market data configuration.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::adapter::outbound::paper::ScriptedMarketData;
use crate::domain::{AssetClass, Quote, RegimeSnapshot};

/// Static quotes and regime inputs (`[market]`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketConfig {
    #[serde(default)]
    pub quotes: Vec<QuoteConfig>,
    #[serde(default)]
    pub regime: RegimeConfig,
}

/// One `[[market.quotes]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteConfig {
    pub symbol: String,
    #[serde(default)]
    pub asset_class: AssetClass,
    pub bid: Decimal,
    pub ask: Decimal,
}

/// `[market.regime]`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RegimeConfig {
    #[serde(default)]
    pub net_gamma_exposure: f64,
    #[serde(default)]
    pub volatility_bias: f64,
}

impl MarketConfig {
    /// Asset class configured for `symbol`, if quoted.
    #[must_use]
    pub fn asset_class(&self, symbol: &str) -> Option<AssetClass> {
        self.quotes
            .iter()
            .find(|q| q.symbol == symbol)
            .map(|q| q.asset_class)
    }

    /// Build the market data adapter.
    #[must_use]
    pub fn build(&self) -> ScriptedMarketData {
        let market = ScriptedMarketData::new();
        for quote in &self.quotes {
            market.set_quote(quote.symbol.as_str(), Quote::new(quote.bid, quote.ask));
        }
        market.set_regime(RegimeSnapshot {
            net_gamma_exposure: self.regime.net_gamma_exposure,
            volatility_bias: self.regime.volatility_bias,
        });
        market
    }
}
