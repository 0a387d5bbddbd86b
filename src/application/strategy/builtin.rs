//! Built-in decision modules.
//!
//! Simple reference modules so a configured deployment has something to
//! evaluate. Real signal models plug in through [`ModuleFactory`].

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::{DecisionModule, EvaluationContext, ModuleConfig, ModuleFactory};
use crate::domain::{Action, AssetClass, ModuleId, StrategySignal, Symbol};
use crate::error::{DataUnavailable, Error, Result};

/// Trades the dealer-positioning regime.
///
/// Positive net gamma with a calm volatility bias is read as a supportive
/// regime (BUY); negative gamma with an elevated bias as a fragile one (SELL).
pub struct RegimeBiasModule {
    id: ModuleId,
    symbol: Symbol,
    asset_class: AssetClass,
    allocation: Decimal,
    gamma_threshold: f64,
    bias_threshold: f64,
    confidence: f64,
}

#[async_trait]
impl DecisionModule for RegimeBiasModule {
    fn id(&self) -> &ModuleId {
        &self.id
    }

    fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<StrategySignal> {
        let gamma = ctx.regime.net_gamma_exposure;
        let bias = ctx.regime.volatility_bias;
        if !gamma.is_finite() || !bias.is_finite() {
            return Err(DataUnavailable::new("regime", "non-finite regime snapshot").into());
        }

        let (action, reasoning) = if gamma > self.gamma_threshold && bias < self.bias_threshold {
            (
                Action::Buy,
                format!("positive gamma {gamma:.2} with volatility bias {bias:.2}"),
            )
        } else if gamma < -self.gamma_threshold && bias > self.bias_threshold {
            (
                Action::Sell,
                format!("negative gamma {gamma:.2} with volatility bias {bias:.2}"),
            )
        } else {
            (Action::Hold, "regime is neutral".to_string())
        };

        let confidence = if action == Action::Hold {
            0.0
        } else {
            self.confidence
        };
        let allocation = if action == Action::Hold {
            Decimal::ZERO
        } else {
            self.allocation
        };

        Ok(StrategySignal::new(
            self.id.clone(),
            action,
            self.symbol.clone(),
            confidence,
            allocation,
            reasoning,
            self.asset_class,
        ))
    }
}

/// Factory for [`RegimeBiasModule`] (`kind = "regime_bias"`).
///
/// Parameters: `gamma_threshold` (default 0), `bias_threshold` (default 0),
/// `confidence` (default 0.7).
pub struct RegimeBiasFactory;

impl ModuleFactory for RegimeBiasFactory {
    fn kind(&self) -> &'static str {
        "regime_bias"
    }

    fn init(&self, config: &ModuleConfig) -> Result<Box<dyn DecisionModule>> {
        let gamma_threshold = config.param_f64("gamma_threshold", 0.0)?;
        if gamma_threshold < 0.0 {
            return Err(Error::Module(format!(
                "module '{}': gamma_threshold must be non-negative",
                config.id
            )));
        }
        Ok(Box::new(RegimeBiasModule {
            id: ModuleId::new(config.id.clone()),
            symbol: Symbol::new(config.symbol.clone()),
            asset_class: config.asset_class,
            allocation: config.allocation,
            gamma_threshold,
            bias_threshold: config.param_f64("bias_threshold", 0.0)?,
            confidence: config.param_f64("confidence", 0.7)?,
        }))
    }
}

/// Fades deviations of the mid price from a configured fair value.
pub struct SpreadReversionModule {
    id: ModuleId,
    symbol: Symbol,
    asset_class: AssetClass,
    allocation: Decimal,
    fair_value: Decimal,
    band: Decimal,
}

#[async_trait]
impl DecisionModule for SpreadReversionModule {
    fn id(&self) -> &ModuleId {
        &self.id
    }

    fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> Result<StrategySignal> {
        let quote = ctx.market.quote(&self.symbol).ok_or_else(|| {
            DataUnavailable::new("market data", format!("no quote for {}", self.symbol))
        })?;
        quote.validate()?;

        let deviation = (quote.mid - self.fair_value) / self.fair_value;
        let action = if deviation < -self.band {
            Action::Buy
        } else if deviation > self.band {
            Action::Sell
        } else {
            Action::Hold
        };

        // Full confidence once the deviation reaches twice the band.
        let confidence = if action == Action::Hold {
            0.0
        } else {
            (deviation.abs() / (self.band * Decimal::TWO))
                .to_f64()
                .unwrap_or(0.0)
        };
        let allocation = if action == Action::Hold {
            Decimal::ZERO
        } else {
            self.allocation
        };

        Ok(StrategySignal::new(
            self.id.clone(),
            action,
            self.symbol.clone(),
            confidence,
            allocation,
            format!(
                "mid {} deviates {}% from fair value {}",
                quote.mid,
                (deviation * Decimal::ONE_HUNDRED).round_dp(2),
                self.fair_value
            ),
            self.asset_class,
        ))
    }
}

/// Factory for [`SpreadReversionModule`] (`kind = "spread_reversion"`).
///
/// Parameters: `fair_value` (required, positive), `band` (default 0.01).
pub struct SpreadReversionFactory;

impl ModuleFactory for SpreadReversionFactory {
    fn kind(&self) -> &'static str {
        "spread_reversion"
    }

    fn init(&self, config: &ModuleConfig) -> Result<Box<dyn DecisionModule>> {
        let fair_value = Decimal::try_from(config.require_f64("fair_value")?)
            .map_err(|e| Error::Module(format!("module '{}': fair_value: {e}", config.id)))?;
        let band = Decimal::try_from(config.param_f64("band", 0.01)?)
            .map_err(|e| Error::Module(format!("module '{}': band: {e}", config.id)))?;
        if fair_value <= Decimal::ZERO {
            return Err(Error::Module(format!(
                "module '{}': fair_value must be positive",
                config.id
            )));
        }
        if band <= Decimal::ZERO {
            return Err(Error::Module(format!(
                "module '{}': band must be positive",
                config.id
            )));
        }
        Ok(Box::new(SpreadReversionModule {
            id: ModuleId::new(config.id.clone()),
            symbol: Symbol::new(config.symbol.clone()),
            asset_class: config.asset_class,
            allocation: config.allocation,
            fair_value,
            band,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountId, AccountSnapshot, MarketSnapshot, Quote, RegimeSnapshot};
    use rust_decimal_macros::dec;

    fn config(kind: &str, params: &[(&str, f64)]) -> ModuleConfig {
        let mut table = toml::Table::new();
        for (k, v) in params {
            table.insert((*k).to_string(), toml::Value::Float(*v));
        }
        ModuleConfig {
            id: "m".into(),
            kind: kind.into(),
            enabled: true,
            symbol: "AAPL".into(),
            asset_class: AssetClass::Equity,
            allocation: dec!(0.2),
            params: table,
        }
    }

    fn ctx(regime: RegimeSnapshot, mid: Option<Decimal>) -> EvaluationContext {
        let mut market = MarketSnapshot::default();
        if let Some(mid) = mid {
            market.quotes.insert(
                Symbol::from("AAPL"),
                Quote::new(mid - dec!(0.01), mid + dec!(0.01)),
            );
        }
        EvaluationContext {
            market,
            account: AccountSnapshot {
                account_id: AccountId::from("a"),
                equity: dec!(1000),
                buying_power: dec!(1000),
                positions: vec![],
                open_orders: vec![],
            },
            regime,
        }
    }

    #[tokio::test]
    async fn regime_bias_follows_gamma() {
        let module = RegimeBiasFactory
            .init(&config("regime_bias", &[("bias_threshold", 0.5)]))
            .unwrap();

        let buy = module
            .evaluate(&ctx(
                RegimeSnapshot {
                    net_gamma_exposure: 2.0,
                    volatility_bias: 0.1,
                },
                None,
            ))
            .await
            .unwrap();
        assert_eq!(buy.action, Action::Buy);
        assert_eq!(buy.target_allocation, dec!(0.2));

        let sell = module
            .evaluate(&ctx(
                RegimeSnapshot {
                    net_gamma_exposure: -2.0,
                    volatility_bias: 0.9,
                },
                None,
            ))
            .await
            .unwrap();
        assert_eq!(sell.action, Action::Sell);

        let hold = module
            .evaluate(&ctx(RegimeSnapshot::default(), None))
            .await
            .unwrap();
        assert_eq!(hold.action, Action::Hold);
        assert_eq!(hold.confidence, 0.0);
    }

    #[tokio::test]
    async fn spread_reversion_fades_deviation() {
        let module = SpreadReversionFactory
            .init(&config("spread_reversion", &[("fair_value", 100.0), ("band", 0.01)]))
            .unwrap();

        let buy = module
            .evaluate(&ctx(RegimeSnapshot::default(), Some(dec!(97))))
            .await
            .unwrap();
        assert_eq!(buy.action, Action::Buy);
        assert_eq!(buy.confidence, 1.0);

        let sell = module
            .evaluate(&ctx(RegimeSnapshot::default(), Some(dec!(101.5))))
            .await
            .unwrap();
        assert_eq!(sell.action, Action::Sell);
        assert!(sell.confidence > 0.5 && sell.confidence < 1.0);

        let hold = module
            .evaluate(&ctx(RegimeSnapshot::default(), Some(dec!(100.5))))
            .await
            .unwrap();
        assert_eq!(hold.action, Action::Hold);
    }

    #[tokio::test]
    async fn spread_reversion_without_quote_errors() {
        let module = SpreadReversionFactory
            .init(&config("spread_reversion", &[("fair_value", 100.0)]))
            .unwrap();
        assert!(module
            .evaluate(&ctx(RegimeSnapshot::default(), None))
            .await
            .is_err());
    }

    #[test]
    fn spread_reversion_requires_fair_value() {
        assert!(SpreadReversionFactory
            .init(&config("spread_reversion", &[]))
            .is_err());
        assert!(SpreadReversionFactory
            .init(&config("spread_reversion", &[("fair_value", -1.0)]))
            .is_err());
    }
}
