//! Capital weights from trailing risk-adjusted performance.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::AggregatorSettings;
use crate::domain::{AgentMode, AgentWeight, ModuleId, PerformanceRecord};
use crate::error::{DataUnavailable, Result};
use crate::port::PerformanceStore;

/// Per-period returns relative to `reference_capital`.
#[must_use]
pub fn period_returns(records: &[PerformanceRecord], reference_capital: Decimal) -> Vec<f64> {
    if reference_capital <= Decimal::ZERO {
        return Vec::new();
    }
    records
        .iter()
        .filter_map(|r| (r.total_pnl() / reference_capital).to_f64())
        .collect()
}

/// Annualized Sharpe ratio of a return series.
///
/// Uses the sample standard deviation (n - 1). Fewer than two points or a
/// zero deviation yield 0.
#[must_use]
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();
    if std_dev == 0.0 || !std_dev.is_finite() {
        return 0.0;
    }
    let sharpe = periods_per_year.sqrt() * (mean - risk_free_rate) / std_dev;
    if sharpe.is_finite() {
        sharpe
    } else {
        0.0
    }
}

/// Map a Sharpe ratio to its execution tier.
#[must_use]
pub fn classify(sharpe: f64, settings: &AggregatorSettings) -> AgentMode {
    if sharpe >= settings.active_sharpe {
        AgentMode::Active
    } else if sharpe >= settings.reduced_sharpe {
        AgentMode::Reduced
    } else {
        AgentMode::Shadow
    }
}

/// Numerically stable softmax. Empty input gives empty output.
#[must_use]
pub fn softmax(values: &[f64]) -> Vec<f64> {
    let Some(max) = values.iter().copied().reduce(f64::max) else {
        return Vec::new();
    };
    let exps: Vec<f64> = values.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Tier modules and spread capital across the eligible ones.
///
/// Capital weights are the softmax of the Sharpe ratios of ACTIVE and
/// REDUCED modules; SHADOW modules get zero. When no module is eligible every
/// module gets an equal capital weight, but modes stay as classified so
/// SHADOW modules still never execute.
#[must_use]
pub fn assign_weights(
    sharpes: &[(ModuleId, f64)],
    settings: &AggregatorSettings,
) -> BTreeMap<ModuleId, AgentWeight> {
    let mut weights: BTreeMap<ModuleId, AgentWeight> = sharpes
        .iter()
        .map(|(id, sharpe)| {
            let mode = classify(*sharpe, settings);
            (
                id.clone(),
                AgentWeight {
                    module_id: id.clone(),
                    sharpe_ratio: *sharpe,
                    mode,
                    weight_multiplier: mode.multiplier(),
                    capital_weight: 0.0,
                },
            )
        })
        .collect();

    let eligible: Vec<(ModuleId, f64)> = weights
        .values()
        .filter(|w| w.is_eligible())
        .map(|w| (w.module_id.clone(), w.sharpe_ratio))
        .collect();

    if eligible.is_empty() {
        if !weights.is_empty() {
            warn!(
                modules = weights.len(),
                "No module is eligible for capital, falling back to equal weights"
            );
            let equal = 1.0 / weights.len() as f64;
            for weight in weights.values_mut() {
                weight.capital_weight = equal;
            }
        }
        return weights;
    }

    let shares = softmax(&eligible.iter().map(|(_, s)| *s).collect::<Vec<_>>());
    for ((id, _), share) in eligible.iter().zip(shares) {
        if let Some(weight) = weights.get_mut(id) {
            weight.capital_weight = share;
        }
    }
    weights
}

/// Computes [`AgentWeight`]s from the performance store.
pub struct WeightCalculator {
    store: Arc<dyn PerformanceStore>,
    settings: AggregatorSettings,
}

impl WeightCalculator {
    pub fn new(store: Arc<dyn PerformanceStore>, settings: AggregatorSettings) -> Self {
        Self { store, settings }
    }

    /// Weights for the given modules.
    ///
    /// # Errors
    /// Returns [`DataUnavailable`] if the performance store cannot be read;
    /// the cycle must not proceed on partial weights.
    pub async fn calculate_weights(
        &self,
        module_ids: &[ModuleId],
    ) -> Result<BTreeMap<ModuleId, AgentWeight>> {
        let mut sharpes = Vec::with_capacity(module_ids.len());
        for id in module_ids {
            let records = self
                .store
                .recent(id, self.settings.lookback)
                .await
                .map_err(|e| DataUnavailable::new("performance store", e.to_string()))?;
            let returns = period_returns(&records, self.settings.reference_capital);
            let sharpe = sharpe_ratio(
                &returns,
                self.settings.daily_risk_free_rate,
                self.settings.periods_per_year,
            );
            debug!(module = %id, records = records.len(), sharpe, "Sharpe computed");
            sharpes.push((id.clone(), sharpe));
        }
        Ok(assign_weights(&sharpes, &self.settings))
    }
}
