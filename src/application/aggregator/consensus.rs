//! Per-symbol master decision.

use std::collections::BTreeMap;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::domain::{
    Action, AgentWeight, ModuleId, OrchestratedDecision, StrategySignal, Symbol,
};

const SCORE_EPSILON: f64 = 1e-12;

const ACTIONS: [Action; 4] = [Action::Buy, Action::Sell, Action::Hold, Action::CloseAll];

/// Reduce module decisions into one master decision per symbol.
///
/// Only non-SHADOW modules vote. Each action scores the sum of
/// `confidence * capital_weight` of its voters; the top score wins and a tie
/// at the top (including all-zero) resolves to HOLD. The master allocation
/// is the sum of `target_allocation * capital_weight * weight_multiplier`
/// over the winning voters, clamped to [0, 1].
///
/// The returned decisions are unsigned and attributed to `orchestrator_id`.
#[must_use]
pub fn master_decisions(
    decisions: &[OrchestratedDecision],
    weights: &BTreeMap<ModuleId, AgentWeight>,
    orchestrator_id: &ModuleId,
) -> Vec<OrchestratedDecision> {
    let mut by_symbol: BTreeMap<&Symbol, Vec<(&OrchestratedDecision, &AgentWeight)>> =
        BTreeMap::new();
    for decision in decisions {
        let Some(weight) = weights.get(&decision.signal.module_id) else {
            continue;
        };
        if !weight.is_eligible() {
            continue;
        }
        by_symbol
            .entry(&decision.signal.symbol)
            .or_default()
            .push((decision, weight));
    }

    by_symbol
        .into_iter()
        .map(|(symbol, votes)| resolve(symbol, &votes, orchestrator_id))
        .collect()
}

fn resolve(
    symbol: &Symbol,
    votes: &[(&OrchestratedDecision, &AgentWeight)],
    orchestrator_id: &ModuleId,
) -> OrchestratedDecision {
    let score = |action: Action| -> f64 {
        votes
            .iter()
            .filter(|(d, _)| d.signal.action == action)
            .map(|(d, w)| d.signal.confidence * w.capital_weight)
            .sum()
    };
    let scores: Vec<(Action, f64)> = ACTIONS.iter().map(|a| (*a, score(*a))).collect();
    let best = scores.iter().map(|(_, s)| *s).fold(0.0_f64, f64::max);
    let leaders: Vec<Action> = scores
        .iter()
        .filter(|(_, s)| (best - s).abs() <= SCORE_EPSILON)
        .map(|(a, _)| *a)
        .collect();

    let winner = if best <= SCORE_EPSILON || leaders.len() != 1 {
        Action::Hold
    } else {
        leaders[0]
    };

    let winners: Vec<&(&OrchestratedDecision, &AgentWeight)> = votes
        .iter()
        .filter(|(d, _)| d.signal.action == winner)
        .collect();

    let (allocation, reasoning) = if winner == Action::Hold {
        let reasoning = if best <= SCORE_EPSILON {
            "no module expressed conviction".to_string()
        } else if leaders.len() > 1 {
            format!(
                "tie between {}",
                leaders
                    .iter()
                    .map(|a| a.as_str())
                    .collect::<Vec<_>>()
                    .join(" and ")
            )
        } else {
            "consensus is HOLD".to_string()
        };
        (Decimal::ZERO, reasoning)
    } else {
        let allocation: Decimal = winners
            .iter()
            .map(|(d, w)| {
                let factor = Decimal::from_f64(w.capital_weight * w.weight_multiplier)
                    .unwrap_or(Decimal::ZERO);
                d.signal.target_allocation * factor
            })
            .sum();
        let reasoning = winners
            .iter()
            .map(|(d, _)| format!("{}: {}", d.signal.module_id, d.signal.reasoning))
            .collect::<Vec<_>>()
            .join("; ");
        (allocation, reasoning)
    };

    let asset_class = votes
        .first()
        .map(|(d, _)| d.signal.asset_class)
        .unwrap_or_default();
    let confidence = if winner == Action::Hold { 0.0 } else { best };

    let mut signal = StrategySignal::new(
        orchestrator_id.clone(),
        winner,
        symbol.clone(),
        confidence,
        allocation.round_dp(6),
        reasoning,
        asset_class,
    );
    signal.target_allocation = signal.target_allocation.normalize();

    let overridden = votes.iter().find(|(d, _)| d.overridden);
    OrchestratedDecision {
        signal,
        applied_weight: winners.iter().map(|(_, w)| w.capital_weight).sum(),
        overridden: overridden.is_some(),
        override_reason: overridden.and_then(|(d, _)| d.override_reason.clone()),
        contributors: if winner == Action::Hold && winners.is_empty() {
            votes.iter().map(|(d, _)| d.signal.module_id.clone()).collect()
        } else {
            winners.iter().map(|(d, _)| d.signal.module_id.clone()).collect()
        },
        identity: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentMode, AssetClass};
    use rust_decimal_macros::dec;

    fn weight(id: &str, mode: AgentMode, capital: f64) -> (ModuleId, AgentWeight) {
        (
            ModuleId::from(id),
            AgentWeight {
                module_id: ModuleId::from(id),
                sharpe_ratio: 1.0,
                mode,
                weight_multiplier: mode.multiplier(),
                capital_weight: capital,
            },
        )
    }

    fn decision(id: &str, action: Action, confidence: f64, alloc: Decimal) -> OrchestratedDecision {
        OrchestratedDecision::unsigned(
            StrategySignal::new(
                ModuleId::from(id),
                action,
                Symbol::from("AAPL"),
                confidence,
                alloc,
                format!("{id} says {action}"),
                AssetClass::Equity,
            ),
            0.0,
        )
    }

    fn orchestrator() -> ModuleId {
        ModuleId::from("orchestrator")
    }

    #[test]
    fn weighted_majority_wins() {
        let weights: BTreeMap<_, _> = [
            weight("a", AgentMode::Active, 0.6),
            weight("b", AgentMode::Reduced, 0.4),
        ]
        .into_iter()
        .collect();
        let decisions = vec![
            decision("a", Action::Buy, 0.9, dec!(0.2)),
            decision("b", Action::Sell, 0.9, dec!(0.2)),
        ];

        let masters = master_decisions(&decisions, &weights, &orchestrator());
        assert_eq!(masters.len(), 1);
        let master = &masters[0];
        assert_eq!(master.signal.action, Action::Buy);
        assert_eq!(master.signal.module_id, orchestrator());
        assert_eq!(master.contributors, vec![ModuleId::from("a")]);
        // 0.2 * 0.6 * 1.0
        assert_eq!(master.allocation(), dec!(0.12));
    }

    #[test]
    fn tie_resolves_to_hold() {
        let weights: BTreeMap<_, _> = [
            weight("a", AgentMode::Active, 0.5),
            weight("b", AgentMode::Active, 0.5),
        ]
        .into_iter()
        .collect();
        let decisions = vec![
            decision("a", Action::Buy, 0.8, dec!(0.2)),
            decision("b", Action::Sell, 0.8, dec!(0.2)),
        ];
        let master = &master_decisions(&decisions, &weights, &orchestrator())[0];
        assert_eq!(master.signal.action, Action::Hold);
        assert_eq!(master.allocation(), Decimal::ZERO);
        assert!(master.signal.reasoning.contains("tie"));
    }

    #[test]
    fn shadow_modules_do_not_vote() {
        let weights: BTreeMap<_, _> = [
            weight("a", AgentMode::Active, 1.0),
            weight("s", AgentMode::Shadow, 0.0),
        ]
        .into_iter()
        .collect();
        let decisions = vec![
            decision("a", Action::Hold, 0.0, dec!(0)),
            decision("s", Action::Buy, 1.0, dec!(1)),
        ];
        let master = &master_decisions(&decisions, &weights, &orchestrator())[0];
        assert_eq!(master.signal.action, Action::Hold);
        assert!(!master.contributors.contains(&ModuleId::from("s")));
    }

    #[test]
    fn reduced_module_allocation_is_halved() {
        let weights: BTreeMap<_, _> = [weight("b", AgentMode::Reduced, 1.0)].into_iter().collect();
        let decisions = vec![decision("b", Action::Sell, 0.5, dec!(0.4))];
        let master = &master_decisions(&decisions, &weights, &orchestrator())[0];
        assert_eq!(master.signal.action, Action::Sell);
        assert_eq!(master.allocation(), dec!(0.2));
    }

    #[test]
    fn overridden_votes_mark_the_master() {
        let weights: BTreeMap<_, _> = [weight("a", AgentMode::Active, 1.0)].into_iter().collect();
        let mut d = decision("a", Action::Hold, 0.0, dec!(0.1));
        d.overridden = true;
        d.override_reason = Some("systemic".into());
        let master = &master_decisions(&[d], &weights, &orchestrator())[0];
        assert!(master.overridden);
        assert_eq!(master.override_reason.as_deref(), Some("systemic"));
    }
}
