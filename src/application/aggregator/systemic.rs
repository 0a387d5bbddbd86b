//! Systemic-risk detection and the BUY override.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{Action, ModuleId, OrchestratedDecision, StrategySignal};

/// Result of [`detect_systemic_risk`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemicRisk {
    pub detected: bool,
    /// Distinct modules that voted SELL.
    pub sellers: BTreeSet<ModuleId>,
    pub threshold: usize,
}

impl SystemicRisk {
    #[must_use]
    pub fn sell_count(&self) -> usize {
        self.sellers.len()
    }

    /// Human-readable reason attached to overridden decisions.
    #[must_use]
    pub fn reason(&self) -> String {
        format!(
            "systemic risk: {} modules signalled SELL (threshold {})",
            self.sell_count(),
            self.threshold
        )
    }
}

/// Flag systemic risk when at least `threshold` distinct modules say SELL.
///
/// Neutral signals standing in for failed modules do not count.
#[must_use]
pub fn detect_systemic_risk(
    signals: &BTreeMap<ModuleId, StrategySignal>,
    threshold: usize,
) -> SystemicRisk {
    let sellers: BTreeSet<ModuleId> = signals
        .values()
        .filter(|s| s.action == Action::Sell && !s.is_error())
        .map(|s| s.module_id.clone())
        .collect();
    SystemicRisk {
        detected: threshold > 0 && sellers.len() >= threshold,
        sellers,
        threshold,
    }
}

/// Rewrite every BUY into HOLD with zero confidence.
///
/// SELL, HOLD and CLOSE_ALL pass through. Returns how many decisions were
/// overridden; a no-op when `risk` is not detected.
pub fn apply_override(decisions: &mut [OrchestratedDecision], risk: &SystemicRisk) -> usize {
    if !risk.detected {
        return 0;
    }
    let reason = risk.reason();
    let mut overridden = 0;
    for decision in decisions
        .iter_mut()
        .filter(|d| d.signal.action == Action::Buy)
    {
        decision.signal.action = Action::Hold;
        decision.signal.confidence = 0.0;
        decision.overridden = true;
        decision.override_reason = Some(reason.clone());
        overridden += 1;
    }
    overridden
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetClass, Symbol};
    use rust_decimal_macros::dec;

    fn signal(module: &str, action: Action) -> StrategySignal {
        StrategySignal::new(
            ModuleId::from(module),
            action,
            Symbol::from("SPY"),
            0.8,
            dec!(0.1),
            "test",
            AssetClass::Equity,
        )
    }

    fn signals(actions: &[(&str, Action)]) -> BTreeMap<ModuleId, StrategySignal> {
        actions
            .iter()
            .map(|(m, a)| (ModuleId::from(*m), signal(m, *a)))
            .collect()
    }

    #[test]
    fn three_sells_trigger_override_of_every_buy() {
        let signals = signals(&[
            ("a", Action::Sell),
            ("b", Action::Sell),
            ("c", Action::Sell),
            ("d", Action::Buy),
            ("e", Action::Buy),
            ("f", Action::CloseAll),
        ]);
        let risk = detect_systemic_risk(&signals, 3);
        assert!(risk.detected);
        assert_eq!(risk.sell_count(), 3);

        let mut decisions: Vec<_> = signals
            .values()
            .cloned()
            .map(|s| OrchestratedDecision::unsigned(s, 0.2))
            .collect();
        assert_eq!(apply_override(&mut decisions, &risk), 2);

        for d in &decisions {
            assert_ne!(d.signal.action, Action::Buy);
            if d.overridden {
                assert_eq!(d.signal.action, Action::Hold);
                assert_eq!(d.signal.confidence, 0.0);
                assert!(!d.override_reason.as_deref().unwrap_or_default().is_empty());
            }
        }
        let close_all = decisions
            .iter()
            .find(|d| d.signal.module_id == ModuleId::from("f"))
            .unwrap();
        assert_eq!(close_all.signal.action, Action::CloseAll);
        assert!(!close_all.overridden);
    }

    #[test]
    fn two_sells_do_not_trigger() {
        let signals = signals(&[("a", Action::Sell), ("b", Action::Sell), ("c", Action::Buy)]);
        let risk = detect_systemic_risk(&signals, 3);
        assert!(!risk.detected);

        let mut decisions: Vec<_> = signals
            .values()
            .cloned()
            .map(|s| OrchestratedDecision::unsigned(s, 0.3))
            .collect();
        assert_eq!(apply_override(&mut decisions, &risk), 0);
        assert!(decisions.iter().any(|d| d.signal.action == Action::Buy));
    }

    #[test]
    fn failed_modules_do_not_count_as_sellers() {
        let mut signals = signals(&[("a", Action::Sell), ("b", Action::Sell)]);
        let mut failed = signal("c", Action::Sell);
        failed.error = Some("boom".into());
        signals.insert(ModuleId::from("c"), failed);
        assert!(!detect_systemic_risk(&signals, 3).detected);
    }
}
