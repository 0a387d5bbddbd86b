//! Transaction-cost analysis: execute now or wait for a tighter spread.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{Quote, RoutingDecision};
use crate::error::DataUnavailable;

/// Outcome of [`analyze_quote`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostAnalysis {
    pub should_execute: bool,
    pub reason: String,
    /// Half the relative spread.
    pub estimated_slippage: Decimal,
    pub spread_pct: Decimal,
    pub quote: Quote,
}

impl CostAnalysis {
    #[must_use]
    pub const fn routing_decision(&self) -> RoutingDecision {
        if self.should_execute {
            RoutingDecision::Execute
        } else {
            RoutingDecision::Wait
        }
    }
}

/// Decide whether the quote is cheap enough to trade against.
///
/// A spread strictly wider than `max_spread_pct` defers the trade; a spread
/// exactly at the limit executes.
///
/// # Errors
/// Returns [`DataUnavailable`] for non-positive or crossed quotes.
pub fn analyze_quote(
    quote: &Quote,
    max_spread_pct: Decimal,
) -> Result<CostAnalysis, DataUnavailable> {
    quote.validate()?;
    let spread_pct = quote.spread_pct();
    let estimated_slippage = spread_pct / Decimal::TWO;
    let spread_bps = (spread_pct * Decimal::from(10_000)).round_dp(2);
    let limit_bps = (max_spread_pct * Decimal::from(10_000)).round_dp(2);

    let (should_execute, reason) = if spread_pct > max_spread_pct {
        (
            false,
            format!("spread {spread_bps} bps is wider than {limit_bps} bps, waiting"),
        )
    } else {
        (
            true,
            format!("spread {spread_bps} bps within {limit_bps} bps"),
        )
    };

    Ok(CostAnalysis {
        should_execute,
        reason,
        estimated_slippage,
        spread_pct,
        quote: *quote,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn tight_spread_executes() {
        let analysis = analyze_quote(&Quote::new(dec!(99.99), dec!(100.01)), dec!(0.001)).unwrap();
        assert!(analysis.should_execute);
        assert_eq!(analysis.spread_pct, dec!(0.0002));
        assert_eq!(analysis.estimated_slippage, dec!(0.0001));
        assert_eq!(analysis.routing_decision(), RoutingDecision::Execute);
    }

    #[test]
    fn wide_spread_waits() {
        let analysis = analyze_quote(&Quote::new(dec!(99), dec!(101)), dec!(0.001)).unwrap();
        assert!(!analysis.should_execute);
        assert_eq!(analysis.routing_decision(), RoutingDecision::Wait);
        assert!(analysis.reason.contains("waiting"));
    }

    #[test]
    fn spread_exactly_at_limit_executes() {
        // (100.05 - 99.95) / 100 = 0.001
        let analysis = analyze_quote(&Quote::new(dec!(99.95), dec!(100.05)), dec!(0.001)).unwrap();
        assert_eq!(analysis.spread_pct, dec!(0.001));
        assert!(analysis.should_execute);
    }

    #[test]
    fn crossed_quote_is_unavailable() {
        assert!(analyze_quote(&Quote::new(dec!(101), dec!(100)), dec!(0.001)).is_err());
        assert!(analyze_quote(&Quote::new(dec!(0), dec!(100)), dec!(0.001)).is_err());
    }
}
