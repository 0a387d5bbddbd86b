//! Builders for domain primitives used across tests.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use crate::domain::{
    AccountId, AccountSnapshot, Action, AssetClass, ModuleId, PerformanceRecord, Position, Quote,
    StrategySignal, Symbol,
};

/// Equity signal from `module` on `symbol`.
pub fn signal(
    module: &str,
    symbol: &str,
    action: Action,
    confidence: f64,
    allocation: Decimal,
) -> StrategySignal {
    StrategySignal::new(
        ModuleId::from(module),
        action,
        Symbol::from(symbol),
        confidence,
        allocation,
        format!("{module} says {action}"),
        AssetClass::Equity,
    )
}

/// Quote with the given touch.
pub fn quote(bid: Decimal, ask: Decimal) -> Quote {
    Quote::new(bid, ask)
}

/// Flat account with `equity` in cash.
pub fn account(id: &str, equity: Decimal) -> AccountSnapshot {
    AccountSnapshot {
        account_id: AccountId::from(id),
        equity,
        buying_power: equity,
        positions: Vec::new(),
        open_orders: Vec::new(),
    }
}

/// Long or short position marked at `price`.
pub fn position(symbol: &str, quantity: Decimal, price: Decimal) -> Position {
    Position {
        symbol: Symbol::from(symbol),
        quantity,
        average_price: price,
        market_price: price,
        asset_class: AssetClass::Equity,
    }
}

/// Daily records for `module`, oldest first, ending now.
pub fn performance_series(module: &str, pnls: &[Decimal]) -> Vec<PerformanceRecord> {
    let now = Utc::now();
    let n = i64::try_from(pnls.len()).unwrap_or(i64::MAX);
    pnls.iter()
        .zip(0_i64..)
        .map(|(pnl, i)| {
            let end = now - Duration::days(n - 1 - i);
            PerformanceRecord {
                module_id: ModuleId::from(module),
                period_start: end - Duration::days(1),
                period_end: end,
                realized_pnl: *pnl,
                unrealized_pnl: Decimal::ZERO,
            }
        })
        .collect()
}

/// Steady gains with little variance: classifies ACTIVE under default settings.
pub fn strong_history(module: &str) -> Vec<PerformanceRecord> {
    let pnls: Vec<Decimal> = (0..20)
        .map(|i| Decimal::from(if i % 2 == 0 { 900 } else { 1_100 }))
        .collect();
    performance_series(module, &pnls)
}

/// Zero-mean noise: classifies SHADOW under default settings.
pub fn weak_history(module: &str) -> Vec<PerformanceRecord> {
    let pnls: Vec<Decimal> = (0..20)
        .map(|i| Decimal::from(if i % 2 == 0 { 500 } else { -500 }))
        .collect();
    performance_series(module, &pnls)
}
