//! Cost-aware, crash-recoverable order routing.
//!
//! - [`cost`]: spread check and slippage estimate
//! - [`builder`]: quantity and limit price
//! - [`ExecutionRouter`]: verify, ledger, submit, merge
//! - [`ReconcileReport`]: recovery of PENDING intents

pub mod builder;
pub mod cost;
mod reconcile;
mod router;

use std::time::Duration;

use rust_decimal::Decimal;

pub use cost::CostAnalysis;
pub use reconcile::ReconcileReport;
pub use router::{ExecutionRouter, RouterDeps};

/// Tunables of the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSettings {
    /// Widest relative spread still executed (0.001 = 10 bps).
    pub max_spread_pct: Decimal,
    /// Marketable-limit buffer applied to the touch.
    pub limit_buffer_pct: Decimal,
    /// Bound on each broker call. No retries.
    pub broker_timeout: Duration,
    /// Age after which a PENDING entry is reconciled.
    pub pending_timeout: chrono::Duration,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            max_spread_pct: Decimal::new(1, 3),
            limit_buffer_pct: Decimal::new(5, 3),
            broker_timeout: Duration::from_millis(5_000),
            pending_timeout: chrono::Duration::seconds(60),
        }
    }
}
