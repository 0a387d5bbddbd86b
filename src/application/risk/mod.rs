//! Capital-safety layer.
//!
//! Provides the drawdown circuit breaker, the global kill switch, pre-trade
//! limit checks and emergency liquidation.

mod gate;
mod limits;

pub use gate::{LiquidationReport, RiskGate};
pub use limits::RiskLimits;
