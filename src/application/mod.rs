//! Application services.
//!
//! - [`strategy`]: decision-module registry and concurrent evaluation
//! - [`aggregator`]: weighting, systemic override, consensus and signing
//! - [`risk`]: circuit breaker, kill switch and pre-trade checks
//! - [`execution`]: cost-aware routing, ledger and reconciliation
//! - [`pipeline`]: one cycle per account, supervised across accounts

pub mod aggregator;
pub mod execution;
pub mod pipeline;
pub mod risk;
pub mod strategy;
