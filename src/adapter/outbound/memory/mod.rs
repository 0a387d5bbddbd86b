//! In-memory stores.
//!
//! Used by tests and by `storage = "memory"` deployments. Nothing survives a
//! restart.

mod ledger;
mod performance;
mod risk;

pub use ledger::MemoryLedger;
pub use performance::MemoryPerformanceStore;
pub use risk::MemoryRiskStore;
