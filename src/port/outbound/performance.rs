//! Performance store port.

use async_trait::async_trait;

use crate::domain::{ModuleId, PerformanceRecord};
use crate::error::Result;

/// Append-only history of per-module PnL.
#[async_trait]
pub trait PerformanceStore: Send + Sync {
    async fn append(&self, record: &PerformanceRecord) -> Result<()>;

    /// The most recent `lookback` records for a module, oldest first.
    async fn recent(&self, module_id: &ModuleId, lookback: usize)
        -> Result<Vec<PerformanceRecord>>;
}
