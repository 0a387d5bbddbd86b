//! In-memory performance history.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{ModuleId, PerformanceRecord};
use crate::error::Result;
use crate::port::PerformanceStore;

#[derive(Default)]
pub struct MemoryPerformanceStore {
    records: RwLock<Vec<PerformanceRecord>>,
}

impl MemoryPerformanceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PerformanceStore for MemoryPerformanceStore {
    async fn append(&self, record: &PerformanceRecord) -> Result<()> {
        self.records.write().push(record.clone());
        Ok(())
    }

    async fn recent(
        &self,
        module_id: &ModuleId,
        lookback: usize,
    ) -> Result<Vec<PerformanceRecord>> {
        let mut records: Vec<PerformanceRecord> = self
            .records
            .read()
            .iter()
            .filter(|r| &r.module_id == module_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.period_end);
        let skip = records.len().saturating_sub(lookback);
        Ok(records.split_off(skip))
    }
}
