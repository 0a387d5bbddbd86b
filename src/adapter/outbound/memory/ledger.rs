//! In-memory execution ledger.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::{IntentId, LedgerEntry, LedgerStatus, LedgerUpdate};
use crate::error::Result;
use crate::port::LedgerStore;

/// Ledger keyed by intent id.
#[derive(Default)]
pub struct MemoryLedger {
    entries: DashMap<IntentId, LedgerEntry>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn create(&self, entry: &LedgerEntry) -> Result<LedgerEntry> {
        let stored = self
            .entries
            .entry(entry.intent_id.clone())
            .or_insert_with(|| entry.clone());
        Ok(stored.value().clone())
    }

    async fn merge(
        &self,
        intent_id: &IntentId,
        update: &LedgerUpdate,
    ) -> Result<Option<LedgerEntry>> {
        Ok(self.entries.get_mut(intent_id).map(|mut entry| {
            update.apply_to(entry.value_mut());
            entry.value().clone()
        }))
    }

    async fn get(&self, intent_id: &IntentId) -> Result<Option<LedgerEntry>> {
        Ok(self.entries.get(intent_id).map(|e| e.value().clone()))
    }

    async fn by_status(&self, status: LedgerStatus) -> Result<Vec<LedgerEntry>> {
        let mut entries: Vec<LedgerEntry> = self
            .entries
            .iter()
            .filter(|e| e.status == status)
            .map(|e| e.value().clone())
            .collect();
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }
}
