//! Durable execution ledger port.

use async_trait::async_trait;

use crate::domain::{IntentId, LedgerEntry, LedgerStatus, LedgerUpdate};
use crate::error::Result;

/// Append-only store of [`LedgerEntry`] records keyed by intent id.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert the entry unless one already exists for its intent id.
    ///
    /// Idempotent: retrying the same write is harmless. Returns the stored
    /// entry, which is the pre-existing one on a duplicate write.
    async fn create(&self, entry: &LedgerEntry) -> Result<LedgerEntry>;

    /// Merge a status transition into an existing entry.
    ///
    /// Returns the entry after the merge, or `None` if no entry exists.
    /// Transitions out of a non-PENDING status are ignored.
    async fn merge(&self, intent_id: &IntentId, update: &LedgerUpdate)
        -> Result<Option<LedgerEntry>>;

    async fn get(&self, intent_id: &IntentId) -> Result<Option<LedgerEntry>>;

    /// All entries with the given status, oldest first.
    async fn by_status(&self, status: LedgerStatus) -> Result<Vec<LedgerEntry>>;
}
