//! Versioned risk state persistence.
//!
//! Both the per-account [`RiskState`] and the global [`ControlState`] are
//! written with compare-and-swap on their `version`, so a halt written by one
//! worker is never silently overwritten by another, and readers always see
//! the latest persisted value.

use async_trait::async_trait;

use crate::domain::{AccountId, ControlState, RiskState};
use crate::error::Result;

#[async_trait]
pub trait RiskStateStore: Send + Sync {
    /// Latest persisted state for an account, `None` if never written.
    async fn load(&self, account_id: &AccountId) -> Result<Option<RiskState>>;

    /// Persist `state` if the stored version equals `expected_version`
    /// (0 = not yet stored). On success the stored version becomes
    /// `expected_version + 1`; returns `false` on a version conflict.
    async fn compare_and_swap(&self, expected_version: u64, state: &RiskState) -> Result<bool>;

    /// All persisted account states.
    async fn list(&self) -> Result<Vec<RiskState>>;

    /// Global kill switch (default: not halted, version 0).
    async fn load_control(&self) -> Result<ControlState>;

    /// Persist the kill switch with the same compare-and-swap contract.
    async fn swap_control(&self, expected_version: u64, control: &ControlState) -> Result<bool>;
}
