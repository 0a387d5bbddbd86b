//! In-memory risk state store.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{AccountId, ControlState, RiskState};
use crate::error::Result;
use crate::port::RiskStateStore;

/// Versioned risk state held in process memory.
#[derive(Default)]
pub struct MemoryRiskStore {
    states: Mutex<HashMap<AccountId, RiskState>>,
    control: Mutex<ControlState>,
}

impl MemoryRiskStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RiskStateStore for MemoryRiskStore {
    async fn load(&self, account_id: &AccountId) -> Result<Option<RiskState>> {
        Ok(self.states.lock().get(account_id).cloned())
    }

    async fn compare_and_swap(&self, expected_version: u64, state: &RiskState) -> Result<bool> {
        let mut states = self.states.lock();
        let current = states.get(&state.account_id).map_or(0, |s| s.version);
        if current != expected_version {
            return Ok(false);
        }
        let mut stored = state.clone();
        stored.version = expected_version + 1;
        states.insert(stored.account_id.clone(), stored);
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<RiskState>> {
        let mut states: Vec<RiskState> = self.states.lock().values().cloned().collect();
        states.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        Ok(states)
    }

    async fn load_control(&self) -> Result<ControlState> {
        Ok(self.control.lock().clone())
    }

    async fn swap_control(&self, expected_version: u64, control: &ControlState) -> Result<bool> {
        let mut current = self.control.lock();
        if current.version != expected_version {
            return Ok(false);
        }
        *current = ControlState {
            version: expected_version + 1,
            ..control.clone()
        };
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let store = MemoryRiskStore::new();
        let state = RiskState::new(AccountId::from("a"), dec!(100));
        assert!(store.compare_and_swap(0, &state).await.unwrap());
        assert!(!store.compare_and_swap(0, &state).await.unwrap());
        assert!(store.compare_and_swap(1, &state).await.unwrap());

        let loaded = store.load(&AccountId::from("a")).await.unwrap().unwrap();
        assert_eq!(loaded.version, 2);
    }

    #[tokio::test]
    async fn control_defaults_to_running() {
        let store = MemoryRiskStore::new();
        let control = store.load_control().await.unwrap();
        assert!(!control.halted);
        assert_eq!(control.version, 0);

        let halted = ControlState {
            halted: true,
            reason: Some("test".into()),
            ..control
        };
        assert!(store.swap_control(0, &halted).await.unwrap());
        assert!(store.load_control().await.unwrap().halted);
    }
}
