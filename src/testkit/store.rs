//! Risk state store that can be made to fail or hang on demand.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::adapter::outbound::memory::MemoryRiskStore;
use crate::domain::{AccountId, ControlState, RiskState};
use crate::error::{Error, Result};
use crate::port::RiskStateStore;

/// How every store call behaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreFault {
    #[default]
    Healthy,
    /// Every call returns a database error.
    Fail,
    /// Every call never completes.
    Hang,
}

/// [`MemoryRiskStore`] behind a switchable fault.
#[derive(Default)]
pub struct FaultyRiskStore {
    inner: MemoryRiskStore,
    fault: Mutex<StoreFault>,
}

impl FaultyRiskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fault(&self, fault: StoreFault) {
        *self.fault.lock() = fault;
    }

    async fn check(&self) -> Result<()> {
        let fault = *self.fault.lock();
        match fault {
            StoreFault::Healthy => Ok(()),
            StoreFault::Fail => Err(Error::Database("risk store offline".into())),
            StoreFault::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl RiskStateStore for FaultyRiskStore {
    async fn load(&self, account_id: &AccountId) -> Result<Option<RiskState>> {
        self.check().await?;
        self.inner.load(account_id).await
    }

    async fn compare_and_swap(&self, expected_version: u64, state: &RiskState) -> Result<bool> {
        self.check().await?;
        self.inner.compare_and_swap(expected_version, state).await
    }

    async fn list(&self) -> Result<Vec<RiskState>> {
        self.check().await?;
        self.inner.list().await
    }

    async fn load_control(&self) -> Result<ControlState> {
        self.check().await?;
        self.inner.load_control().await
    }

    async fn swap_control(&self, expected_version: u64, control: &ControlState) -> Result<bool> {
        self.check().await?;
        self.inner.swap_control(expected_version, control).await
    }
}
