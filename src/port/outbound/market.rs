//! Market data port. Read-only input.

use async_trait::async_trait;

use crate::domain::{AssetClass, Quote, RegimeSnapshot, Symbol};
use crate::error::DataUnavailable;

/// Source of quotes and regime data.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn get_quote(
        &self,
        symbol: &Symbol,
        asset_class: AssetClass,
    ) -> Result<Quote, DataUnavailable>;

    async fn get_regime_snapshot(&self) -> Result<RegimeSnapshot, DataUnavailable>;
}
