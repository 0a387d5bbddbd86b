//! Broker port for order submission and account queries.
//!
//! The broker is an opaque external system. Implementations retry transient
//! transport failures of a single call at most; they never resubmit an
//! intent on their own.

use async_trait::async_trait;

use crate::domain::{AccountSnapshot, BrokerOrder, IntentId, OpenOrder, OrderRequest, Position};
use crate::error::BrokerError;

/// Execution API of one brokerage account.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Current equity, buying power, positions and open orders.
    async fn account(&self) -> Result<AccountSnapshot, BrokerError>;

    /// Submit an order. `client_order_id` is the idempotency key: submitting
    /// the same id twice returns the original order.
    async fn submit_order(&self, order: &OrderRequest) -> Result<BrokerOrder, BrokerError>;

    /// Look an order up by its client order id.
    async fn find_order(&self, intent_id: &IntentId) -> Result<Option<BrokerOrder>, BrokerError>;

    /// Cancel every open order. Returns the number canceled.
    async fn cancel_all_orders(&self) -> Result<usize, BrokerError>;

    /// Close every position at market. Returns the number closed.
    async fn close_all_positions(&self) -> Result<usize, BrokerError>;

    async fn list_positions(&self) -> Result<Vec<Position>, BrokerError>;

    async fn list_open_orders(&self) -> Result<Vec<OpenOrder>, BrokerError>;

    /// Broker name for logging.
    fn name(&self) -> &'static str;
}
