//! Paper-trading broker.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::prelude::Signed;
use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::{
    AccountId, AccountSnapshot, BrokerOrder, BrokerOrderId, BrokerOrderStatus, IntentId,
    OpenOrder, OrderRequest, OrderType, Position, Symbol,
};
use crate::error::BrokerError;
use crate::port::Broker;

/// How submitted limit orders behave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FillMode {
    /// Fill in full at the limit price.
    #[default]
    Immediate,
    /// Rest as open orders until canceled.
    Resting,
}

/// Scripted failure for the next submission.
#[derive(Debug, Clone)]
enum Fault {
    /// Refuse before the order is recorded.
    Before(BrokerError),
    /// Record the order, then lose the acknowledgement.
    LostAck(BrokerError),
}

struct PaperState {
    cash: Decimal,
    positions: HashMap<Symbol, Position>,
    orders: HashMap<IntentId, BrokerOrder>,
    open: Vec<OpenOrder>,
    next_order: u64,
    faults: VecDeque<Fault>,
    submissions: usize,
}

/// In-memory broker that dedupes by client order id.
///
/// Submitting the same intent id twice returns the original order, so an
/// intent can never produce two broker orders.
pub struct PaperBroker {
    account_id: AccountId,
    fill_mode: FillMode,
    latency: Mutex<Option<Duration>>,
    state: Mutex<PaperState>,
}

impl PaperBroker {
    #[must_use]
    pub fn new(account_id: AccountId, starting_cash: Decimal) -> Self {
        Self::with_fill_mode(account_id, starting_cash, FillMode::Immediate)
    }

    #[must_use]
    pub fn with_fill_mode(account_id: AccountId, starting_cash: Decimal, fill_mode: FillMode) -> Self {
        Self {
            account_id,
            fill_mode,
            latency: Mutex::new(None),
            state: Mutex::new(PaperState {
                cash: starting_cash,
                positions: HashMap::new(),
                orders: HashMap::new(),
                open: Vec::new(),
                next_order: 1,
                faults: VecDeque::new(),
                submissions: 0,
            }),
        }
    }

    /// Set the cash balance, e.g. to simulate PnL.
    pub fn set_cash(&self, cash: Decimal) {
        self.state.lock().cash = cash;
    }

    /// Seed or replace a position.
    pub fn set_position(&self, position: Position) {
        self.state
            .lock()
            .positions
            .insert(position.symbol.clone(), position);
    }

    /// Mark an existing position to a new market price.
    pub fn mark(&self, symbol: &Symbol, price: Decimal) {
        if let Some(position) = self.state.lock().positions.get_mut(symbol) {
            position.market_price = price;
        }
    }

    /// Delay every submission and order lookup by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock() = latency;
    }

    /// Fail the next submission without recording the order.
    pub fn fail_next(&self, error: BrokerError) {
        self.state.lock().faults.push_back(Fault::Before(error));
    }

    /// Record the next order but report `error` to the caller.
    pub fn lose_next_ack(&self, error: BrokerError) {
        self.state.lock().faults.push_back(Fault::LostAck(error));
    }

    /// Submission calls received, including duplicates and failures.
    #[must_use]
    pub fn submissions(&self) -> usize {
        self.state.lock().submissions
    }

    /// Distinct orders recorded.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.state.lock().orders.len()
    }

    async fn delay(&self) {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn fill_price(state: &PaperState, request: &OrderRequest) -> Option<Decimal> {
        match request.order_type {
            OrderType::Limit(price) => Some(price),
            OrderType::Market => state
                .positions
                .get(&request.symbol)
                .map(|p| p.market_price)
                .filter(|p| *p > Decimal::ZERO),
        }
    }

    fn apply_fill(state: &mut PaperState, request: &OrderRequest, price: Decimal) {
        let signed = request.quantity * request.side.sign();
        state.cash -= signed * price;
        let position = state
            .positions
            .entry(request.symbol.clone())
            .or_insert_with(|| Position {
                symbol: request.symbol.clone(),
                quantity: Decimal::ZERO,
                average_price: price,
                market_price: price,
                asset_class: request.asset_class,
            });
        let new_quantity = position.quantity + signed;
        if !new_quantity.is_zero() && position.quantity.signum() == signed.signum() {
            position.average_price = (position.average_price * position.quantity.abs()
                + price * request.quantity)
                / new_quantity.abs();
        } else if position.quantity.is_zero() || new_quantity.signum() != position.quantity.signum() {
            position.average_price = price;
        }
        position.quantity = new_quantity;
        position.market_price = price;
        if position.quantity.is_zero() {
            state.positions.remove(&request.symbol);
        }
    }

    fn record(&self, state: &mut PaperState, request: &OrderRequest) -> BrokerOrder {
        let broker_order_id = BrokerOrderId::new(format!("paper-{}-{}", self.account_id, state.next_order));
        state.next_order += 1;

        let fill = match (self.fill_mode, request.order_type) {
            (_, OrderType::Market) | (FillMode::Immediate, OrderType::Limit(_)) => {
                Self::fill_price(state, request)
            }
            (FillMode::Resting, OrderType::Limit(_)) => None,
        };

        let order = if let Some(price) = fill {
            Self::apply_fill(state, request, price);
            BrokerOrder {
                broker_order_id,
                client_order_id: request.client_order_id.clone(),
                symbol: request.symbol.clone(),
                side: request.side,
                quantity: request.quantity,
                filled_quantity: request.quantity,
                average_price: Some(price),
                status: BrokerOrderStatus::Filled,
                received_at: Utc::now(),
            }
        } else if request.order_type == OrderType::Market {
            BrokerOrder {
                broker_order_id,
                client_order_id: request.client_order_id.clone(),
                symbol: request.symbol.clone(),
                side: request.side,
                quantity: request.quantity,
                filled_quantity: Decimal::ZERO,
                average_price: None,
                status: BrokerOrderStatus::Rejected,
                received_at: Utc::now(),
            }
        } else {
            state.open.push(OpenOrder {
                broker_order_id: broker_order_id.clone(),
                client_order_id: request.client_order_id.clone(),
                symbol: request.symbol.clone(),
                side: request.side,
                quantity: request.quantity,
            });
            BrokerOrder {
                broker_order_id,
                client_order_id: request.client_order_id.clone(),
                symbol: request.symbol.clone(),
                side: request.side,
                quantity: request.quantity,
                filled_quantity: Decimal::ZERO,
                average_price: None,
                status: BrokerOrderStatus::Accepted,
                received_at: Utc::now(),
            }
        };
        state
            .orders
            .insert(request.client_order_id.clone(), order.clone());
        order
    }
}

#[async_trait]
impl Broker for PaperBroker {
    async fn account(&self) -> Result<AccountSnapshot, BrokerError> {
        let state = self.state.lock();
        let positions: Vec<Position> = state.positions.values().cloned().collect();
        let market_value: Decimal = positions
            .iter()
            .map(|p| p.quantity * p.market_price)
            .sum();
        Ok(AccountSnapshot {
            account_id: self.account_id.clone(),
            equity: state.cash + market_value,
            buying_power: state.cash.max(Decimal::ZERO),
            positions,
            open_orders: state.open.clone(),
        })
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<BrokerOrder, BrokerError> {
        self.delay().await;

        let mut state = self.state.lock();
        state.submissions += 1;

        if let Some(existing) = state.orders.get(&order.client_order_id) {
            debug!(intent = %order.client_order_id, "Duplicate submission, returning original order");
            return Ok(existing.clone());
        }

        match state.faults.pop_front() {
            Some(Fault::Before(error)) => Err(error),
            Some(Fault::LostAck(error)) => {
                self.record(&mut state, order);
                Err(error)
            }
            None => Ok(self.record(&mut state, order)),
        }
    }

    async fn find_order(&self, intent_id: &IntentId) -> Result<Option<BrokerOrder>, BrokerError> {
        self.delay().await;
        Ok(self.state.lock().orders.get(intent_id).cloned())
    }

    async fn cancel_all_orders(&self) -> Result<usize, BrokerError> {
        let mut state = self.state.lock();
        let open = std::mem::take(&mut state.open);
        for order in &open {
            if let Some(recorded) = state.orders.get_mut(&order.client_order_id) {
                recorded.status = BrokerOrderStatus::Canceled;
            }
        }
        Ok(open.len())
    }

    async fn close_all_positions(&self) -> Result<usize, BrokerError> {
        let mut state = self.state.lock();
        let positions: Vec<Position> = state.positions.drain().map(|(_, p)| p).collect();
        for position in &positions {
            state.cash += position.quantity * position.market_price;
        }
        Ok(positions.len())
    }

    async fn list_positions(&self) -> Result<Vec<Position>, BrokerError> {
        Ok(self.state.lock().positions.values().cloned().collect())
    }

    async fn list_open_orders(&self) -> Result<Vec<OpenOrder>, BrokerError> {
        Ok(self.state.lock().open.clone())
    }

    fn name(&self) -> &'static str {
        "paper"
    }
}
