//! Warden - multi-strategy signal orchestration with risk-gated execution.
//!
//! Independent decision modules each emit a signal per symbol. Their signals
//! are weighted by trailing risk-adjusted performance, merged into signed
//! master decisions, passed through a fail-closed risk gate, and routed to a
//! broker with a durable audit ledger written before every submission.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - [`domain`] - Signals, decisions, intents, ledger entries, risk state
//! - [`port`] - Traits for brokers, market data, stores, identity, notifiers
//! - [`application`] - The pipeline stages:
//!   - [`application::strategy`] - `StrategyRegistry` and decision modules
//!   - [`application::aggregator`] - `SignalAggregator`, weighting, consensus, signing
//!   - [`application::risk`] - `RiskGate`, circuit breaker and kill switch
//!   - [`application::execution`] - `ExecutionRouter`, cost analysis, reconciliation
//!   - [`application::pipeline`] - Per-account cycle and the `Supervisor`
//! - [`adapter`] - CLI, SQLite stores, in-memory stores, paper broker, Telegram
//! - [`infrastructure`] - Configuration and runtime wiring
//!
//! # Features
//!
//! - `telegram` - Telegram alert notifier (default)
//! - `testkit` - Test builders and scripted collaborators for integration tests

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
