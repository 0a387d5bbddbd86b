//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports define the extension points in the hexagonal architecture.
//! They are traits that adapters implement to integrate with external
//! systems (brokers, market data, key services, stores, alert sinks).
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!                    │                         │
//!     ┌──────────────┤  Domain + Port          ├──────────────┐
//!     │              │                         │              │
//!     │              └─────────────────────────┘              │
//!     │                         │                             │
//!     ▼                         ▼                             ▼
//! ┌─────────┐            ┌─────────────┐              ┌───────────┐
//! │ Broker  │            │   Stores    │              │ Notifier  │
//! │ Market  │            │ (ledger,    │              │ Identity  │
//! │ Adapter │            │  risk, pnl) │              │  Adapter  │
//! └─────────┘            └─────────────┘              └───────────┘
//! ```
//!
//! # Available Ports
//!
//! - [`outbound::broker::Broker`] - Order submission and account queries
//! - [`outbound::market::MarketDataProvider`] - Quotes and regime snapshots
//! - [`outbound::performance::PerformanceStore`] - Trailing module PnL
//! - [`outbound::ledger::LedgerStore`] - Durable execution audit ledger
//! - [`outbound::risk_store::RiskStateStore`] - Versioned risk state and kill switch
//! - [`outbound::identity::IdentityService`] - Signing and verification
//! - [`outbound::notifier::Notifier`] - Best-effort alert sink
//! - [`inbound::risk::PreTradeVerdict`] - Risk gate decisions

pub mod inbound;
pub mod outbound;

pub use inbound::risk::PreTradeVerdict;
pub use outbound::broker::Broker;
pub use outbound::identity::IdentityService;
pub use outbound::ledger::LedgerStore;
pub use outbound::market::MarketDataProvider;
pub use outbound::notifier::{Event, Notifier, NotifierRegistry};
pub use outbound::performance::PerformanceStore;
pub use outbound::risk_store::RiskStateStore;
