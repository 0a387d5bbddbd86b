//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the external collaborators of the pipeline:
//! broker, market data, key service, stores and alert sinks.

pub mod broker;
pub mod identity;
pub mod ledger;
pub mod market;
pub mod notifier;
pub mod performance;
pub mod risk_store;
