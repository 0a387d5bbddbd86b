//! Implementations of ports (hexagonal adapters).
//!
//! - [`inbound`] - Driving side: the operator CLI
//! - [`outbound`] - Driven side: brokers, stores, identity, notifiers

pub mod inbound;
pub mod outbound;
