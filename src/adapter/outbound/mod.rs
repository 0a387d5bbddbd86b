//! Outbound adapters (driven side).

pub mod identity;
pub mod memory;
pub mod notifier;
pub mod paper;
pub mod sqlite;
