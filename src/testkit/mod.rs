//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`domain`] - Builders for signals, quotes, accounts and performance history.
//! - [`module`] - `ScriptedModule`, a decision module with scripted behavior.
//! - [`notifier`] - `RecordingNotifier` for event assertions.
//! - [`store`] - `FaultyRiskStore`, a risk store that can fail or hang.
//! - [`harness`] - A fully wired single-account pipeline over in-memory stores.

pub mod domain;
pub mod harness;
pub mod module;
pub mod notifier;
pub mod store;
