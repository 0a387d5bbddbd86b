//! Infrastructure configuration modules.
//!
//! Each section deserializes with serde defaults and converts into the
//! matching application settings type.

pub mod account;
pub mod aggregator;
pub mod execution;
pub mod logging;
pub mod market;
pub mod registry;
pub mod risk;
pub mod settings;
pub mod telegram;

pub use settings::{Config, Storage};
