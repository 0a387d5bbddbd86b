//! Simulated broker and scripted market data.
//!
//! Lets the full pipeline run without a live venue: orders fill against the
//! configured quotes and positions are tracked in memory.

mod broker;
mod market;

pub use broker::{FillMode, PaperBroker};
pub use market::ScriptedMarketData;
