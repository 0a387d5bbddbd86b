//! Inbound (driving) ports consumed by inbound adapters.
//!
//! - [`risk`]: Pre-trade verdict types returned by the risk gate

pub mod risk;
