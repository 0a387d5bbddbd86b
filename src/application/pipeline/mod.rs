//! Per-account cycle and the multi-account supervisor.

mod account;
mod supervisor;

pub use account::{AccountPipeline, CycleReport, SkippedDecision};
pub use supervisor::{AccountOutcome, Supervisor};
