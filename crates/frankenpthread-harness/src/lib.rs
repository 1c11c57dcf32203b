//! Stress harness for frankenpthread.
//!
//! This crate provides:
//! - Scenarios: contention, rendezvous, run-once and handoff workloads run on
//!   threads created through the library itself
//! - Evidence: one JSONL log line per scenario through the core log sink
//! - Reports: a machine-readable JSON summary of every run

#![forbid(unsafe_code)]

pub mod report;
pub mod scenario;

pub use report::{RunSummary, ScenarioReport};
pub use scenario::{Scenario, ScenarioParams};

use frankenpthread_core::PthreadError;

/// Failure to run a scenario or write its evidence.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("primitive failed: {0}")]
    Primitive(#[from] PthreadError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid parameters: {0}")]
    Params(String),
}
