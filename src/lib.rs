//! Waterfall test runner
//!
//! Runs a list of test files strictly one at a time, each in its own
//! test runner process, and restarts failing files up to a bounded count.

pub mod cli;
pub mod commands;
pub mod common;
pub mod runner;
pub mod waterfall;

// Re-export commonly used types
pub use common::{Error, Result};
pub use runner::{ProcessOutcome, ProcessRunner, RunnerCommand, TestProcess};
pub use waterfall::{RunReport, RunStatus, Waterfall, WaterfallOptions};
