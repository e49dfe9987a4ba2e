//! Sequential test file execution
//!
//! [`Waterfall`] pops one file at a time off the queue in
//! [`WaterfallOptions`], runs it through a [`TestProcess`](crate::runner::TestProcess),
//! and restarts it on failure up to the configured budget.

mod controller;
mod options;
mod report;

pub use controller::Waterfall;
pub use options::{WaterfallOptions, WaterfallOptionsBuilder};
pub use report::{pretty_time, RestartTally, RunReport, RunStatus};
