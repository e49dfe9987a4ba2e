//! Test runner invocation
//!
//! Builds the argument list for the external test runner and drives one
//! child process per test file.

pub mod flags;
mod process;

pub use flags::{build_args, normalize_flags};
pub use process::{ProcessOutcome, ProcessRunner, RunnerCommand, TestProcess};
