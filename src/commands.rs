//! CLI command definitions
//!
//! Defines the clap commands for the waterfall CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run test files one after another
    Run(RunArgs),

    /// Show the config file location and the effective settings
    Config {
        /// Config file to read instead of the default location
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Options for `waterfall run`
///
/// Unset options fall back to the config file, then to built-in defaults.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Test files, run in the order given
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Treat any stderr output from a test file as a failure
    #[arg(long, overrides_with = "allow_stderr")]
    pub fail_on_stderr: bool,

    /// Accept stderr output when the exit code is 0 (overrides the config file)
    #[arg(long, overrides_with = "fail_on_stderr")]
    pub allow_stderr: bool,

    /// Pass --bail to the test runner
    #[arg(long)]
    pub bail: bool,

    /// Restarts allowed for each failing file
    #[arg(long, short = 'r')]
    pub max_restarts: Option<u32>,

    /// Extra flag for the test runner, `--` prefix optional
    /// Can be specified multiple times: --flag exit --flag reporter=dot
    #[arg(long = "flag", short = 'f', allow_hyphen_values = true)]
    pub flags: Vec<String>,

    /// Test runner executable (default: mocha)
    #[arg(long)]
    pub runner: Option<String>,

    /// Directory containing the test runner executable
    #[arg(long)]
    pub runner_dir: Option<PathBuf>,

    /// Interpreter used to launch the test runner
    #[arg(long)]
    pub interpreter: Option<PathBuf>,

    /// Kill a test file's process after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Config file to read instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,
}
