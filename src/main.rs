//! Waterfall test runner CLI
//!
//! Runs test files one at a time through an external test runner (mocha by
//! default), restarting failing files up to a configured limit.

use std::io::Write;

use clap::Parser;
use waterfall::commands::Commands;
use waterfall::{cli, common::logging};

#[derive(Parser)]
#[command(name = "waterfall", about = "Run test files one after another")]
#[command(version, long_about = None)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_cli(cli.verbose);

    let code = match cli::dispatch(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            1
        }
    };

    let _ = std::io::stdout().flush();
    std::process::exit(code);
}
