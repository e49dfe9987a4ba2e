//! CLI command handling
//!
//! Merges command-line options over the config file and runs the waterfall.

use std::path::Path;
use std::time::Duration;

use crate::commands::{Commands, RunArgs};
use crate::common::config::Config;
use crate::common::{paths, Result};
use crate::runner::{ProcessRunner, RunnerCommand};
use crate::waterfall::{Waterfall, WaterfallOptions};

/// Dispatch a CLI command, returning the process exit status
pub async fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Run(args) => run(args).await,
        Commands::Config { config } => {
            show_config(config.as_deref())?;
            Ok(0)
        }
    }
}

async fn run(args: RunArgs) -> Result<i32> {
    let config = apply_overrides(&args, load_config(args.config.as_deref())?);

    let options = WaterfallOptions::builder()
        .filenames(args.files)
        .fail_on_stderr(config.run.fail_on_stderr)
        .bail(config.run.bail)
        .max_restarts(config.run.max_restarts)
        .flags(config.run.flags)
        .build()?;

    let runner = ProcessRunner::new(RunnerCommand::from_config(&config.runner))
        .with_timeout(config.run.file_timeout_secs.map(Duration::from_secs));
    tracing::debug!(
        program = %runner.command().program.display(),
        interpreter = ?runner.command().interpreter,
        "Resolved test runner"
    );

    let mut stdout = std::io::stdout();
    let report = Waterfall::new(options, runner).execute(&mut stdout).await?;
    Ok(report.exit_code())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Layer command-line options over the loaded configuration
fn apply_overrides(args: &RunArgs, mut config: Config) -> Config {
    if args.fail_on_stderr {
        config.run.fail_on_stderr = true;
    }
    if args.allow_stderr {
        config.run.fail_on_stderr = false;
    }
    if args.bail {
        config.run.bail = true;
    }
    if let Some(max_restarts) = args.max_restarts {
        config.run.max_restarts = max_restarts;
    }
    config.run.flags.extend(args.flags.iter().cloned());
    if let Some(timeout) = args.timeout {
        config.run.file_timeout_secs = Some(timeout);
    }

    if let Some(program) = &args.runner {
        config.runner.program = program.clone();
    }
    if let Some(dir) = &args.runner_dir {
        config.runner.dir = Some(dir.clone());
    }
    if let Some(interpreter) = &args.interpreter {
        config.runner.interpreter = Some(interpreter.clone());
    }

    config
}

fn show_config(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;

    match path.map(Path::to_path_buf).or_else(paths::config_path) {
        Some(path) if path.exists() => println!("Config file: {}", path.display()),
        Some(path) => println!("Config file: {} (not found, using defaults)", path.display()),
        None => println!("Config file: none (using defaults)"),
    }
    println!();
    print!("{}", config.to_toml()?);

    Ok(())
}
