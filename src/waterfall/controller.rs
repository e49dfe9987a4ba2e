//! Waterfall controller
//!
//! Runs the queued test files one at a time. A failing file is rerun in
//! place until it passes or its restart budget is spent; a spent budget
//! ends the whole run.

use std::io::Write;
use std::time::{Duration, Instant};

use colored::Colorize;

use crate::common::Result;
use crate::runner::{ProcessOutcome, TestProcess};

use super::options::WaterfallOptions;
use super::report::{pretty_time, rounded_secs, RestartTally, RunReport, RunStatus};

/// Mutable state of a single run
#[derive(Debug)]
struct RunState {
    /// Queue length, captured on the first step
    total: Option<usize>,
    position: usize,
    started: Instant,
    restarts: RestartTally,
}

impl RunState {
    fn new() -> Self {
        Self {
            total: None,
            position: 0,
            started: Instant::now(),
            restarts: RestartTally::new(),
        }
    }
}

/// Result of advancing the run by one file
enum Step {
    Advance,
    Finished(RunReport),
}

/// Drives one waterfall run
///
/// A controller is consumed by [`Waterfall::execute`]; build a new one for
/// every run.
pub struct Waterfall<P> {
    options: WaterfallOptions,
    runner: P,
    state: RunState,
}

impl<P: TestProcess> Waterfall<P> {
    pub fn new(options: WaterfallOptions, runner: P) -> Self {
        Self {
            options,
            runner,
            state: RunState::new(),
        }
    }

    /// Run every queued file, writing progress and child output to `out`
    pub async fn execute(mut self, out: &mut (dyn Write + Send)) -> Result<RunReport> {
        self.state.started = Instant::now();
        tracing::info!(
            files = self.options.filenames.len(),
            max_restarts = self.options.max_restarts,
            fail_on_stderr = self.options.fail_on_stderr,
            "Starting waterfall run"
        );

        loop {
            if let Step::Finished(report) = self.step(&mut *out).await? {
                return Ok(report);
            }
        }
    }

    /// Run the next file to completion, restarts included
    async fn step(&mut self, out: &mut (dyn Write + Send)) -> Result<Step> {
        let total = *self
            .state
            .total
            .get_or_insert(self.options.filenames.len());

        let Some(file) = self.options.filenames.pop_front() else {
            return self.finish(out).map(Step::Finished);
        };

        self.state.position += 1;
        let mut restarts = 0;
        writeln!(
            out,
            "{}",
            format!("{}/{}: {}", self.state.position, total, file).cyan()
        )?;

        loop {
            let attempt = self
                .runner
                .run(&file, self.options.bail, &self.options.flags, &mut *out)
                .await;

            let failure = match attempt {
                Ok(outcome) if !outcome.is_failure(self.options.fail_on_stderr) => None,
                Ok(outcome) => Some(failure_message(&outcome)),
                Err(e) if e.is_spawn_failure() => {
                    tracing::warn!(file = %file, error = %e, "Could not launch test runner");
                    Some(e.to_string())
                }
                Err(e) => return Err(e),
            };

            let Some(message) = failure else {
                writeln!(out, "{}\n", " OK".green())?;
                return Ok(Step::Advance);
            };

            writeln!(out, "{}", message.red())?;
            writeln!(out, "{}", format!("Test file: {file}").red())?;

            if restarts < self.options.max_restarts {
                restarts += 1;
                self.state.restarts.record(&file);
                tracing::info!(file = %file, attempt = restarts, "Restarting test file");
                writeln!(out, "{}", format!("Restart attempt #{restarts}").cyan())?;
                continue;
            }

            tracing::error!(file = %file, restarts, "Restart budget exhausted, aborting run");
            self.state.restarts.write_to(out)?;
            return Ok(Step::Finished(
                self.report(RunStatus::Aborted { file }, total),
            ));
        }
    }

    fn finish(&mut self, out: &mut (dyn Write + Send)) -> Result<RunReport> {
        let total = self.state.total.unwrap_or(0);
        let report = self.report(RunStatus::Passed, total);

        writeln!(
            out,
            "{}",
            format!("All passed ({})", pretty_time(rounded_secs(report.elapsed))).green()
        )?;
        self.state.restarts.write_to(out)?;
        Ok(report)
    }

    fn report(&self, status: RunStatus, total: usize) -> RunReport {
        RunReport {
            status,
            elapsed: self.elapsed(),
            files_run: self.state.position,
            total,
            restarts: self.state.restarts.clone(),
        }
    }

    fn elapsed(&self) -> Duration {
        self.state.started.elapsed()
    }
}

fn failure_message(outcome: &ProcessOutcome) -> String {
    if outcome.timed_out {
        return "Child process timed out".to_string();
    }
    match outcome.exit_code {
        Some(0) => "An error occurred.".to_string(),
        Some(code) => format!("Child process exited with code {code}"),
        None => "Child process was terminated by a signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::io;
    use std::sync::Mutex;

    /// What the fake runner does on one invocation
    #[derive(Debug, Clone, Copy)]
    enum Script {
        Exit(i32),
        ExitWithStderr(i32),
        Signal,
        SpawnError,
    }

    /// Test double that replays scripted outcomes per file
    ///
    /// Files without a script (or whose script ran out) exit 0.
    #[derive(Default)]
    struct ScriptedRunner {
        scripts: Mutex<HashMap<String, VecDeque<Script>>>,
        calls: Mutex<Vec<(String, bool, Vec<String>)>>,
    }

    impl ScriptedRunner {
        fn with(mut self, file: &str, script: &[Script]) -> Self {
            self.scripts
                .get_mut()
                .unwrap()
                .insert(file.to_string(), script.iter().copied().collect());
            self
        }

        fn calls_for(&self, file: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(f, _, _)| f == file)
                .count()
        }

        fn call_order(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(f, _, _)| f.clone())
                .collect()
        }
    }

    #[async_trait]
    impl TestProcess for ScriptedRunner {
        async fn run(
            &self,
            file: &str,
            bail: bool,
            flags: &[String],
            sink: &mut (dyn Write + Send),
        ) -> Result<ProcessOutcome> {
            self.calls
                .lock()
                .unwrap()
                .push((file.to_string(), bail, flags.to_vec()));

            let next = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(file)
                .and_then(VecDeque::pop_front)
                .unwrap_or(Script::Exit(0));

            writeln!(sink, "running {file}")?;
            match next {
                Script::Exit(code) => Ok(ProcessOutcome::exited(code, false)),
                Script::ExitWithStderr(code) => {
                    writeln!(sink, "warning from {file}")?;
                    Ok(ProcessOutcome::exited(code, true))
                }
                Script::Signal => Ok(ProcessOutcome::signaled(false)),
                Script::SpawnError => Err(Error::spawn_failed(
                    "mocha",
                    io::Error::new(io::ErrorKind::NotFound, "not found"),
                )),
            }
        }
    }

    fn options(files: &[&str], max_restarts: u32) -> WaterfallOptions {
        WaterfallOptions::builder()
            .filenames(files.iter().copied())
            .fail_on_stderr(false)
            .max_restarts(max_restarts)
            .build()
            .unwrap()
    }

    async fn run(options: WaterfallOptions, runner: &ScriptedRunner) -> (RunReport, String) {
        let mut out = Vec::new();
        let report = Waterfall::new(options, runner)
            .execute(&mut out)
            .await
            .unwrap();
        (report, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_all_files_pass() {
        let runner = ScriptedRunner::default();
        let files = ["a.test.js", "b.test.js", "c.test.js"];
        let (report, output) = run(options(&files, 0), &runner).await;

        assert!(report.passed());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.files_run, 3);
        assert_eq!(report.total, 3);
        assert!(report.restarts.is_empty());

        assert!(output.contains("1/3: a.test.js"));
        assert!(output.contains("2/3: b.test.js"));
        assert!(output.contains("3/3: c.test.js"));
        assert_eq!(output.matches(" OK").count(), 3);
        assert!(output.contains("All passed (0 sec)"));
        assert!(output.contains("No restarts occurred"));
        assert_eq!(runner.call_order(), ["a.test.js", "b.test.js", "c.test.js"]);
    }

    #[tokio::test]
    async fn test_output_is_sequential() {
        let runner = ScriptedRunner::default();
        let (_, output) = run(options(&["a.test.js", "b.test.js"], 0), &runner).await;

        let a_progress = output.find("1/2: a.test.js").unwrap();
        let a_output = output.find("running a.test.js").unwrap();
        let b_progress = output.find("2/2: b.test.js").unwrap();
        let b_output = output.find("running b.test.js").unwrap();
        assert!(a_progress < a_output && a_output < b_progress && b_progress < b_output);
    }

    #[tokio::test]
    async fn test_failure_without_restarts_aborts() {
        let runner = ScriptedRunner::default().with("a.test.js", &[Script::Exit(1)]);
        let (report, output) = run(options(&["a.test.js", "b.test.js"], 0), &runner).await;

        assert_eq!(
            report.status,
            RunStatus::Aborted {
                file: "a.test.js".to_string()
            }
        );
        assert_eq!(report.exit_code(), 1);
        assert_eq!(runner.calls_for("b.test.js"), 0);
        assert!(output.contains("Child process exited with code 1"));
        assert!(output.contains("Test file: a.test.js"));
        assert!(output.contains("No restarts occurred"));
        assert!(!output.contains("All passed"));
        assert!(!output.contains("Restart attempt"));
    }

    #[tokio::test]
    async fn test_restarts_until_pass() {
        let runner =
            ScriptedRunner::default().with("a.test.js", &[Script::Exit(1), Script::Exit(2)]);
        let (report, output) = run(options(&["a.test.js", "b.test.js"], 3), &runner).await;

        assert!(report.passed());
        assert_eq!(runner.calls_for("a.test.js"), 3);
        assert_eq!(runner.calls_for("b.test.js"), 1);
        assert_eq!(report.restarts.count("a.test.js"), 2);
        assert_eq!(output.matches("Restart attempt #").count(), 2);
        assert!(output.contains("Restart attempt #1"));
        assert!(output.contains("Restart attempt #2"));
        assert!(output.contains("Child process exited with code 2"));
    }

    #[tokio::test]
    async fn test_budget_exhausted_after_max_restarts() {
        let runner = ScriptedRunner::default().with("a.test.js", &[Script::Exit(1); 3]);
        let (report, output) = run(options(&["a.test.js", "b.test.js"], 2), &runner).await;

        assert_eq!(
            report.status,
            RunStatus::Aborted {
                file: "a.test.js".to_string()
            }
        );
        assert_eq!(runner.calls_for("a.test.js"), 3);
        assert_eq!(runner.calls_for("b.test.js"), 0);
        assert_eq!(report.restarts.count("a.test.js"), 2);
        assert_eq!(report.files_run, 1);
        assert!(output.contains("Count\tScript"));
        assert!(output.contains("2\ta.test.js"));
    }

    #[tokio::test]
    async fn test_stderr_fails_only_with_fail_on_stderr() {
        let script = [Script::ExitWithStderr(0)];

        let runner = ScriptedRunner::default().with("a.test.js", &script);
        let strict = WaterfallOptions::builder()
            .filenames(["a.test.js"])
            .fail_on_stderr(true)
            .build()
            .unwrap();
        let (report, output) = run(strict, &runner).await;
        assert!(!report.passed());
        assert!(output.contains("An error occurred."));

        let runner = ScriptedRunner::default().with("a.test.js", &script);
        let (report, output) = run(options(&["a.test.js"], 0), &runner).await;
        assert!(report.passed());
        assert!(output.contains("warning from a.test.js"));
    }

    #[tokio::test]
    async fn test_signal_is_failure() {
        let runner = ScriptedRunner::default().with("a.test.js", &[Script::Signal]);
        let (report, output) = run(options(&["a.test.js"], 0), &runner).await;

        assert!(!report.passed());
        assert!(output.contains("terminated by a signal"));
    }

    #[tokio::test]
    async fn test_restart_then_pass_scenario() {
        let runner =
            ScriptedRunner::default().with("a.test.js", &[Script::Exit(1), Script::Exit(0)]);
        let (report, output) = run(options(&["a.test.js", "b.test.js"], 1), &runner).await;

        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.restarts.total(), 1);
        assert!(output.contains("Restarts\n========\nCount\tScript\n1\ta.test.js\n"));
    }

    #[tokio::test]
    async fn test_restart_counter_resets_per_file() {
        let runner = ScriptedRunner::default()
            .with("a.test.js", &[Script::Exit(1)])
            .with("b.test.js", &[Script::Exit(1)]);
        let (report, _) = run(options(&["a.test.js", "b.test.js"], 1), &runner).await;

        assert!(report.passed());
        assert_eq!(
            report.restarts.iter().collect::<Vec<_>>(),
            [("a.test.js", 1), ("b.test.js", 1)]
        );
    }

    #[tokio::test]
    async fn test_spawn_failure_consumes_restart() {
        let runner = ScriptedRunner::default().with("a.test.js", &[Script::SpawnError]);
        let (report, output) = run(options(&["a.test.js"], 1), &runner).await;
        assert!(report.passed());
        assert_eq!(report.restarts.count("a.test.js"), 1);
        assert!(output.contains("Failed to launch test runner"));

        let runner = ScriptedRunner::default().with("a.test.js", &[Script::SpawnError]);
        let (report, _) = run(options(&["a.test.js"], 0), &runner).await;
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_empty_queue_passes_immediately() {
        let runner = ScriptedRunner::default();
        let (report, output) = run(options(&[], 0), &runner).await;

        assert!(report.passed());
        assert_eq!(report.total, 0);
        assert!(runner.call_order().is_empty());
        assert!(output.contains("All passed"));
    }

    #[tokio::test]
    async fn test_bail_and_flags_forwarded() {
        let runner = ScriptedRunner::default();
        let options = WaterfallOptions::builder()
            .filenames(["a.test.js"])
            .fail_on_stderr(false)
            .bail(true)
            .flags(["exit", "--reporter=dot", "exit"])
            .build()
            .unwrap();
        run(options, &runner).await;

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1);
        assert_eq!(calls[0].2, ["--exit", "--reporter=dot"]);
    }
}
