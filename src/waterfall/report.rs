//! Run statistics and the end-of-run report

use std::io::{self, Write};
use std::time::Duration;

/// Restart counts per test file, in the order files first restarted
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestartTally {
    entries: Vec<(String, u32)>,
}

impl RestartTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one restart of `file`
    pub fn record(&mut self, file: &str) {
        match self.entries.iter_mut().find(|(path, _)| path == file) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((file.to_string(), 1)),
        }
    }

    /// Restarts recorded for `file`; files never restarted have zero
    pub fn count(&self, file: &str) -> u32 {
        self.entries
            .iter()
            .find(|(path, _)| path == file)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u32 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(path, count)| (path.as_str(), *count))
    }

    /// Write the restart table, or a notice when nothing restarted
    pub fn write_to(&self, out: &mut (dyn Write + Send)) -> io::Result<()> {
        if self.is_empty() {
            return writeln!(out, "No restarts occurred");
        }

        writeln!(out, "Restarts")?;
        writeln!(out, "========")?;
        writeln!(out, "Count\tScript")?;
        for (path, count) in self.iter() {
            writeln!(out, "{count}\t{path}")?;
        }
        Ok(())
    }
}

/// Format whole seconds as `"S sec"` or `"M min S sec"`
pub fn pretty_time(total_seconds: u64) -> String {
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    if minutes > 0 {
        format!("{minutes} min {seconds} sec")
    } else {
        format!("{seconds} sec")
    }
}

/// Round a duration to the nearest whole second
pub fn rounded_secs(elapsed: Duration) -> u64 {
    ((elapsed.as_millis() + 500) / 1000) as u64
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Every file passed, possibly after restarts
    Passed,
    /// `file` was still failing when its restart budget ran out
    Aborted { file: String },
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub elapsed: Duration,
    /// Files started, including the one that aborted the run
    pub files_run: usize,
    pub total: usize,
    pub restarts: RestartTally,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.status == RunStatus::Passed
    }

    /// Process exit status for this run
    pub fn exit_code(&self) -> i32 {
        match self.status {
            RunStatus::Passed => 0,
            RunStatus::Aborted { .. } => 1,
        }
    }
}
