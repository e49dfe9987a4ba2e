//! Configuration file handling

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Test runner settings
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Defaults for a waterfall run
    #[serde(default)]
    pub run: RunDefaults,
}

/// How the external test runner is invoked
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Runner executable, resolved on PATH unless `dir` is set
    #[serde(default = "default_program")]
    pub program: String,

    /// Directory containing the runner executable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Interpreter used to launch the runner (`<interpreter> <program> args...`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            dir: None,
            interpreter: None,
        }
    }
}

fn default_program() -> String {
    "mocha".to_string()
}

/// Run settings, each overridable from the command line
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct RunDefaults {
    /// Treat any stderr output as a failure
    #[serde(default)]
    pub fail_on_stderr: bool,

    /// Pass `--bail` to the runner
    #[serde(default)]
    pub bail: bool,

    /// Restarts allowed per failing file
    #[serde(default)]
    pub max_restarts: u32,

    /// Extra flags passed to the runner
    #[serde(default)]
    pub flags: Vec<String>,

    /// Kill a test file's process after this many seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| super::Error::Config(e.to_string()))
    }
}
