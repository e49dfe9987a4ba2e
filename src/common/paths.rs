//! Configuration paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/test-waterfall/`
//! - macOS: `~/Library/Application Support/test-waterfall/`
//! - Windows: `%APPDATA%\test-waterfall\`

use std::path::PathBuf;

/// Name used for the configuration directory
const APP_NAME: &str = "test-waterfall";

/// File name of the configuration file inside the config directory
const CONFIG_FILE: &str = "config.toml";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}
