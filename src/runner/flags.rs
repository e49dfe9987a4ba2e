//! Runner argument construction
//!
//! Extra flags are written without or with their leading `--`; both forms
//! normalize to the `--` form. Duplicates are dropped, first occurrence wins.

/// Marker every runner flag starts with
const FLAG_PREFIX: &str = "--";

/// The runner's own stop-on-first-failure flag
pub const BAIL_FLAG: &str = "--bail";

/// Prefix a flag with `--` unless it already has it
pub fn normalize_flag(flag: &str) -> String {
    if flag.starts_with(FLAG_PREFIX) {
        flag.to_string()
    } else {
        format!("{FLAG_PREFIX}{flag}")
    }
}

/// Normalize a list of flags, dropping duplicates in first-seen order
pub fn normalize_flags<S: AsRef<str>>(flags: &[S]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(flags.len());
    for flag in flags {
        let flag = normalize_flag(flag.as_ref());
        if !normalized.contains(&flag) {
            normalized.push(flag);
        }
    }
    normalized
}

/// Build the runner arguments for one test file
///
/// Produces `[file, --bail?, ...flags]`. A flag equal to an argument already
/// present (including `--bail`) is skipped.
pub fn build_args<S: AsRef<str>>(file: &str, bail: bool, flags: &[S]) -> Vec<String> {
    let mut args = vec![file.to_string()];
    if bail {
        args.push(BAIL_FLAG.to_string());
    }
    for flag in normalize_flags(flags) {
        if !args.contains(&flag) {
            args.push(flag);
        }
    }
    args
}
