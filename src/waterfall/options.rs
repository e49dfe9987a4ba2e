//! Run options and their validation

use std::collections::VecDeque;

use crate::common::{Error, Result};
use crate::runner::normalize_flags;

/// Options for one waterfall run
///
/// Built through [`WaterfallOptions::builder`], which validates eagerly so
/// that a bad option fails before any process is spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaterfallOptions {
    pub(crate) filenames: VecDeque<String>,
    pub(crate) fail_on_stderr: bool,
    pub(crate) bail: bool,
    pub(crate) max_restarts: u32,
    pub(crate) flags: Vec<String>,
}

impl WaterfallOptions {
    pub fn builder() -> WaterfallOptionsBuilder {
        WaterfallOptionsBuilder::default()
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.filenames.iter().map(String::as_str)
    }

    pub fn fail_on_stderr(&self) -> bool {
        self.fail_on_stderr
    }

    pub fn bail(&self) -> bool {
        self.bail
    }

    pub fn max_restarts(&self) -> u32 {
        self.max_restarts
    }

    /// Extra runner flags, normalized to `--flag` form and deduplicated
    pub fn flags(&self) -> &[String] {
        &self.flags
    }
}

/// Builder for [`WaterfallOptions`]
///
/// `filenames` and `fail_on_stderr` are required; everything else has a
/// default.
#[derive(Debug, Default, Clone)]
pub struct WaterfallOptionsBuilder {
    filenames: Option<Vec<String>>,
    fail_on_stderr: Option<bool>,
    bail: bool,
    max_restarts: u32,
    flags: Vec<String>,
}

impl WaterfallOptionsBuilder {
    pub fn filenames<I, S>(mut self, filenames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filenames = Some(filenames.into_iter().map(Into::into).collect());
        self
    }

    pub fn fail_on_stderr(mut self, fail_on_stderr: bool) -> Self {
        self.fail_on_stderr = Some(fail_on_stderr);
        self
    }

    pub fn bail(mut self, bail: bool) -> Self {
        self.bail = bail;
        self
    }

    pub fn max_restarts(mut self, max_restarts: u32) -> Self {
        self.max_restarts = max_restarts;
        self
    }

    pub fn flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<WaterfallOptions> {
        let filenames = self
            .filenames
            .ok_or_else(|| Error::invalid_options("filenames is required"))?;
        let fail_on_stderr = self
            .fail_on_stderr
            .ok_or_else(|| Error::invalid_options("fail_on_stderr must be set"))?;

        if self
            .flags
            .iter()
            .any(|flag| flag.trim().is_empty() || flag.trim() == "--")
        {
            return Err(Error::invalid_options("all flags must be non-empty strings"));
        }

        Ok(WaterfallOptions {
            filenames: filenames.into(),
            fail_on_stderr,
            bail: self.bail,
            max_restarts: self.max_restarts,
            flags: normalize_flags(&self.flags),
        })
    }
}
