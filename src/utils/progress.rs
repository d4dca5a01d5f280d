//! Progress indicators for long-running sync operations.
//!
//! Thin wrapper over `indicatif`. Whether a bar is drawn is decided once by the
//! caller (`--no-progress`, `PINSYNC_NO_PROGRESS`, `--quiet`, `--verbose`) and
//! passed in explicitly; a disabled bar is an `indicatif` hidden bar so the
//! calling code never branches on it.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle as IndicatifStyle};

/// A cloneable progress bar over a fixed number of packages.
#[derive(Clone, Debug)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Create a bar with `len` steps, or a hidden one when `enabled` is false.
    #[must_use]
    pub fn new(len: u64, enabled: bool) -> Self {
        let bar = if enabled {
            let bar = IndicatifBar::new(len);
            bar.set_style(default_style());
            bar
        } else {
            IndicatifBar::hidden()
        };
        Self {
            inner: bar,
        }
    }

    /// A bar that never draws.
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Set the message shown next to the bar.
    pub fn set_message(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    /// Advance the bar.
    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    /// Current position, mostly useful in tests.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Finish and remove the bar from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

fn default_style() -> IndicatifStyle {
    IndicatifStyle::default_bar()
        .template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| IndicatifStyle::default_bar())
        .progress_chars("=> ")
}
