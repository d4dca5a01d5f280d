//! Install target resolution.
//!
//! The destination directory is a pure function of the environment snapshot
//! and the project directory: an explicit override wins, otherwise packages
//! go to `<project>/.pinsync/site-packages`. Nothing is cached, so a cleared
//! override takes effect on the next invocation.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::EnvOverrides;
use crate::constants::{DEFAULT_SITE_DIR, STATE_DIR_NAME};
use crate::utils::fs::expand_path;

/// Default install target for a project.
#[must_use]
pub fn default_target(project_dir: &Path) -> PathBuf {
    project_dir.join(STATE_DIR_NAME).join(DEFAULT_SITE_DIR)
}

/// Resolve the install target.
///
/// Relative overrides are resolved against `project_dir` and a leading `~`
/// is expanded. Variable references in the override are taken literally.
#[must_use]
pub fn resolve_target(overrides: &EnvOverrides, project_dir: &Path) -> PathBuf {
    match overrides.install_target.as_deref() {
        Some(raw) => {
            let target = expand_path(raw, project_dir);
            debug!(target = %target.display(), "Using install target override");
            target
        }
        None => default_target(project_dir),
    }
}
