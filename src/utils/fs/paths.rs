//! Path expansion and discovery helpers.

use std::path::{Path, PathBuf};

/// Expands a leading `~` in a user-supplied path and makes relative results
/// absolute against `base`.
///
/// `$VAR` references are kept literally; callers pass values that were
/// already read from their environment snapshot.
#[must_use]
pub fn expand_path(raw: &str, base: &Path) -> PathBuf {
    let path = PathBuf::from(shellexpand::tilde(raw).into_owned());
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Walks from `start` towards the filesystem root and returns the first
/// `start/../file_name` that exists.
#[must_use]
pub fn find_upwards(start: &Path, file_name: &str) -> Option<PathBuf> {
    start.ancestors().map(|dir| dir.join(file_name)).find(|candidate| candidate.is_file())
}
