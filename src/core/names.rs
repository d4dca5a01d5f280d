//! Package name normalization.
//!
//! Names are compared case-insensitively and treat runs of `-`, `_` and `.`
//! as a single separator, so `Zope.Interface`, `zope_interface` and
//! `zope-interface` all key the same lock entry.

use regex::Regex;
use std::sync::LazyLock;

static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("separator pattern is valid"));

/// Normalize a package name into its canonical lock key.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    SEPARATOR_RUN.replace_all(name.trim(), "-").to_lowercase()
}

/// Whether `name` is a plausible package name (non-empty, alphanumeric ends,
/// only separators and alphanumerics inside).
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    let name = name.trim();
    let Some(first) = name.chars().next() else {
        return false;
    };
    let last = name.chars().last().unwrap_or(first);
    first.is_ascii_alphanumeric()
        && last.is_ascii_alphanumeric()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
